use crate::models::Note;

/// Notes whose title or content contains `query`, ignoring case and surrounding
/// whitespace. A blank query keeps every note. Input order is preserved.
pub fn filter_notes<'a>(notes: &'a [Note], query: &str) -> Vec<&'a Note> {
    let query = query.trim();
    if query.is_empty() {
        return notes.iter().collect();
    }

    let needle = query.to_lowercase();
    notes
        .iter()
        .filter(|note| {
            note.title.to_lowercase().contains(&needle)
                || note.content.to_lowercase().contains(&needle)
        })
        .collect()
}
