use std::cmp::Reverse;

use crate::models::Note;

/// The active note. When set, the id always refers to a note in the store it was
/// last checked against.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    active: Option<String>,
}

impl Selection {
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Selects `id` if it is present in `notes`. Returns whether the selection changed.
    pub fn select(&mut self, id: &str, notes: &[Note]) -> bool {
        if !notes.iter().any(|n| n.id == id) {
            return false;
        }
        self.active = Some(id.to_string());
        true
    }

    /// Most recently updated note; the earliest one in list order wins ties.
    pub fn pick_most_recent(&mut self, notes: &[Note]) {
        self.active = notes
            .iter()
            .min_by_key(|n| Reverse(n.updated_at))
            .map(|n| n.id.clone());
    }

    pub fn pick_first(&mut self, notes: &[Note]) {
        self.active = notes.first().map(|n| n.id.clone());
    }
}
