use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Applies the fields present in `patch`, leaving the rest untouched.
    pub fn apply(&mut self, patch: &NotePatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(content) = &patch.content {
            self.content.clone_from(content);
        }
    }

    /// Takes the server-owned timestamps from `server`, keeping local text.
    pub fn merge_timestamps(&mut self, server: &Self) {
        self.created_at = server.created_at;
        self.updated_at = server.updated_at.max(server.created_at);
    }
}

/// Partial update of a note's editable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(content.into()),
        }
    }

    /// Full snapshot patch used by autosave.
    pub fn from_note(note: &Note) -> Self {
        Self {
            title: Some(note.title.clone()),
            content: Some(note.content.clone()),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SaveState {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

impl SaveState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Saving => "Saving...",
            Self::Saved => "Saved",
            Self::Error => "Error",
        }
    }
}
