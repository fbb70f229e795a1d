mod timestamp;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Note, NotePatch};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    /// Server-assigned note ID
    pub id: String,
    /// Note title
    #[serde(default)]
    pub title: String,
    /// Note content
    #[serde(default)]
    pub content: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    /// Note title
    pub title: String,
    /// Note content
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNoteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl From<NoteResponse> for Note {
    fn from(response: NoteResponse) -> Self {
        Self {
            id: response.id,
            title: response.title,
            content: response.content,
            created_at: response.created_at,
            updated_at: response.updated_at,
        }
    }
}

impl From<&NotePatch> for UpdateNoteRequest {
    fn from(patch: &NotePatch) -> Self {
        Self {
            title: patch.title.clone(),
            content: patch.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn note_response_reads_camel_case_and_bare_dates() {
        let body = r#"{
            "id": "2",
            "title": "Groceries",
            "content": "milk",
            "createdAt": "2024-01-01",
            "updatedAt": "2024-02-01T10:30:00Z"
        }"#;

        let note: Note = serde_json::from_str::<NoteResponse>(body).unwrap().into();

        assert_eq!(note.id, "2");
        assert_eq!(note.title, "Groceries");
        assert_eq!(
            note.created_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            note.updated_at,
            Utc.with_ymd_and_hms(2024, 2, 1, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn note_response_accepts_offsets() {
        let body = r#"{"id":"a","createdAt":"2024-03-01T12:00:00+02:00","updatedAt":"2024-03-01T12:00:00+02:00"}"#;

        let note = serde_json::from_str::<NoteResponse>(body).unwrap();

        assert_eq!(note.title, "");
        assert_eq!(
            note.updated_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn note_response_rejects_garbage_timestamps() {
        let body = r#"{"id":"a","createdAt":"yesterday","updatedAt":"2024-01-01"}"#;

        assert!(serde_json::from_str::<NoteResponse>(body).is_err());
    }

    #[test]
    fn update_request_omits_absent_fields() {
        let request = UpdateNoteRequest::from(&NotePatch::content("body"));

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json, serde_json::json!({ "content": "body" }));
    }
}
