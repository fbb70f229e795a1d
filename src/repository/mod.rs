use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};

use std::time::Duration;

use crate::{
    dto::{CreateNoteRequest, NoteResponse, UpdateNoteRequest},
    models::{Note, NotePatch},
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Failed to reach notes API: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Note not found")]
    NotFound,

    #[error("Notes API returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Failed to decode notes API response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Remote CRUD over notes.
#[async_trait]
pub trait NotesApi: Send + Sync {
    async fn list_notes(&self) -> Result<Vec<Note>, ApiError>;

    async fn create_note(&self, title: &str, content: &str) -> Result<Note, ApiError>;

    /// Returns the server's view of the note, at least with a fresh `updated_at`.
    async fn update_note(&self, id: &str, patch: &NotePatch) -> Result<Note, ApiError>;

    async fn delete_note(&self, id: &str) -> Result<(), ApiError>;
}

pub struct RestRepository {
    base_url: String,
    client: Client,
}

impl RestRepository {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn notes_url(&self) -> String {
        format!("{}/notes", self.base_url)
    }

    fn note_url(&self, id: &str) -> String {
        format!("{}/notes/{}", self.base_url, id)
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }

        let message = response.text().await.unwrap_or_default();
        Err(ApiError::Status { status, message })
    }
}

#[async_trait]
impl NotesApi for RestRepository {
    async fn list_notes(&self) -> Result<Vec<Note>, ApiError> {
        let url = self.notes_url();
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ApiError::Transport)?;

        let notes = Self::check(response)
            .await?
            .json::<Vec<NoteResponse>>()
            .await
            .map_err(ApiError::Decode)?;

        Ok(notes.into_iter().map(Note::from).collect())
    }

    async fn create_note(&self, title: &str, content: &str) -> Result<Note, ApiError> {
        let url = self.notes_url();
        tracing::debug!("POST {}", url);

        let request = CreateNoteRequest {
            title: title.to_string(),
            content: content.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(ApiError::Transport)?;

        Self::check(response)
            .await?
            .json::<NoteResponse>()
            .await
            .map(Note::from)
            .map_err(ApiError::Decode)
    }

    async fn update_note(&self, id: &str, patch: &NotePatch) -> Result<Note, ApiError> {
        let url = self.note_url(id);
        tracing::debug!("PUT {}", url);

        let response = self
            .client
            .put(&url)
            .json(&UpdateNoteRequest::from(patch))
            .send()
            .await
            .map_err(ApiError::Transport)?;

        Self::check(response)
            .await?
            .json::<NoteResponse>()
            .await
            .map(Note::from)
            .map_err(ApiError::Decode)
    }

    async fn delete_note(&self, id: &str) -> Result<(), ApiError> {
        let url = self.note_url(id);
        tracing::debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(ApiError::Transport)?;

        Self::check(response).await.map(|_| ())
    }
}
