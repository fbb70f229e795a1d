pub mod autosave;
pub mod search;
pub mod selection;

use tokio::sync::mpsc;
use tokio::time::Instant;

use std::{collections::HashMap, sync::Arc};

use crate::{
    config::Config,
    models::{Note, NotePatch, SaveState},
    repository::{ApiError, NotesApi},
};

use autosave::SaveCoordinator;
use selection::Selection;

pub const DEFAULT_TITLE: &str = "Untitled";

const LOAD_FAILED: &str = "Failed to load notes. Please check your API or network connection.";
const CREATE_FAILED: &str = "Failed to create note.";
const DELETE_FAILED: &str = "Failed to delete note.";

/// Result of a background save, delivered back to the owner of the store.
#[derive(Debug)]
pub struct SaveOutcome {
    pub id: String,
    /// Edit version of the snapshot that was sent.
    pub version: u64,
    pub result: Result<Note, ApiError>,
}

/// Client-side state of the notes UI: the store, the selection, the search query,
/// autosave, and the error banner.
///
/// Owned by a single event loop. Saves run on spawned tasks and come back through
/// the receiver handed out by [`NoteService::new`], to be applied with
/// [`NoteService::finish_save`] in arrival order.
pub struct NoteService {
    api: Arc<dyn NotesApi>,
    notes: Vec<Note>,
    versions: HashMap<String, u64>,
    /// Highest edit version the server has confirmed, per note.
    synced: HashMap<String, u64>,
    selection: Selection,
    autosave: SaveCoordinator,
    search: String,
    error: Option<String>,
    loading: bool,
    alive: bool,
    last_saved_id: Option<String>,
    saves_tx: mpsc::UnboundedSender<SaveOutcome>,
}

impl NoteService {
    pub fn new(
        api: Arc<dyn NotesApi>,
        cfg: &Config,
    ) -> (Self, mpsc::UnboundedReceiver<SaveOutcome>) {
        let (saves_tx, saves_rx) = mpsc::unbounded_channel();
        let service = Self {
            api,
            notes: Vec::new(),
            versions: HashMap::new(),
            synced: HashMap::new(),
            selection: Selection::default(),
            autosave: SaveCoordinator::new(cfg.save_debounce, cfg.saved_linger),
            search: String::new(),
            error: None,
            loading: false,
            alive: true,
            last_saved_id: None,
            saves_tx,
        };
        (service, saves_rx)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Notes matching the current search query, in store order.
    pub fn visible_notes(&self) -> Vec<&Note> {
        search::filter_notes(&self.notes, &self.search)
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selection.active()
    }

    pub fn selected(&self) -> Option<&Note> {
        let id = self.selection.active()?;
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn search_query(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: &str) {
        self.search = query.to_string();
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    pub const fn save_state(&self) -> SaveState {
        self.autosave.state()
    }

    pub fn last_saved_id(&self) -> Option<&str> {
        self.last_saved_id.as_deref()
    }

    pub const fn saves_in_flight(&self) -> usize {
        self.autosave.in_flight()
    }

    fn has_unsaved_edits(&self, id: &str) -> bool {
        let edited = self.versions.get(id).copied().unwrap_or_default();
        let synced = self.synced.get(id).copied().unwrap_or_default();
        edited > synced
    }

    /// Fetches every note and selects the most recently updated one.
    ///
    /// Notes with edits the server has not confirmed keep their local text and
    /// edit version; only the server timestamps are taken for them.
    pub async fn list(&mut self) {
        self.loading = true;
        let result = self.api.list_notes().await;
        self.loading = false;

        if !self.alive {
            return;
        }

        match result {
            Ok(notes) => {
                tracing::info!("Loaded {} notes", notes.len());
                let mut local: HashMap<String, Note> = std::mem::take(&mut self.notes)
                    .into_iter()
                    .map(|n| (n.id.clone(), n))
                    .collect();

                let mut merged = Vec::with_capacity(notes.len());
                for server in notes {
                    let kept = local
                        .remove(&server.id)
                        .filter(|_| self.has_unsaved_edits(&server.id));
                    match kept {
                        Some(mut note) => {
                            tracing::debug!("Keeping unsaved edits of note {}", note.id);
                            note.merge_timestamps(&server);
                            merged.push(note);
                        }
                        None => merged.push(server),
                    }
                }

                for id in local.keys() {
                    self.autosave.discard(id);
                }
                self.versions.retain(|id, _| merged.iter().any(|n| &n.id == id));
                self.synced.retain(|id, _| merged.iter().any(|n| &n.id == id));
                self.notes = merged;
                self.selection.pick_most_recent(&self.notes);
            }
            Err(e) => {
                tracing::error!("failed to load notes: {}", e);
                self.error = Some(LOAD_FAILED.to_string());
            }
        }
    }

    /// Creates a note remotely, then puts it first and selects it.
    pub async fn create(&mut self, title: &str, content: &str) {
        self.error = None;
        let result = self.api.create_note(title, content).await;

        if !self.alive {
            return;
        }

        match result {
            Ok(note) => {
                tracing::info!("Created note {}", note.id);
                self.versions.insert(note.id.clone(), 0);
                let id = note.id.clone();
                self.notes.insert(0, note);
                self.selection.select(&id, &self.notes);
            }
            Err(e) => {
                tracing::error!("failed to create note: {}", e);
                self.error = Some(CREATE_FAILED.to_string());
            }
        }
    }

    /// Makes `id` the active note. Unknown ids leave the selection as it was.
    pub fn select(&mut self, id: &str) -> bool {
        let changed = self.selection.select(id, &self.notes);
        if !changed {
            tracing::warn!("Cannot select unknown note {}", id);
        }
        changed
    }

    /// Applies `patch` locally right away and schedules a debounced save.
    pub fn update(&mut self, id: &str, patch: &NotePatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        let Some(note) = self.notes.iter_mut().find(|n| n.id == id) else {
            tracing::warn!("Ignoring edit of unknown note {}", id);
            return false;
        };

        note.apply(patch);
        let snapshot = note.clone();
        *self.versions.entry(id.to_string()).or_default() += 1;

        if let Some(displaced) = self.autosave.schedule(snapshot, Instant::now()) {
            self.dispatch_save(displaced);
        }
        true
    }

    /// Edits the selected note.
    pub fn update_selected(&mut self, patch: &NotePatch) -> bool {
        match self.selection.active().map(str::to_string) {
            Some(id) => self.update(&id, patch),
            None => false,
        }
    }

    /// Deletes remotely; the note leaves the store only once the server confirms.
    pub async fn delete(&mut self, id: &str) {
        self.error = None;
        let result = self.api.delete_note(id).await;

        if !self.alive {
            return;
        }

        match result {
            Ok(()) => {
                tracing::info!("Deleted note {}", id);
                self.notes.retain(|n| n.id != id);
                self.versions.remove(id);
                self.synced.remove(id);
                self.autosave.discard(id);
                self.selection.pick_first(&self.notes);
            }
            Err(e) => {
                tracing::error!("failed to delete note {}: {}", id, e);
                self.error = Some(DELETE_FAILED.to_string());
            }
        }
    }

    /// When the loop next needs to call [`tick`](Self::tick).
    pub fn next_deadline(&self) -> Option<Instant> {
        self.autosave.next_deadline()
    }

    /// Sends a save whose window has elapsed and retires the "saved" badge.
    pub fn tick(&mut self) {
        let now = Instant::now();
        if let Some(note) = self.autosave.take_due(now) {
            self.dispatch_save(note);
        }
        self.autosave.expire(now);
    }

    /// Sends the pending save without waiting for its window.
    pub fn flush(&mut self) {
        if let Some(note) = self.autosave.flush() {
            self.dispatch_save(note);
        }
    }

    fn dispatch_save(&mut self, note: Note) {
        let version = self.versions.get(&note.id).copied().unwrap_or_default();
        tracing::debug!("Saving note {} at version {}", note.id, version);

        self.autosave.begin();
        self.last_saved_id = Some(note.id.clone());

        let api = Arc::clone(&self.api);
        let tx = self.saves_tx.clone();
        tokio::spawn(async move {
            let result = api.update_note(&note.id, &NotePatch::from_note(&note)).await;
            let outcome = SaveOutcome {
                id: note.id,
                version,
                result,
            };
            if tx.send(outcome).is_err() {
                tracing::debug!("Save finished after the view was closed");
            }
        });
    }

    /// Applies a finished save.
    ///
    /// The server's note replaces the local one only when no edit happened since
    /// the snapshot was taken; otherwise just the timestamps are taken so newer
    /// local text survives until its own save goes out.
    pub fn finish_save(&mut self, outcome: SaveOutcome) {
        if !self.alive {
            tracing::debug!("Ignoring save result for note {} after leave", outcome.id);
            return;
        }

        match outcome.result {
            Ok(server) => {
                let current = self.versions.get(&outcome.id).copied();
                let synced = self.synced.entry(outcome.id.clone()).or_default();
                *synced = (*synced).max(outcome.version);
                if let Some(local) = self.notes.iter_mut().find(|n| n.id == outcome.id) {
                    if current == Some(outcome.version) {
                        local.title.clone_from(&server.title);
                        local.content.clone_from(&server.content);
                        local.merge_timestamps(&server);
                    } else {
                        tracing::debug!(
                            "Note {} changed while saving, keeping local text",
                            outcome.id
                        );
                        local.merge_timestamps(&server);
                    }
                }
                self.autosave.succeed(Instant::now());
            }
            Err(e) => {
                tracing::error!("failed to save note {}: {}", outcome.id, e);
                self.autosave.fail();
            }
        }
    }

    /// The view is going away: pending work is dropped and late results ignored.
    pub fn leave(&mut self) {
        self.alive = false;
        self.autosave.abandon();
    }
}
