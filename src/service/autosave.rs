//! Debounced autosave.
//!
//! Edits hand their full note snapshot to the coordinator. A snapshot is only
//! released for sending once input has been quiet for the whole debounce window,
//! and every new edit restarts that window. The coordinator also owns the global
//! save status shown in the UI.

use std::time::Duration;

use tokio::time::Instant;

use crate::models::{Note, SaveState};

#[derive(Debug)]
struct PendingSave {
    note: Note,
    due: Instant,
}

#[derive(Debug)]
pub struct SaveCoordinator {
    delay: Duration,
    saved_linger: Duration,
    pending: Option<PendingSave>,
    state: SaveState,
    in_flight: usize,
    idle_at: Option<Instant>,
}

impl SaveCoordinator {
    pub const fn new(delay: Duration, saved_linger: Duration) -> Self {
        Self {
            delay,
            saved_linger,
            pending: None,
            state: SaveState::Idle,
            in_flight: 0,
            idle_at: None,
        }
    }

    pub const fn state(&self) -> SaveState {
        self.state
    }

    pub const fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn pending_id(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.note.id.as_str())
    }

    /// Queues `note` and restarts the window.
    ///
    /// A pending snapshot of a different note is handed back so the caller can
    /// send it right away instead of losing it.
    pub fn schedule(&mut self, note: Note, now: Instant) -> Option<Note> {
        let due = now + self.delay;
        match self.pending.take() {
            Some(prev) if prev.note.id != note.id => {
                self.pending = Some(PendingSave { note, due });
                Some(prev.note)
            }
            _ => {
                self.pending = Some(PendingSave { note, due });
                None
            }
        }
    }

    /// Releases the pending snapshot once its window has fully elapsed.
    pub fn take_due(&mut self, now: Instant) -> Option<Note> {
        match &self.pending {
            Some(p) if p.due <= now => self.pending.take().map(|p| p.note),
            _ => None,
        }
    }

    /// Releases the pending snapshot regardless of its window.
    pub fn flush(&mut self) -> Option<Note> {
        self.pending.take().map(|p| p.note)
    }

    /// Drops the pending snapshot if it belongs to `id`.
    pub fn discard(&mut self, id: &str) {
        if self.pending_id() == Some(id) {
            tracing::debug!("Dropping pending save for note {}", id);
            self.pending = None;
        }
    }

    /// A save request has been sent.
    pub const fn begin(&mut self) {
        self.state = SaveState::Saving;
        self.in_flight += 1;
        self.idle_at = None;
    }

    pub fn succeed(&mut self, now: Instant) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if self.in_flight == 0 && self.state == SaveState::Saving {
            self.state = SaveState::Saved;
            self.idle_at = Some(now + self.saved_linger);
        }
    }

    /// Failures stick until the next [`begin`](Self::begin).
    pub const fn fail(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.state = SaveState::Error;
        self.idle_at = None;
    }

    /// Moves "saved" back to "idle" once the linger delay is over.
    pub fn expire(&mut self, now: Instant) {
        if let Some(at) = self.idle_at
            && at <= now
        {
            self.idle_at = None;
            if self.state == SaveState::Saved {
                self.state = SaveState::Idle;
            }
        }
    }

    /// Earliest instant at which [`take_due`](Self::take_due) or
    /// [`expire`](Self::expire) has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let due = self.pending.as_ref().map(|p| p.due);
        match (due, self.idle_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Drops queued work and timers when the view is torn down. The status
    /// stays as it was last shown.
    pub fn abandon(&mut self) {
        self.pending = None;
        self.idle_at = None;
    }
}
