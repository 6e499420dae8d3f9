use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::Utc;
use log::{debug, error, info, warn};
use thiserror::Error;
use uuid::Uuid;

use crate::note::Note;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("failed to serialize notes: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage exceeds the {limit} byte size limit")]
    TooLarge { limit: u64 },
}

/// The single slot holding the serialized collection.
pub trait NoteStorage {
    /// `Ok(None)` when nothing has been stored yet.
    fn read(&self) -> Result<Option<String>, StorageError>;
    /// Replaces the whole slot.
    fn write(&mut self, contents: &str) -> Result<(), StorageError>;
}

pub trait Clock {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// JSON file on disk, replaced atomically on every write.
pub struct FileStorage {
    path: PathBuf,
    max_size: u64,
}

impl FileStorage {
    pub fn new(path: PathBuf, max_size: u64) -> Self {
        Self { path, max_size }
    }
}

impl NoteStorage for FileStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let metadata = fs::metadata(&self.path)?;
        if metadata.len() > self.max_size {
            return Err(StorageError::TooLarge {
                limit: self.max_size,
            });
        }

        Ok(Some(fs::read_to_string(&self.path)?))
    }

    fn write(&mut self, contents: &str) -> Result<(), StorageError> {
        if contents.len() as u64 > self.max_size {
            return Err(StorageError::TooLarge {
                limit: self.max_size,
            });
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to temporary file first, then atomic rename
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, contents)?;
        fs::rename(temp_path, &self.path)?;

        Ok(())
    }
}

/// Owns the note collection, newest first, and writes it back after every
/// successful mutation. Invalid input and unknown ids are no-ops.
pub struct NoteStore {
    notes: Vec<Note>,
    storage: Box<dyn NoteStorage>,
    clock: Box<dyn Clock>,
    persist_error: Option<String>,
}

impl NoteStore {
    /// Reads the slot once. Never fails: a missing, unreadable or malformed
    /// slot gives an empty collection.
    pub fn load(storage: Box<dyn NoteStorage>, clock: Box<dyn Clock>) -> Self {
        let notes = match storage.read() {
            Ok(Some(raw)) if raw.trim().is_empty() => Vec::new(),
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Note>>(&raw) {
                Ok(notes) => repair(notes),
                Err(err) => {
                    warn!("stored notes are malformed, starting empty: {err}");
                    Vec::new()
                }
            },
            Ok(None) => {
                info!("no stored notes yet");
                Vec::new()
            }
            Err(err) => {
                warn!("could not read stored notes, starting empty: {err}");
                Vec::new()
            }
        };

        info!("loaded {} notes", notes.len());
        Self {
            notes,
            storage,
            clock,
            persist_error: None,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// The last write failure, cleared by the next successful write.
    pub fn persist_error(&self) -> Option<&str> {
        self.persist_error.as_deref()
    }

    pub fn create(&mut self, text: &str) -> Option<Note> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        // never older than the current head, even if the clock stepped back
        let mut now = self.clock.now_millis();
        if let Some(head) = self.notes.first() {
            now = now.max(head.created_at);
        }

        let note = Note::new(Uuid::new_v4().to_string(), text.to_string(), now);
        debug!("created note {}", note.id);
        self.notes.insert(0, note.clone());
        self.persist();
        Some(note)
    }

    pub fn update(&mut self, id: &str, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        let now = self.clock.now_millis();
        let Some(note) = self.notes.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if note.text == text {
            return false;
        }

        note.text = text.to_string();
        note.updated_at = now.max(note.created_at);
        debug!("updated note {id}");
        self.persist();
        true
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        if self.notes.len() == before {
            return false;
        }

        debug!("deleted note {id}");
        self.persist();
        true
    }

    pub fn toggle_pin(&mut self, id: &str) -> bool {
        let Some(note) = self.notes.iter_mut().find(|n| n.id == id) else {
            return false;
        };

        note.pinned = !note.pinned;
        debug!("note {id} pinned={}", note.pinned);
        self.persist();
        true
    }

    // Write failures are logged and remembered; memory stays authoritative.
    fn persist(&mut self) {
        let result = serde_json::to_string(&self.notes)
            .map_err(StorageError::from)
            .and_then(|raw| self.storage.write(&raw));

        match result {
            Ok(()) => self.persist_error = None,
            Err(err) => {
                error!("failed to persist {} notes: {err}", self.notes.len());
                self.persist_error = Some(err.to_string());
            }
        }
    }
}

// Drops records that break the collection invariants instead of rejecting
// the whole slot.
fn repair(notes: Vec<Note>) -> Vec<Note> {
    let mut seen = HashSet::new();
    let mut repaired = Vec::with_capacity(notes.len());

    for mut note in notes {
        let trimmed = note.text.trim();
        if trimmed.is_empty() {
            warn!("dropping stored note {} with empty text", note.id);
            continue;
        }
        if !seen.insert(note.id.clone()) {
            warn!("dropping stored note with duplicate id {}", note.id);
            continue;
        }
        if trimmed.len() != note.text.len() {
            note.text = trimmed.to_string();
        }
        if note.updated_at < note.created_at {
            note.updated_at = note.created_at;
        }
        repaired.push(note);
    }

    repaired
}
