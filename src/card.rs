use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::note::Note;
use crate::store::NoteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardMode {
    Viewing,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePress {
    /// First press: waiting for the confirming one.
    Armed,
    Deleted,
}

/// Interaction state of one note on screen: the edit draft and the
/// two-step delete guard. The guard's timer is a deadline owned by the
/// card, so dropping the card cancels it.
#[derive(Debug, Clone)]
pub struct NoteCard {
    note_id: String,
    mode: CardMode,
    draft: String,
    delete_deadline: Option<Instant>,
    confirm_window: Duration,
}

impl NoteCard {
    pub fn new(note: &Note, confirm_window: Duration) -> Self {
        Self {
            note_id: note.id.clone(),
            mode: CardMode::Viewing,
            draft: note.text.clone(),
            delete_deadline: None,
            confirm_window,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.mode == CardMode::Editing
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, draft: String) {
        if self.is_editing() {
            self.draft = draft;
        }
    }

    pub fn begin_edit(&mut self, note: &Note) {
        self.draft = note.text.clone();
        self.mode = CardMode::Editing;
    }

    /// Leaves editing. Writes the trimmed draft through the store when it is
    /// non-empty and differs from the stored text; otherwise the draft falls
    /// back to the stored text. Returns whether the note changed.
    pub fn save(&mut self, store: &mut NoteStore) -> bool {
        if !self.is_editing() {
            return false;
        }
        self.mode = CardMode::Viewing;

        let updated = store.update(&self.note_id, &self.draft);
        if let Some(note) = store.get(&self.note_id) {
            self.draft = note.text.clone();
        }
        updated
    }

    pub fn cancel(&mut self, note: &Note) {
        self.draft = note.text.clone();
        self.mode = CardMode::Viewing;
    }

    /// Picks up external text changes. Ignored while editing.
    pub fn sync(&mut self, note: &Note) {
        if !self.is_editing() && self.draft != note.text {
            self.draft = note.text.clone();
        }
    }

    pub fn is_confirming_delete(&self) -> bool {
        self.delete_deadline.is_some()
    }

    pub fn press_delete(&mut self, store: &mut NoteStore, now: Instant) -> DeletePress {
        self.expire(now);

        if self.delete_deadline.take().is_some() {
            store.delete(&self.note_id);
            DeletePress::Deleted
        } else {
            self.delete_deadline = Some(now + self.confirm_window);
            DeletePress::Armed
        }
    }

    /// Disarms the delete guard once its window has passed. Returns true if
    /// it was disarmed by this call.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.delete_deadline {
            Some(deadline) if now >= deadline => {
                self.delete_deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// The cards for every note currently in the collection, keyed by note id.
#[derive(Debug, Default)]
pub struct CardSet {
    cards: HashMap<String, NoteCard>,
    confirm_window: Duration,
}

impl CardSet {
    pub fn new(confirm_window: Duration) -> Self {
        Self {
            cards: HashMap::new(),
            confirm_window,
        }
    }

    pub fn get(&self, id: &str) -> Option<&NoteCard> {
        self.cards.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut NoteCard> {
        self.cards.get_mut(id)
    }

    /// Note id of the card being edited, if any.
    pub fn editing(&self) -> Option<&str> {
        self.cards
            .iter()
            .find(|(_, card)| card.is_editing())
            .map(|(id, _)| id.as_str())
    }

    /// Brings the set in line with the collection: new notes get a card,
    /// cards of removed notes are dropped along with any armed delete, and
    /// viewing cards pick up changed text.
    pub fn reconcile(&mut self, store: &NoteStore) {
        self.cards.retain(|id, _| store.get(id).is_some());
        for note in store.notes() {
            match self.cards.get_mut(&note.id) {
                Some(card) => card.sync(note),
                None => {
                    self.cards
                        .insert(note.id.clone(), NoteCard::new(note, self.confirm_window));
                }
            }
        }
    }

    /// Timer tick: disarms every expired delete guard.
    pub fn expire(&mut self, now: Instant) -> bool {
        let mut changed = false;
        for card in self.cards.values_mut() {
            changed |= card.expire(now);
        }
        changed
    }
}
