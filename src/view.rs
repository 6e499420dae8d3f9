use std::collections::HashMap;

use chrono::{DateTime, TimeZone};

use crate::dates::date_label;
use crate::note::Note;

/// Unpinned notes that share a relative-day label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateGroup {
    pub label: String,
    pub notes: Vec<Note>,
}

/// Everything the note list shows, derived from the collection.
#[derive(Clone, Debug, Default)]
pub struct NoteView {
    /// Size of the whole collection, before filtering.
    pub total: usize,
    /// Notes left after the search filter.
    pub filtered: usize,
    pub pinned: Vec<Note>,
    pub groups: Vec<DateGroup>,
}

impl NoteView {
    /// Ids in display order: pinned notes first, then each date group.
    pub fn ordered_ids(&self) -> Vec<&str> {
        self.pinned
            .iter()
            .chain(self.groups.iter().flat_map(|g| g.notes.iter()))
            .map(|n| n.id.as_str())
            .collect()
    }
}

pub fn filter<'a>(notes: &'a [Note], query: &str) -> Vec<&'a Note> {
    notes.iter().filter(|n| n.matches(query)).collect()
}

pub fn partition_pinned(notes: Vec<&Note>) -> (Vec<Note>, Vec<Note>) {
    notes.into_iter().cloned().partition(|n| n.pinned)
}

/// Buckets notes by date label in a single pass. Groups come out in the
/// order their label is first seen, so newest-first input yields
/// "Today", "Yesterday", then older dates without sorting.
pub fn group_by_date<Tz: TimeZone>(notes: Vec<Note>, now: &DateTime<Tz>) -> Vec<DateGroup> {
    let mut groups: Vec<DateGroup> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for note in notes {
        let label = date_label(note.created_at, now);
        match seen.get(&label) {
            Some(&idx) => groups[idx].notes.push(note),
            None => {
                seen.insert(label.clone(), groups.len());
                groups.push(DateGroup {
                    label,
                    notes: vec![note],
                });
            }
        }
    }

    groups
}

/// filter -> partition(pinned) -> group(unpinned)
pub fn derive<Tz: TimeZone>(notes: &[Note], query: &str, now: &DateTime<Tz>) -> NoteView {
    let matching = filter(notes, query);
    let filtered = matching.len();
    let (pinned, unpinned) = partition_pinned(matching);

    NoteView {
        total: notes.len(),
        filtered,
        pinned,
        groups: group_by_date(unpinned, now),
    }
}
