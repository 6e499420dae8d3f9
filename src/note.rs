/// A single persisted note. Serialized with the camelCase field names the
/// storage slot has always used (`createdAt`, `updatedAt`).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub text: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub pinned: bool,
}

impl Note {
    pub fn new(id: String, text: String, now: i64) -> Self {
        Self {
            id,
            text,
            created_at: now,
            updated_at: now,
            pinned: false,
        }
    }

    pub fn is_edited(&self) -> bool {
        self.updated_at != self.created_at
    }

    /// Case-insensitive substring match; an empty query matches every note.
    pub fn matches(&self, query: &str) -> bool {
        query.is_empty() || self.text.to_lowercase().contains(&query.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_note_is_unpinned_and_unedited() {
        let note = Note::new("a".into(), "hello".into(), 42);
        assert_eq!(note.created_at, 42);
        assert_eq!(note.updated_at, 42);
        assert!(!note.pinned);
        assert!(!note.is_edited());
    }

    #[test]
    fn matches_ignores_case() {
        let note = Note::new("a".into(), "Buy Milk".into(), 0);
        assert!(note.matches(""));
        assert!(note.matches("milk"));
        assert!(note.matches("BUY m"));
        assert!(!note.matches("eggs"));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let note = Note::new("id-1".into(), "text".into(), 1_700_000_000_000);
        let json = serde_json::to_value(&note).expect("serialize");
        assert_eq!(json["createdAt"], 1_700_000_000_000i64);
        assert_eq!(json["updatedAt"], 1_700_000_000_000i64);
        assert_eq!(json["pinned"], false);
    }

    #[test]
    fn missing_pinned_defaults_to_false() {
        let raw = r#"{"id":"x","text":"t","createdAt":1,"updatedAt":2}"#;
        let note: Note = serde_json::from_str(raw).expect("parse");
        assert!(!note.pinned);
        assert!(note.is_edited());
    }
}
