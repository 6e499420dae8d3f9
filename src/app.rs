use std::time::Instant;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use log::{info, warn};
use ratatui::layout::Rect;
use tui_textarea::{CursorMove, Input, Key, TextArea};

use crate::card::{CardSet, DeletePress};
use crate::config::{DELETE_CONFIRM_WINDOW, SEARCH_THRESHOLD};
use crate::markup;
use crate::store::NoteStore;
use crate::view::{self, NoteView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Search,
    List,
}

pub struct App {
    pub store: NoteStore,
    pub cards: CardSet,
    pub focus: Focus,
    pub input: TextArea<'static>, // new-note entry
    pub editor: TextArea<'static>, // text of the card being edited
    pub search: String,
    pub selected: Option<String>,
    pub show_help: bool,
    pub message: Option<String>,
    pub list_scroll: u16,

    // UI areas for mouse support
    pub input_area: Rect,
    pub search_area: Rect,
    pub note_rects: Vec<(String, Rect)>,
}

impl App {
    pub fn new(store: NoteStore) -> Self {
        let mut app = Self {
            store,
            cards: CardSet::new(DELETE_CONFIRM_WINDOW),
            focus: Focus::Input,
            input: text_area(""),
            editor: text_area(""),
            search: String::new(),
            selected: None,
            show_help: false,
            message: None,
            list_scroll: 0,
            input_area: Rect::default(),
            search_area: Rect::default(),
            note_rects: Vec::new(),
        };
        app.after_change();
        app
    }

    /// filter -> partition -> group, recomputed against the wall clock.
    pub fn view(&self) -> NoteView {
        view::derive(self.store.notes(), &self.search, &Local::now())
    }

    pub fn search_visible(&self) -> bool {
        self.store.len() > SEARCH_THRESHOLD
    }

    pub fn editing_id(&self) -> Option<String> {
        self.cards.editing().map(str::to_string)
    }

    /// Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.commit_edit();
            return true;
        }

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?')) {
                self.show_help = false;
            }
            return false;
        }

        self.message = None;
        let quit = if self.editing_id().is_some() {
            self.handle_edit_key(key);
            false
        } else {
            match self.focus {
                Focus::Input => self.handle_input_key(key),
                Focus::Search => self.handle_search_key(key),
                Focus::List => self.handle_list_key(key, now),
            }
        };

        self.after_change();
        quit
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let hit = self
                    .note_rects
                    .iter()
                    .find(|(_, rect)| inside_rect(mouse, *rect))
                    .map(|(id, _)| id.clone());

                // clicking anywhere but the edited card takes focus away from it
                if let Some(editing) = self.editing_id() {
                    if hit.as_deref() != Some(editing.as_str()) {
                        self.commit_edit();
                    }
                }

                if inside_rect(mouse, self.input_area) {
                    self.focus = Focus::Input;
                } else if self.search_visible() && inside_rect(mouse, self.search_area) {
                    self.focus = Focus::Search;
                } else if let Some(id) = hit {
                    self.selected = Some(id);
                    self.focus = Focus::List;
                }
            }
            MouseEventKind::ScrollUp if self.editing_id().is_none() => self.move_selection(-1),
            MouseEventKind::ScrollDown if self.editing_id().is_none() => self.move_selection(1),
            _ => {}
        }
        self.after_change();
    }

    /// Timer tick: disarms expired delete confirmations.
    pub fn on_tick(&mut self, now: Instant) {
        if self.cards.expire(now) {
            self.message = None;
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        let Some(id) = self.editing_id() else {
            return;
        };

        if is_submit(&key) {
            self.commit_edit();
            return;
        }
        match key.code {
            KeyCode::Esc => {
                self.cancel_edit();
                return;
            }
            KeyCode::Tab => {
                self.commit_edit();
                self.cycle_focus();
                return;
            }
            _ => {}
        }

        self.editor.input(textarea_input(key));
        if let Some(card) = self.cards.get_mut(&id) {
            card.set_draft(self.editor.lines().join("\n"));
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) -> bool {
        if is_submit(&key) {
            self.submit_new_note();
            return false;
        }

        match key.code {
            KeyCode::Esc => self.focus = Focus::List,
            KeyCode::Tab => self.cycle_focus(),
            _ => {
                self.input.input(textarea_input(key));
            }
        }
        false
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.search.clear();
                self.focus = Focus::List;
            }
            KeyCode::Enter | KeyCode::Down => self.focus = Focus::List,
            KeyCode::Tab => self.cycle_focus(),
            KeyCode::Backspace => {
                self.search.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search.push(c);
            }
            _ => {}
        }
        false
    }

    fn handle_list_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Home | KeyCode::Char('g') => self.move_selection(isize::MIN),
            KeyCode::End | KeyCode::Char('G') => self.move_selection(isize::MAX),
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(id) = self.selected.clone() {
                    self.begin_edit(&id);
                }
            }
            KeyCode::Char('p') => {
                if let Some(id) = self.selected.clone() {
                    self.store.toggle_pin(&id);
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => self.press_delete(now),
            KeyCode::Char('o') => self.open_link(),
            KeyCode::Char('/') if self.search_visible() => self.focus = Focus::Search,
            KeyCode::Char('i') | KeyCode::Char('n') => self.focus = Focus::Input,
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Tab => self.cycle_focus(),
            KeyCode::Esc => self.search.clear(),
            _ => {}
        }
        false
    }

    fn submit_new_note(&mut self) {
        let text = self.input.lines().join("\n");
        if let Some(note) = self.store.create(&text) {
            info!("new note {} ({} chars)", note.id, note.text.chars().count());
            self.input = text_area("");
            self.selected = Some(note.id);
        }
    }

    fn begin_edit(&mut self, id: &str) {
        self.commit_edit();
        let Some(note) = self.store.get(id).cloned() else {
            return;
        };
        if let Some(card) = self.cards.get_mut(id) {
            card.begin_edit(&note);
            self.editor = text_area(card.draft());
            self.focus = Focus::List;
        }
    }

    /// Saves the card being edited, if any.
    fn commit_edit(&mut self) {
        if let Some(id) = self.editing_id() {
            if let Some(card) = self.cards.get_mut(&id) {
                card.save(&mut self.store);
            }
        }
    }

    fn cancel_edit(&mut self) {
        let Some(id) = self.editing_id() else {
            return;
        };
        let Some(note) = self.store.get(&id).cloned() else {
            return;
        };
        if let Some(card) = self.cards.get_mut(&id) {
            card.cancel(&note);
        }
    }

    fn press_delete(&mut self, now: Instant) {
        let Some(id) = self.selected.clone() else {
            return;
        };
        let position = self.view().ordered_ids().iter().position(|s| *s == id);
        let Some(card) = self.cards.get_mut(&id) else {
            return;
        };

        match card.press_delete(&mut self.store, now) {
            DeletePress::Armed => {
                self.message = Some("Press d again to delete".to_string());
            }
            DeletePress::Deleted => {
                info!("deleted note {id}");
                let view = self.view();
                let ids = view.ordered_ids();
                self.selected = position
                    .and_then(|pos| ids.get(pos.min(ids.len().saturating_sub(1))))
                    .map(|s| s.to_string());
            }
        }
    }

    fn open_link(&mut self) {
        let Some(note) = self.selected.as_deref().and_then(|id| self.store.get(id)) else {
            return;
        };
        let Some(url) = markup::first_link(&note.text) else {
            self.message = Some("No link in this note".to_string());
            return;
        };

        self.message = Some(match open::that(&url) {
            Ok(()) => format!("Opened {url}"),
            Err(err) => {
                warn!("failed to open {url}: {err}");
                format!("Could not open {url}")
            }
        });
    }

    fn move_selection(&mut self, delta: isize) {
        let view = self.view();
        let ids = view.ordered_ids();
        if ids.is_empty() {
            return;
        }

        let current = self
            .selected
            .as_deref()
            .and_then(|sel| ids.iter().position(|id| *id == sel))
            .unwrap_or(0);
        let last = ids.len() - 1;
        let next = current.saturating_add_signed(delta).min(last);
        self.selected = Some(ids[next].to_string());
    }

    fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input if self.search_visible() => Focus::Search,
            Focus::Input => Focus::List,
            Focus::Search => Focus::List,
            Focus::List => Focus::Input,
        };
    }

    // Runs after every event: cards follow the collection, the search box
    // hides (and forgets its query) at or below the threshold, and the
    // selection stays on a visible note.
    fn after_change(&mut self) {
        self.cards.reconcile(&self.store);

        if !self.search_visible() {
            self.search.clear();
            if self.focus == Focus::Search {
                self.focus = Focus::Input;
            }
        }

        let view = self.view();
        let ids = view.ordered_ids();
        let still_visible = self
            .selected
            .as_deref()
            .is_some_and(|sel| ids.contains(&sel));
        if !still_visible {
            self.selected = ids.first().map(|s| s.to_string());
        }
    }
}

/// Text area holding `content` with the cursor at its end.
pub fn text_area(content: &str) -> TextArea<'static> {
    let mut lines: Vec<String> = content.lines().map(|s| s.to_string()).collect();
    if lines.is_empty() {
        lines.push(String::new());
    }
    let end_row = lines.len().saturating_sub(1);
    let end_col = lines.last().map(|l| l.chars().count()).unwrap_or(0);

    let mut area = TextArea::new(lines);
    area.move_cursor(CursorMove::Jump(end_row as u16, end_col as u16));
    area
}

// Enter saves; Shift+Enter or Alt+Enter continues on a new line.
fn is_line_break(key: &KeyEvent) -> bool {
    key.code == KeyCode::Enter && key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT)
}

fn is_submit(key: &KeyEvent) -> bool {
    (key.code == KeyCode::Enter && !is_line_break(key))
        || (key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL))
}

fn textarea_input(key: KeyEvent) -> Input {
    if is_line_break(&key) {
        return Input {
            key: Key::Enter,
            ctrl: false,
            alt: false,
        };
    }

    Input {
        key: match key.code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Delete => Key::Delete,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Tab => Key::Tab,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            KeyCode::Esc => Key::Esc,
            KeyCode::F(n) => Key::F(n),
            _ => Key::Null,
        },
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        alt: key.modifiers.contains(KeyModifiers::ALT),
    }
}

pub fn inside_rect(mouse: MouseEvent, rect: Rect) -> bool {
    mouse.column >= rect.x
        && mouse.column < rect.x + rect.width
        && mouse.row >= rect.y
        && mouse.row < rect.y + rect.height
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::store::testing::*;

    const T0: i64 = 1_771_840_800_000;

    fn app() -> (App, MemoryStorage, ManualClock) {
        let storage = MemoryStorage::default();
        let clock = ManualClock::at(T0);
        (App::new(store_with(&storage, &clock)), storage, clock)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(key(code), Instant::now())
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn add_note(app: &mut App, text: &str) -> String {
        app.focus = Focus::Input;
        type_text(app, text);
        press(app, KeyCode::Enter);
        app.selected.clone().expect("new note selected")
    }

    #[test]
    fn enter_in_the_input_creates_a_note() {
        let (mut app, storage, _) = app();
        assert_eq!(app.focus, Focus::Input);

        add_note(&mut app, "Buy milk");
        assert_eq!(app.store.len(), 1);
        assert_eq!(app.store.notes()[0].text, "Buy milk");
        assert_eq!(app.input.lines().join("\n"), "");
        assert_eq!(storage.writes.get(), 1);
    }

    #[test]
    fn blank_input_creates_nothing() {
        let (mut app, storage, _) = app();
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter);
        assert!(app.store.is_empty());
        assert_eq!(storage.writes.get(), 0);
    }

    #[test]
    fn alt_enter_continues_on_a_new_line() {
        let (mut app, _, _) = app();
        type_text(&mut app, "first");
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::ALT), Instant::now());
        type_text(&mut app, "second");
        assert!(app.store.is_empty());

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.store.notes()[0].text, "first\nsecond");
    }

    #[test]
    fn new_notes_appear_first() {
        let (mut app, _, clock) = app();
        add_note(&mut app, "older");
        clock.advance(1000);
        let newer = add_note(&mut app, "newer");
        assert_eq!(app.view().ordered_ids()[0], newer);
    }

    #[test]
    fn end_to_end_lifecycle() {
        let (mut app, _, clock) = app();
        let id = add_note(&mut app, "Buy milk");
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.focus, Focus::List);

        press(&mut app, KeyCode::Char('p'));
        let view = app.view();
        assert_eq!(view.pinned.len(), 1);
        assert!(view.groups.is_empty());

        clock.advance(5_000);
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(app.editing_id().as_deref(), Some(id.as_str()));
        type_text(&mut app, " and eggs");
        press(&mut app, KeyCode::Enter);
        assert!(app.editing_id().is_none());

        let note = app.store.get(&id).expect("still there");
        assert_eq!(note.text, "Buy milk and eggs");
        assert!(note.updated_at > note.created_at);
        assert!(note.pinned);

        let now = Instant::now();
        app.handle_key(key(KeyCode::Char('d')), now);
        assert_eq!(app.store.len(), 1);
        app.handle_key(key(KeyCode::Char('d')), now + Duration::from_millis(1000));
        assert!(app.store.is_empty());
        assert!(app.selected.is_none());
    }

    #[test]
    fn delete_after_the_window_only_rearms() {
        let (mut app, _, _) = app();
        add_note(&mut app, "keep");
        app.focus = Focus::List;

        let now = Instant::now();
        app.handle_key(key(KeyCode::Char('d')), now);
        app.on_tick(now + Duration::from_millis(2600));
        app.handle_key(key(KeyCode::Char('d')), now + Duration::from_millis(2700));
        assert_eq!(app.store.len(), 1);

        let id = app.selected.clone().expect("selected");
        assert!(app.cards.get(&id).expect("card").is_confirming_delete());
    }

    #[test]
    fn tick_disarms_the_guard() {
        let (mut app, _, _) = app();
        let id = add_note(&mut app, "keep");
        app.focus = Focus::List;

        let now = Instant::now();
        app.handle_key(key(KeyCode::Char('d')), now);
        assert!(app.cards.get(&id).expect("card").is_confirming_delete());

        app.on_tick(now + Duration::from_millis(2500));
        assert!(!app.cards.get(&id).expect("card").is_confirming_delete());
        assert_eq!(app.store.len(), 1);
    }

    #[test]
    fn deleting_selects_the_next_note() {
        let (mut app, _, clock) = app();
        let a = add_note(&mut app, "a");
        clock.advance(10);
        let b = add_note(&mut app, "b");
        clock.advance(10);
        add_note(&mut app, "c");
        app.focus = Focus::List;
        app.selected = Some(b.clone());

        let now = Instant::now();
        app.handle_key(key(KeyCode::Char('d')), now);
        app.handle_key(key(KeyCode::Char('d')), now);
        assert!(app.store.get(&b).is_none());
        assert_eq!(app.selected.as_deref(), Some(a.as_str()));
    }

    #[test]
    fn escape_cancels_an_edit() {
        let (mut app, storage, _) = app();
        let id = add_note(&mut app, "original");
        app.focus = Focus::List;
        let writes = storage.writes.get();

        press(&mut app, KeyCode::Char('e'));
        type_text(&mut app, " changed");
        press(&mut app, KeyCode::Esc);

        assert!(app.editing_id().is_none());
        assert_eq!(app.store.get(&id).expect("exists").text, "original");
        assert_eq!(app.cards.get(&id).expect("card").draft(), "original");
        assert_eq!(storage.writes.get(), writes);
    }

    #[test]
    fn losing_focus_saves_the_edit() {
        let (mut app, _, _) = app();
        let id = add_note(&mut app, "draft");
        app.focus = Focus::List;

        press(&mut app, KeyCode::Char('e'));
        type_text(&mut app, "ed");
        press(&mut app, KeyCode::Tab);

        assert!(app.editing_id().is_none());
        assert_eq!(app.store.get(&id).expect("exists").text, "drafted");
        assert_eq!(app.focus, Focus::Input);
    }

    #[test]
    fn unchanged_edit_does_not_write() {
        let (mut app, storage, _) = app();
        let id = add_note(&mut app, "same");
        app.focus = Focus::List;
        let writes = storage.writes.get();

        press(&mut app, KeyCode::Char('e'));
        type_text(&mut app, "  ");
        press(&mut app, KeyCode::Enter);

        assert_eq!(storage.writes.get(), writes);
        assert!(!app.store.get(&id).expect("exists").is_edited());
    }

    #[test]
    fn search_box_needs_more_than_two_notes() {
        let (mut app, _, clock) = app();
        add_note(&mut app, "apple pie");
        add_note(&mut app, "banana");
        app.focus = Focus::List;

        press(&mut app, KeyCode::Char('/'));
        assert_eq!(app.focus, Focus::List);

        clock.advance(10);
        add_note(&mut app, "Apple juice");
        app.focus = Focus::List;
        press(&mut app, KeyCode::Char('/'));
        assert_eq!(app.focus, Focus::Search);

        type_text(&mut app, "APPLE");
        let view = app.view();
        assert_eq!(view.filtered, 2);
        assert!(view
            .groups
            .iter()
            .flat_map(|g| g.notes.iter())
            .all(|n| n.text.to_lowercase().contains("apple")));
    }

    #[test]
    fn search_clears_when_the_box_hides() {
        let (mut app, _, _) = app();
        for text in ["one", "two", "three"] {
            add_note(&mut app, text);
        }
        app.search = "t".to_string();
        app.focus = Focus::List;

        let now = Instant::now();
        app.handle_key(key(KeyCode::Char('d')), now);
        app.handle_key(key(KeyCode::Char('d')), now);
        assert_eq!(app.store.len(), 2);
        assert!(app.search.is_empty());
    }

    #[test]
    fn selection_moves_through_pinned_then_groups() {
        let (mut app, _, clock) = app();
        let a = add_note(&mut app, "a");
        clock.advance(10);
        let b = add_note(&mut app, "b");
        app.focus = Focus::List;
        app.selected = Some(a.clone());
        press(&mut app, KeyCode::Char('p'));

        press(&mut app, KeyCode::Home);
        assert_eq!(app.selected.as_deref(), Some(a.as_str()));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.selected.as_deref(), Some(b.as_str()));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.selected.as_deref(), Some(b.as_str()));
    }

    #[test]
    fn q_quits_only_from_the_list() {
        let (mut app, _, _) = app();
        assert!(!press(&mut app, KeyCode::Char('q')));
        app.focus = Focus::List;
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn ctrl_c_saves_a_pending_edit() {
        let (mut app, _, _) = app();
        let id = add_note(&mut app, "note");
        app.focus = Focus::List;
        press(&mut app, KeyCode::Char('e'));
        type_text(&mut app, "s");

        let quit = app.handle_key(
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Instant::now(),
        );
        assert!(quit);
        assert_eq!(app.store.get(&id).expect("exists").text, "notes");
    }

    #[test]
    fn clicking_outside_the_card_saves_the_edit() {
        let (mut app, _, _) = app();
        let id = add_note(&mut app, "draft");
        app.focus = Focus::List;
        press(&mut app, KeyCode::Char('e'));
        type_text(&mut app, "ed");

        app.note_rects = vec![(id.clone(), Rect::new(0, 10, 40, 3))];
        app.handle_mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 60,
            row: 2,
            modifiers: KeyModifiers::NONE,
        });

        assert!(app.editing_id().is_none());
        assert_eq!(app.store.get(&id).expect("exists").text, "drafted");
    }

    #[test]
    fn clicking_inside_the_card_keeps_editing() {
        let (mut app, _, _) = app();
        let id = add_note(&mut app, "draft");
        app.focus = Focus::List;
        press(&mut app, KeyCode::Char('e'));
        type_text(&mut app, "ed");

        app.note_rects = vec![(id.clone(), Rect::new(0, 10, 40, 3))];
        app.handle_mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 5,
            row: 11,
            modifiers: KeyModifiers::NONE,
        });

        assert_eq!(app.editing_id().as_deref(), Some(id.as_str()));
        assert_eq!(app.store.get(&id).expect("exists").text, "draft");
    }
}
