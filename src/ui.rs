use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};
use tui_textarea::TextArea;

use crate::app::{App, Focus};
use crate::dates::time_caption;
use crate::markup;
use crate::note::Note;

const GUTTER_WIDTH: u16 = 2;

pub fn draw(frame: &mut ratatui::Frame, app: &mut App) {
    let search_height = if app.search_visible() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(5),
            Constraint::Length(search_height),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.size());

    draw_header(frame, app, chunks[0]);
    draw_input(frame, app, chunks[1]);
    if app.search_visible() {
        draw_search(frame, app, chunks[2]);
    } else {
        app.search_area = Rect::default();
    }
    draw_notes(frame, app, chunks[3]);
    draw_status(frame, app, chunks[4]);

    if app.show_help {
        draw_help_overlay(frame);
    }
}

fn draw_header(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(12), Constraint::Length(16)])
        .split(area);

    let title = Paragraph::new(Line::from(vec![
        Span::styled(" ✎ ", Style::default().fg(Color::DarkGray)),
        Span::styled("QuickNotes", Style::default().add_modifier(Modifier::BOLD)),
    ]));
    frame.render_widget(title, chunks[0]);

    let count = app.store.len();
    let noun = if count == 1 { "note" } else { "notes" };
    let counter = Paragraph::new(format!("{count} {noun} "))
        .alignment(Alignment::Right)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(counter, chunks[1]);
}

fn focus_block(title: &str, focused: bool) -> Block<'_> {
    let color = if focused { Color::Yellow } else { Color::DarkGray };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_input(frame: &mut ratatui::Frame, app: &mut App, area: Rect) {
    app.input_area = area;
    let focused = app.focus == Focus::Input && app.editing_id().is_none();
    let block = focus_block("New note", focused);
    let inner = block.inner(area);

    let empty = app.input.lines().iter().all(|l| l.is_empty());
    let lines = if focused {
        textarea_lines_with_cursor(&app.input, inner.width, inner.height)
    } else if empty {
        vec![Line::from(Span::styled(
            "New note… (Enter to save)",
            Style::default().fg(Color::DarkGray).italic(),
        ))]
    } else {
        app.input.lines().iter().map(|l| Line::from(l.clone())).collect()
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_search(frame: &mut ratatui::Frame, app: &mut App, area: Rect) {
    app.search_area = area;
    let focused = app.focus == Focus::Search;

    let line = if app.search.is_empty() && !focused {
        Line::from(Span::styled(
            "Search notes…",
            Style::default().fg(Color::DarkGray).italic(),
        ))
    } else if focused {
        Line::from(Span::styled(
            format!("{}|", app.search),
            Style::default().fg(Color::Yellow),
        ))
    } else {
        Line::from(app.search.clone())
    };

    frame.render_widget(
        Paragraph::new(line).block(focus_block("Search", focused)),
        area,
    );
}

fn draw_notes(frame: &mut ratatui::Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(if app.focus == Focus::List {
            Color::Gray
        } else {
            Color::DarkGray
        }));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    app.note_rects.clear();

    if app.store.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("No notes yet.", Style::default().fg(Color::Gray))),
            Line::from(vec![
                Span::styled("Type above and press ", Style::default().fg(Color::DarkGray)),
                Span::styled("Enter", Style::default().fg(Color::Gray).bold()),
                Span::styled(" to save.", Style::default().fg(Color::DarkGray)),
            ]),
        ])
        .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    let view = app.view();
    if view.filtered == 0 {
        let none = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "No notes match your search.",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .alignment(Alignment::Center);
        frame.render_widget(none, inner);
        return;
    }

    let body_width = inner.width.saturating_sub(GUTTER_WIDTH);
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut placed: Vec<(String, usize, usize)> = Vec::new(); // (note id, first line, line count)

    if !view.pinned.is_empty() {
        lines.push(section_header("Pinned"));
        for note in &view.pinned {
            placed.push(push_card(&mut lines, app, note, body_width));
        }
    }
    for group in &view.groups {
        if !lines.is_empty() {
            lines.push(Line::from(""));
        }
        lines.push(section_header(&group.label));
        for note in &group.notes {
            placed.push(push_card(&mut lines, app, note, body_width));
        }
    }

    // keep the selected card on screen
    let height = usize::from(inner.height);
    let mut scroll = usize::from(app.list_scroll);
    if let Some((_, start, len)) = placed
        .iter()
        .find(|(id, _, _)| app.selected.as_deref() == Some(id.as_str()))
    {
        let start = start.saturating_sub(1); // include the header above the first card
        if start < scroll {
            scroll = start;
        } else if start + len + 1 > scroll + height {
            scroll = (start + len + 1).saturating_sub(height).min(start);
        }
    }
    scroll = scroll.min(lines.len().saturating_sub(1));
    app.list_scroll = scroll_offset(scroll);

    for (id, start, len) in placed {
        let top = start.max(scroll);
        let bottom = (start + len).min(scroll + height);
        if top >= bottom {
            continue;
        }
        let rect = Rect {
            x: inner.x,
            y: inner.y + (top - scroll) as u16,
            width: inner.width,
            height: (bottom - top) as u16,
        };
        app.note_rects.push((id, rect));
    }

    let list = Paragraph::new(lines).scroll((app.list_scroll, 0));
    frame.render_widget(list, inner);
}

// Paragraph scrolling is u16; very long lists saturate instead of wrapping.
fn scroll_offset(scroll: usize) -> u16 {
    u16::try_from(scroll).unwrap_or(u16::MAX)
}

fn section_header(label: &str) -> Line<'static> {
    Line::from(Span::styled(
        format!("  {}", label.to_uppercase()),
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    ))
}

// Appends one note card and returns where it landed.
fn push_card(
    lines: &mut Vec<Line<'static>>,
    app: &App,
    note: &Note,
    width: u16,
) -> (String, usize, usize) {
    let start = lines.len();
    let selected = app.selected.as_deref() == Some(note.id.as_str());
    let card = app.cards.get(&note.id);
    let editing = card.is_some_and(|c| c.is_editing());

    let gutter = if selected {
        Span::styled("▌ ", Style::default().fg(Color::Yellow))
    } else {
        Span::raw("  ")
    };

    let body = if editing {
        textarea_lines_with_cursor(&app.editor, width, u16::MAX)
    } else {
        markup::render(&note.text, width)
    };
    for line in body {
        let mut spans = vec![gutter.clone()];
        spans.extend(line.spans);
        lines.push(Line::from(spans));
    }

    let mut caption = vec![
        gutter,
        Span::styled(
            time_caption(note, &Local),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if note.pinned {
        caption.push(Span::styled("  ★ pinned", Style::default().fg(Color::Yellow)));
    }
    if card.is_some_and(|c| c.is_confirming_delete()) {
        caption.push(Span::raw("  "));
        caption.push(Span::styled(
            "Confirm? (d)",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    if editing {
        caption.push(Span::styled(
            "  Enter to save · Esc to cancel",
            Style::default().fg(Color::DarkGray).italic(),
        ));
    }
    lines.push(Line::from(caption));
    lines.push(Line::from(""));

    (note.id.clone(), start, lines.len() - start)
}

fn draw_status(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let (text, style) = if let Some(err) = app.store.persist_error() {
        (
            format!(" Not saved: {err}"),
            Style::default().fg(Color::Red),
        )
    } else if let Some(message) = &app.message {
        (format!(" {message}"), Style::default().fg(Color::Yellow))
    } else {
        let hint = if app.editing_id().is_some() {
            "Enter save · Alt+Enter new line · Esc cancel"
        } else {
            match app.focus {
                Focus::Input => "Enter save · Alt+Enter new line · Tab next · Esc notes · Ctrl+C quit",
                Focus::Search => "Type to filter · Enter notes · Esc clear",
                Focus::List => "↑↓ select · e edit · p pin · d delete · o open link · / search · i new · ? help · q quit",
            }
        };
        (format!(" {hint}"), Style::default().fg(Color::DarkGray))
    };

    frame.render_widget(Paragraph::new(text).style(style), area);
}

/// Get centered popup area for overlays
fn get_popup_area(frame_width: u16, frame_height: u16, width_percent: u16, height_percent: u16) -> Rect {
    let width = frame_width.saturating_mul(width_percent) / 100;
    let height = frame_height.saturating_mul(height_percent) / 100;
    let x = (frame_width.saturating_sub(width)) / 2;
    let y = (frame_height.saturating_sub(height)) / 2;
    Rect { x, y, width, height }
}

fn draw_help_overlay(frame: &mut ratatui::Frame) {
    let size = frame.size();
    let area = get_popup_area(size.width, size.height, 60, 70);

    let block = Block::default()
        .title("Help")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);

    let rows = [
        ("Enter", "save the new note, or the note being edited"),
        ("Alt+Enter", "new line inside a note"),
        ("Ctrl+S", "save"),
        ("Esc", "cancel an edit / leave the input"),
        ("Tab", "move between input, search and notes"),
        ("↑ ↓  j k", "select a note"),
        ("e", "edit the selected note"),
        ("p", "pin or unpin"),
        ("d d", "delete (press twice within 2.5s)"),
        ("o", "open the first link in the note"),
        ("/", "search (shown once there are 3+ notes)"),
        ("i", "write a new note"),
        ("q / Ctrl+C", "quit"),
    ];
    let lines: Vec<Line> = rows
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!("{keys:>12}  "), Style::default().fg(Color::Yellow)),
                Span::raw(*what),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), chunks[0]);

    let hint = Paragraph::new("Press Esc to dismiss")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray).italic());
    frame.render_widget(hint, chunks[1]);
}

// Wraps the text area to `width` with a '|' at the cursor, keeping the
// cursor's row inside the last `height` rows shown.
fn textarea_lines_with_cursor(textarea: &TextArea, width: u16, height: u16) -> Vec<Line<'static>> {
    let (cursor_row, cursor_col) = textarea.cursor();
    let width = usize::from(width);
    let mut lines = Vec::new();
    let mut cursor_line = 0;
    let text_lines = textarea.lines();

    if text_lines.is_empty() {
        lines.push(Line::from("|"));
        return lines;
    }

    for (idx, line) in text_lines.iter().enumerate() {
        if idx != cursor_row {
            lines.extend(markup::wrap(line, width).into_iter().map(Line::from));
            continue;
        }

        let split = line
            .char_indices()
            .nth(cursor_col)
            .map_or(line.len(), |(i, _)| i);
        let marked = format!("{}|{}", &line[..split], &line[split..]);
        let bars_before = line[..split].matches('|').count();

        let pieces = markup::wrap(&marked, width);
        let mut seen = 0;
        let offset = pieces
            .iter()
            .position(|piece| {
                seen += piece.matches('|').count();
                seen > bars_before
            })
            .unwrap_or(0);
        cursor_line = lines.len() + offset;

        lines.extend(
            pieces
                .into_iter()
                .map(|piece| Line::from(Span::styled(piece, Style::default().fg(Color::Yellow)))),
        );
    }

    let view_height = usize::from(height.max(1));
    if lines.len() > view_height {
        let start = cursor_line.saturating_sub(view_height - 1);
        let end = (start + view_height).min(lines.len());
        lines[start..end].to_vec()
    } else {
        lines
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::store::testing::*;

    fn render(app: &mut App) -> String {
        let backend = TestBackend::new(80, 30);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal.draw(|frame| draw(frame, app)).expect("draw");
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content
            .chunks(usize::from(buffer.area.width))
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app_with(texts: &[&str]) -> App {
        let storage = MemoryStorage::default();
        let clock = ManualClock::at(chrono::Utc::now().timestamp_millis());
        let mut store = store_with(&storage, &clock);
        for text in texts {
            clock.advance(1);
            store.create(text);
        }
        App::new(store)
    }

    #[test]
    fn empty_state_invites_a_first_note() {
        let mut app = app_with(&[]);
        let screen = render(&mut app);
        assert!(screen.contains("No notes yet."));
        assert!(screen.contains("0 notes"));
        assert!(!screen.contains("Search notes"));
    }

    #[test]
    fn notes_are_grouped_under_today() {
        let mut app = app_with(&["Buy milk"]);
        let screen = render(&mut app);
        assert!(screen.contains("1 note "));
        assert!(screen.contains("TODAY"));
        assert!(screen.contains("Buy milk"));
        assert_eq!(app.note_rects.len(), 1);
    }

    #[test]
    fn pinned_section_and_search_box_appear() {
        let mut app = app_with(&["one", "two", "three"]);
        let id = app.store.notes()[2].id.clone();
        app.store.toggle_pin(&id);

        let screen = render(&mut app);
        assert!(screen.contains("PINNED"));
        assert!(screen.contains("Search notes"));
        assert!(screen.contains("★ pinned"));
    }

    #[test]
    fn unmatched_search_says_so() {
        let mut app = app_with(&["one", "two", "three"]);
        app.search = "zzz".to_string();
        let screen = render(&mut app);
        assert!(screen.contains("No notes match your search."));
        assert!(app.note_rects.is_empty());
    }

    #[test]
    fn long_notes_wrap_while_editing() {
        let text = (0..30).map(|i| format!("w{i:02}")).collect::<Vec<_>>().join(" ");
        let mut app = app_with(&[text.as_str()]);
        assert!(render(&mut app).contains("w29"));

        app.focus = Focus::List;
        app.handle_key(KeyEvent::new(KeyCode::Char('e'), KeyModifiers::NONE), Instant::now());
        assert!(app.editing_id().is_some());

        let screen = render(&mut app);
        assert!(screen.contains("w00"));
        assert!(screen.contains("w29|"));
    }

    #[test]
    fn wide_characters_stay_inside_the_card() {
        let text = format!("{}END", "中".repeat(60));
        let mut app = app_with(&[text.as_str()]);
        assert!(render(&mut app).contains("END"));
    }

    #[test]
    fn editor_wrapping_tracks_the_cursor_row() {
        let mut area = TextArea::new(vec!["aaaa bbbb cccc".to_string()]);
        area.move_cursor(tui_textarea::CursorMove::Jump(0, 7));

        let lines = textarea_lines_with_cursor(&area, 6, 1);
        assert_eq!(lines.len(), 1);
        let text: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, "bb|bb");
    }

    #[test]
    fn scroll_offset_saturates() {
        assert_eq!(scroll_offset(42), 42);
        assert_eq!(scroll_offset(70_000), u16::MAX);
    }
}
