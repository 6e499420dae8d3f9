// Lightweight-markup rendering for note text. Notes are stored verbatim;
// this only decides how they look in the terminal.

use std::sync::LazyLock;

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use regex::Regex;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

static INLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*([^*]+)\*\*|`([^`]+)`|\[([^\]]+)\]\(([^)\s]+)\)|\*([^*\s][^*]*)\*")
        .expect("inline markup pattern")
});

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    // trailing punctuation belongs to the sentence, not the URL
    Regex::new(r"\[[^\]]*\]\(([^)\s]+)\)|(https?://[^\s)\]>]*[^\s)\]>.,;:!?])")
        .expect("link pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Heading,
    Bullet(&'static str),
    Quote,
    Code,
    Plain,
}

/// Renders note text into styled lines no wider than `width` columns.
pub fn render(text: &str, width: u16) -> Vec<Line<'static>> {
    let width = usize::from(width.max(8));
    let mut lines = Vec::new();
    let mut in_code_block = false;

    for raw in text.lines() {
        if raw.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
            lines.push(Line::from(Span::styled(
                raw.to_string(),
                Style::default().fg(Color::DarkGray),
            )));
            continue;
        }

        let (block, body) = if in_code_block {
            (Block::Code, raw)
        } else {
            classify(raw)
        };
        let prefix = match block {
            Block::Bullet(marker) => marker,
            Block::Quote => "│ ",
            _ => "",
        };

        let avail = width.saturating_sub(prefix.width()).max(1);
        for (idx, piece) in wrap(body, avail).into_iter().enumerate() {
            let lead = if idx == 0 {
                prefix.to_string()
            } else {
                " ".repeat(prefix.width())
            };
            lines.push(style_piece(block, lead, &piece));
        }
    }

    if lines.is_empty() {
        lines.push(Line::from(""));
    }
    lines
}

/// First link target in the text: a `[label](target)` link or a bare URL.
pub fn first_link(text: &str) -> Option<String> {
    LINK.captures(text).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    })
}

fn classify(line: &str) -> (Block, &str) {
    let trimmed = line.trim_start();

    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&hashes) && trimmed[hashes..].starts_with(' ') {
        return (Block::Heading, trimmed[hashes..].trim_start());
    }

    for (marker, glyph) in [("- [ ] ", "☐ "), ("- [x] ", "☑ "), ("- [X] ", "☑ ")] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return (Block::Bullet(glyph), rest);
        }
    }
    if let Some(rest) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
        return (Block::Bullet("• "), rest);
    }
    if let Some(rest) = trimmed.strip_prefix("> ") {
        return (Block::Quote, rest);
    }

    (Block::Plain, line)
}

fn style_piece(block: Block, lead: String, piece: &str) -> Line<'static> {
    match block {
        Block::Code => Line::from(Span::styled(
            piece.to_string(),
            Style::default().fg(Color::Green),
        )),
        Block::Heading => Line::from(Span::styled(
            piece.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Block::Quote => {
            let mut spans = vec![Span::styled(lead, Style::default().fg(Color::DarkGray))];
            spans.extend(
                inline_spans(piece)
                    .into_iter()
                    .map(|s| Span {
                        style: s.style.add_modifier(Modifier::ITALIC),
                        ..s
                    }),
            );
            Line::from(spans)
        }
        Block::Bullet(_) | Block::Plain => {
            let mut spans = Vec::new();
            if !lead.is_empty() {
                spans.push(Span::styled(lead, Style::default().fg(Color::DarkGray)));
            }
            spans.extend(inline_spans(piece));
            Line::from(spans)
        }
    }
}

fn inline_spans(text: &str) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut last = 0;

    for caps in INLINE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            spans.push(Span::raw(text[last..whole.start()].to_string()));
        }

        let span = if let Some(bold) = caps.get(1) {
            Span::styled(
                bold.as_str().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )
        } else if let Some(code) = caps.get(2) {
            Span::styled(code.as_str().to_string(), Style::default().fg(Color::Green))
        } else if let Some(label) = caps.get(3) {
            Span::styled(
                label.as_str().to_string(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::UNDERLINED),
            )
        } else if let Some(em) = caps.get(5) {
            Span::styled(
                em.as_str().to_string(),
                Style::default().add_modifier(Modifier::ITALIC),
            )
        } else {
            Span::raw(whole.as_str().to_string())
        };
        spans.push(span);
        last = whole.end();
    }

    if last < text.len() {
        spans.push(Span::raw(text[last..].to_string()));
    }
    spans
}

/// Word-wraps one line to `width` terminal columns, splitting words that
/// are wider than a whole line. Wide characters count as two columns.
pub fn wrap(line: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in line.split(' ') {
        let word_width = word.width();
        let needed = if current_width == 0 {
            word_width
        } else {
            current_width + 1 + word_width
        };

        if needed <= width {
            if current_width > 0 {
                current.push(' ');
                current_width += 1;
            }
            current.push_str(word);
            current_width += word_width;
            continue;
        }

        if current_width > 0 {
            out.push(std::mem::take(&mut current));
            current_width = 0;
        }

        for c in word.chars() {
            let char_width = c.width().unwrap_or(0);
            if current_width > 0 && current_width + char_width > width {
                out.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(c);
            current_width += char_width;
        }
    }

    out.push(current);
    out
}
