use itertools::Itertools;
use plink::layout::{KeyBinding, Layout};
use plink::matcher::Outcome;
use plink::note::Note;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout as TuiLayout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{App, AppState};

/// Cell width of one white key (including a one-column gap).
const WHITE_KEY_W: u16 = 6;
const BLACK_KEY_W: u16 = 4;
const PIANO_H: u16 = 9;
const CONTENT_H: u16 = 16;

/// Vertical screen regions for the locked view. Shared with mouse
/// hit-testing in main, so both always agree on where the piano is.
fn screen_chunks(area: Rect) -> std::rc::Rc<[Rect]> {
    let pad = area.height.saturating_sub(CONTENT_H) / 2;
    TuiLayout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(pad),
            Constraint::Length(1), // title
            Constraint::Length(1),
            Constraint::Length(PIANO_H),
            Constraint::Length(1),
            Constraint::Length(1), // progress
            Constraint::Length(1), // hint
            Constraint::Length(1),
            Constraint::Length(1), // help
            Constraint::Min(0),
        ])
        .split(area)
}

pub fn piano_area(area: Rect) -> Rect {
    screen_chunks(area)[3]
}

/// Screen rectangles for every key of the layout, in binding order.
/// Accidentals overlay the boundary between their neighboring white keys
/// and occupy the upper half of the piano.
pub fn key_rects<'a>(piano: Rect, layout: &'a Layout) -> Vec<(Rect, &'a KeyBinding)> {
    let white_count = layout.bindings().iter().filter(|b| !b.accidental).count() as u16;
    let total_w = white_count * WHITE_KEY_W;
    let x0 = piano.x + piano.width.saturating_sub(total_w) / 2;

    let mut rects = Vec::with_capacity(layout.len());
    let mut white_idx: u16 = 0;
    for binding in layout.bindings() {
        if binding.accidental {
            // Centered on the gap left of the next white key
            let x = (x0 + white_idx * WHITE_KEY_W).saturating_sub(BLACK_KEY_W / 2);
            rects.push((
                Rect::new(x, piano.y, BLACK_KEY_W, piano.height / 2),
                binding,
            ));
        } else {
            let x = x0 + white_idx * WHITE_KEY_W;
            rects.push((
                Rect::new(x, piano.y, WHITE_KEY_W - 1, piano.height),
                binding,
            ));
            white_idx += 1;
        }
    }
    rects
}

/// Resolves a pointer press to the note under it, if any. Accidentals are
/// checked first since they sit on top of the white keys.
pub fn hit_test<'a>(layout: &'a Layout, piano: Rect, x: u16, y: u16) -> Option<&'a Note> {
    let rects = key_rects(piano, layout);
    let hit = |(rect, _): &(Rect, &KeyBinding)| {
        x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
    };
    rects
        .iter()
        .filter(|(_, b)| b.accidental)
        .find(|rb| hit(rb))
        .or_else(|| rects.iter().filter(|(_, b)| !b.accidental).find(|rb| hit(rb)))
        .map(|(_, b)| &b.note)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Locked => render_locked(self, area, buf),
            AppState::Unlocked => render_unlocked(self, area, buf),
        }
    }
}

fn render_locked(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = screen_chunks(area);
    let dim_style = Style::default().add_modifier(Modifier::DIM);
    let italic_dim = Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM);

    let title = Paragraph::new(Span::styled(
        app.level.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    title.render(chunks[1], buf);

    render_piano(app, chunks[3], buf);

    let progress = app.matcher.progress();
    let progress_line = if progress.is_empty() {
        Line::from(Span::styled("waiting for input...", italic_dim))
    } else {
        let style = if app.matcher.is_error() {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD)
        };
        let dots = progress.iter().map(|_| "●").join(" ");
        Line::from(Span::styled(dots, style))
    };
    Paragraph::new(progress_line)
        .alignment(Alignment::Center)
        .render(chunks[5], buf);

    if app.show_hint && app.level.hint.width() < area.width as usize {
        Paragraph::new(Span::styled(format!("hint: {}", app.level.hint), dim_style))
            .alignment(Alignment::Center)
            .render(chunks[6], buf);
    }

    Paragraph::new(Span::styled(
        "backspace: clear   ←/→: level   esc: quit",
        dim_style,
    ))
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .render(chunks[8], buf);
}

fn render_piano(app: &App, piano: Rect, buf: &mut Buffer) {
    let rects = key_rects(piano, app.level.layout());
    // Keys that don't fit the terminal are skipped rather than clipped
    let fits = |rect: &Rect| rect.right() <= piano.right() && rect.bottom() <= piano.bottom();

    // White keys first, accidentals overlay them
    for (rect, binding) in rects.iter().filter(|(r, b)| !b.accidental && fits(r)) {
        render_key(app, *rect, binding, buf);
    }
    for (rect, binding) in rects.iter().filter(|(r, b)| b.accidental && fits(r)) {
        render_key(app, *rect, binding, buf);
    }
}

fn render_key(app: &App, rect: Rect, binding: &KeyBinding, buf: &mut Buffer) {
    let style = key_style(app, binding);

    let block = Block::default().borders(Borders::ALL).style(style);
    block.render(rect, buf);

    // Fill the interior so the key reads as a solid surface
    let inner_w = rect.width.saturating_sub(2) as usize;
    for y in rect.y + 1..rect.y + rect.height.saturating_sub(1) {
        buf.set_string(rect.x + 1, y, " ".repeat(inner_w), style);
    }

    if !binding.label.is_empty() && rect.height > 1 {
        let label = short_label(&binding.label);
        let label_w = label.width() as u16;
        let x = rect.x + rect.width.saturating_sub(label_w) / 2;
        let y = rect.y + rect.height - 2;
        buf.set_string(x, y, label, style.add_modifier(Modifier::BOLD));
    }
}

fn key_style(app: &App, binding: &KeyBinding) -> Style {
    let is_active = app
        .active_note
        .as_ref()
        .is_some_and(|(note, _)| note == &binding.note);
    let is_wrong_flash = app.matcher.is_error()
        && app
            .matcher
            .last_interaction()
            .is_some_and(|i| i.outcome == Outcome::Wrong && i.note == binding.note);

    if is_wrong_flash {
        Style::default().bg(Color::Red).fg(Color::White)
    } else if is_active {
        Style::default().bg(Color::Yellow).fg(Color::Black)
    } else if binding.accidental {
        Style::default().bg(Color::Black).fg(Color::DarkGray)
    } else {
        Style::default().bg(Color::White).fg(Color::Black)
    }
}

// Long labels don't fit on a key cap
fn short_label(label: &str) -> &str {
    match label {
        "SPACE" => "␣",
        "ENTER" => "⏎",
        other => other,
    }
}

fn render_unlocked(app: &App, area: Rect, buf: &mut Buffer) {
    let pad = area.height.saturating_sub(5) / 2;
    let chunks = TuiLayout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(pad),
            Constraint::Length(1), // banner
            Constraint::Length(1),
            Constraint::Length(1), // subtext
            Constraint::Length(1),
            Constraint::Length(1), // help
            Constraint::Min(0),
        ])
        .split(area);

    let banner = app
        .decipher
        .as_ref()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| "ACCESS GRANTED".to_string());
    Paragraph::new(Span::styled(
        banner,
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        "welcome to the secret area",
        Style::default().fg(Color::Green).add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        "r: lock the gate   esc: quit",
        Style::default().add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center)
    .render(chunks[5], buf);
}
