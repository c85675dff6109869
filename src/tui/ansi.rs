//! Tool output → ratatui `Text`.
//!
//! The banner art comes from external tools that color their output with
//! escape sequences. ratatui would print those bytes literally and count
//! them toward line width, so the output is played into a `vt100` screen
//! sized to hold it and read back cell by cell. Cursor movement, erases and
//! wide glyphs are resolved by the emulator, not by us.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use vt100::{Color as VtColor, Parser, Screen};

/// Largest screen the art is played into. A line never occupies more
/// columns than it has bytes, so byte length bounds the width.
const MAX_ROWS: usize = 512;
const MAX_COLUMNS: usize = 1024;

pub fn to_text(input: &str) -> Text<'static> {
    let raw_lines: Vec<&str> = input.split('\n').collect();
    let rows = raw_lines.len().clamp(1, MAX_ROWS) as u16;
    let cols = raw_lines
        .iter()
        .map(|line| line.len())
        .max()
        .unwrap_or(0)
        .clamp(1, MAX_COLUMNS) as u16;

    let mut parser = Parser::new(rows, cols, 0);
    // Tools emit bare LF; a terminal in raw mode needs CR to return.
    parser.process(input.replace('\n', "\r\n").as_bytes());

    let screen = parser.screen();
    let lines: Vec<Line<'static>> = (0..rows).map(|row| render_row(screen, row, cols)).collect();
    Text::from(lines)
}

/// One screen row up to its last painted cell, batching runs of equal style.
fn render_row(screen: &Screen, row: u16, cols: u16) -> Line<'static> {
    let painted = (0..cols)
        .rev()
        .find(|&col| screen.cell(row, col).is_some_and(is_painted))
        .map_or(0, |col| col + 1);

    let mut spans: Vec<Span<'static>> = Vec::new();
    for col in 0..painted {
        let Some(cell) = screen.cell(row, col) else {
            continue;
        };
        // Wide character continuations are skipped
        if cell.is_wide_continuation() {
            continue;
        }

        let style = style_for_cell(cell);
        let content = if cell.has_contents() {
            cell.contents().to_string()
        } else {
            " ".to_string()
        };

        match spans.last_mut() {
            Some(last) if last.style == style => last.content.to_mut().push_str(&content),
            _ => spans.push(Span::styled(content, style)),
        }
    }
    Line::from(spans)
}

/// Written text, or a blank that still shows a background.
fn is_painted(cell: &vt100::Cell) -> bool {
    cell.has_contents() || cell.bgcolor() != VtColor::Default || cell.inverse()
}

/// Convert vt100 cell attributes to ratatui Style.
fn style_for_cell(cell: &vt100::Cell) -> Style {
    let mut style = Style::default();
    if let Some(fg) = map_color(cell.fgcolor()) {
        style = style.fg(fg);
    }
    if let Some(bg) = map_color(cell.bgcolor()) {
        style = style.bg(bg);
    }

    if cell.bold() {
        style = style.add_modifier(Modifier::BOLD);
    }
    if cell.dim() {
        style = style.add_modifier(Modifier::DIM);
    }
    if cell.italic() {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if cell.underline() {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if cell.inverse() {
        style = style.add_modifier(Modifier::REVERSED);
    }

    style
}

/// Default colors stay unset so the art inherits the frame's colors.
fn map_color(color: VtColor) -> Option<Color> {
    match color {
        VtColor::Default => None,
        VtColor::Idx(idx) => Some(Color::Indexed(idx)),
        VtColor::Rgb(r, g, b) => Some(Color::Rgb(r, g, b)),
    }
}
