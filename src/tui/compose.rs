//! # Frame Composition
//!
//! `compose(state, ui)` turns a session's state into one full-screen frame of
//! styled text. It never mutates state and never fails; whatever `update()`
//! left behind is drawn as-is.
//!
//! ```text
//! List view                         Content view
//! ┌──────────────────────────┐      ┌──────────────────────────┐
//! │ TITLE                    │      │  name ────────────────── │  header
//! │ [image]  [qr]            │      │ viewport line            │
//! │ intro paragraph          │      │ viewport line            │
//! │                          │      │ ...                      │
//! │ ▸ first description      │      │        ↑/k ... • q quit  │  footer
//! │   second description     │      │ ─────────────────  42%   │
//! │ help                     │      └──────────────────────────┘
//! └──────────────────────────┘
//! ```
//!
//! Header and footer lines are measured in display columns, so a document
//! named `"日本.md"` gets the same full-width rule as `"a.md"`.

use ratatui::text::{Line, Span, Text};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::core::state::{SessionState, ViewState};
use crate::tui::banner::Banner;
use crate::tui::keymap::KeyMap;
use crate::tui::theme::Theme;

pub const RULE: char = '─';
pub const SELECTED_MARKER: &str = "▸ ";
pub const UNSELECTED_MARKER: &str = "  ";
pub const EMPTY_LIST_MESSAGE: &str = "No documents available.";
pub const INITIALIZING_MESSAGE: &str = "Initializing...";

/// Narrowest terminal for which header and footer lines are guaranteed to be
/// exactly `width` columns: the width of `" 100% "`.
pub const MIN_FRAME_WIDTH: u16 = 6;

/// Everything a frame needs besides the session's own state. Shared by
/// every session.
pub struct Ui<'a> {
    pub theme: &'a Theme,
    pub keymap: &'a KeyMap,
    pub banner: &'a Banner,
    pub title: &'a str,
    pub intro: &'a str,
}

pub fn compose(state: &SessionState, ui: &Ui<'_>) -> Text<'static> {
    if !state.ready {
        return Text::raw(INITIALIZING_MESSAGE);
    }
    match state.view {
        ViewState::List => list_frame(state, ui),
        ViewState::Content => content_frame(state, ui),
    }
}

fn list_frame(state: &SessionState, ui: &Ui<'_>) -> Text<'static> {
    let width = state.terminal.width as usize;
    let mut lines = vec![Line::from(Span::styled(ui.title.to_string(), ui.theme.title))];

    lines.extend(side_by_side(&ui.banner.image, &ui.banner.qr));

    for row in textwrap::wrap(ui.intro, width.max(1)) {
        lines.push(Line::from(Span::styled(row.into_owned(), ui.theme.intro)));
    }
    lines.push(Line::default());

    // Entries get whatever is left after the blank line and help hint.
    let reserved = lines.len() + 2;
    let room = (state.terminal.height as usize).saturating_sub(reserved).max(1);

    if state.documents.is_empty() {
        lines.push(Line::from(Span::styled(EMPTY_LIST_MESSAGE, ui.theme.entry)));
    } else {
        let (start, end) = entry_window(state.documents.len(), state.cursor, room);
        for (i, doc) in state.documents.iter().enumerate().take(end).skip(start) {
            let (marker, style) = if i == state.cursor {
                (SELECTED_MARKER, ui.theme.selected)
            } else {
                (UNSELECTED_MARKER, ui.theme.entry)
            };
            let label = truncate(&format!("{marker}{}", doc.description), width);
            lines.push(Line::from(Span::styled(label, style)));
        }
    }

    lines.push(Line::default());
    let help = truncate(&ui.keymap.short_help(ViewState::List), width);
    lines.push(Line::from(Span::styled(help, ui.theme.help)));

    Text::from(lines)
}

fn content_frame(state: &SessionState, ui: &Ui<'_>) -> Text<'static> {
    let width = state.terminal.width;
    let name = state
        .selected
        .as_ref()
        .map(|doc| doc.name.as_str())
        .unwrap_or_default();

    let mut lines = Vec::with_capacity(state.terminal.height as usize);
    lines.push(header_line(name, width, ui.theme));
    lines.extend(state.viewport.visible_lines());
    let help = ui.keymap.short_help(ViewState::Content);
    lines.extend(footer_lines(&help, state.viewport.scroll_percent(), width, ui.theme));
    Text::from(lines)
}

/// `" name "` label on the left, accent rule filling the rest.
pub fn header_line(name: &str, width: u16, theme: &Theme) -> Line<'static> {
    let width = width as usize;
    let label = truncate(&format!(" {} ", sanitize(name)), width);
    let rule = rule(width.saturating_sub(display_width(&label)));
    Line::from(vec![
        Span::styled(label, theme.header),
        Span::styled(rule, theme.rule),
    ])
}

/// Right-aligned help, then an accent rule ending in `" NNN% "`.
pub fn footer_lines(help: &str, percent: f64, width: u16, theme: &Theme) -> [Line<'static>; 2] {
    let width = width as usize;

    let help = truncate(help, width);
    let pad = " ".repeat(width.saturating_sub(display_width(&help)));
    let help_line = Line::from(vec![Span::raw(pad), Span::styled(help, theme.help)]);

    let info = truncate(&percent_label(percent), width);
    let rule = rule(width.saturating_sub(display_width(&info)));
    let info_line = Line::from(vec![
        Span::styled(rule, theme.rule),
        Span::styled(info, theme.footer),
    ]);

    [help_line, info_line]
}

pub fn percent_label(percent: f64) -> String {
    format!(" {:>3.0}% ", percent.clamp(0.0, 1.0) * 100.0)
}

/// Join two blocks horizontally, top-aligned. The left block is padded to
/// its widest line so the right block starts in one column.
pub fn side_by_side(left: &Text<'static>, right: &Text<'static>) -> Vec<Line<'static>> {
    let left_width = left.lines.iter().map(Line::width).max().unwrap_or(0);
    let rows = left.lines.len().max(right.lines.len());

    (0..rows)
        .map(|row| {
            let mut spans = Vec::new();
            let mut used = 0;
            if let Some(line) = left.lines.get(row) {
                spans.extend(line.spans.iter().cloned());
                used = line.width();
            }
            if let Some(line) = right.lines.get(row) {
                if used < left_width {
                    spans.push(Span::raw(" ".repeat(left_width - used)));
                }
                spans.extend(line.spans.iter().cloned());
            }
            Line::from(spans)
        })
        .collect()
}

/// `[start, end)` of the entries to show so that `cursor` is visible.
fn entry_window(len: usize, cursor: usize, room: usize) -> (usize, usize) {
    if len <= room {
        return (0, len);
    }
    let start = (cursor + 1).saturating_sub(room).min(len - room);
    (start, start + room)
}

fn rule(columns: usize) -> String {
    std::iter::repeat_n(RULE, columns).collect()
}

/// Control characters would move the remote cursor and break the measured width.
fn sanitize(s: &str) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}

/// Columns `s` occupies, measured the way ratatui measures a span.
fn display_width(s: &str) -> usize {
    s.width()
}

/// Longest prefix of `s` at most `max` display columns wide, cut between
/// grapheme clusters. A wide cluster that would straddle the limit is dropped.
fn truncate(s: &str, max: usize) -> String {
    let mut out = String::new();
    for grapheme in s.graphemes(true) {
        let kept = out.len();
        out.push_str(grapheme);
        if out.width() > max {
            out.truncate(kept);
            break;
        }
    }
    out
}
