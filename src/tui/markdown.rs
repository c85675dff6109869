//! Markdown → ratatui `Text` renderer.
//!
//! Walks `pulldown_cmark` events and emits styled `Line`/`Span` values.
//! Headings, emphasis, inline code, fenced code blocks (with syntect
//! highlighting), lists, blockquotes, links, images, and simple tables.
//!
//! Output is never wrapped here; the session wraps to the viewport width.

use std::fmt;
use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use unicode_width::UnicodeWidthStr;

use crate::core::content::{ContentRenderer, RenderFailure};

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    UnknownTheme(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::UnknownTheme(name) => write!(f, "unknown markdown theme: {name}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// Colors for one named theme. `None` means "terminal default".
#[derive(Debug, Clone, Copy)]
struct Palette {
    text: Option<Color>,
    heading: Option<Color>,
    muted: Option<Color>,
    link: Option<Color>,
    code_fg: Option<Color>,
    code_bg: Option<Color>,
    /// syntect theme for fenced code, `None` disables highlighting.
    syntax: Option<&'static str>,
}

impl Palette {
    fn named(theme: &str) -> Result<Self, RenderError> {
        match theme {
            "dark" => Ok(Self {
                text: Some(Color::Gray),
                heading: Some(Color::Rgb(0xfc, 0xd3, 0x4d)),
                muted: Some(Color::DarkGray),
                link: Some(Color::Cyan),
                code_fg: Some(Color::White),
                code_bg: Some(Color::DarkGray),
                syntax: Some("base16-ocean.dark"),
            }),
            "light" => Ok(Self {
                text: Some(Color::Black),
                heading: Some(Color::Blue),
                muted: Some(Color::Gray),
                link: Some(Color::Blue),
                code_fg: Some(Color::Black),
                code_bg: Some(Color::Gray),
                syntax: Some("InspiredGitHub"),
            }),
            "notty" => Ok(Self {
                text: None,
                heading: None,
                muted: None,
                link: None,
                code_fg: None,
                code_bg: None,
                syntax: None,
            }),
            other => Err(RenderError::UnknownTheme(other.to_string())),
        }
    }

    fn fg(color: Option<Color>) -> Style {
        match color {
            Some(c) => Style::default().fg(c),
            None => Style::default(),
        }
    }
}

/// Render markdown with one of the named themes (`dark`, `light`, `notty`).
pub fn render(content: &str, theme: &str) -> Result<Text<'static>, RenderError> {
    let palette = Palette::named(theme)?;

    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts.insert(Options::ENABLE_TABLES);

    let mut w = Writer::new(palette);
    for event in Parser::new_ext(content, opts) {
        w.handle(event);
    }
    Ok(w.text)
}

/// [`ContentRenderer`] backed by [`render`].
pub struct MarkdownRenderer;

impl ContentRenderer for MarkdownRenderer {
    fn render(&self, markdown: &str, theme: &str) -> Result<Text<'static>, RenderFailure> {
        Ok(render(markdown, theme)?)
    }
}

// ── Writer ──────────────────────────────────────────────────────────────────

struct Writer {
    text: Text<'static>,
    palette: Palette,
    /// Inline style stack; styles compose via `patch`.
    styles: Vec<Style>,
    /// Per-line prefix spans (blockquote and code block borders).
    line_prefixes: Vec<Span<'static>>,
    /// List nesting: None = unordered, Some(n) = ordered at index n.
    list_indices: Vec<Option<u64>>,
    highlighter: Option<HighlightLines<'static>>,
    in_plain_code: bool,
    link_url: Option<String>,
    image_url: Option<String>,
    table: Option<Table>,
    needs_newline: bool,
}

#[derive(Default)]
struct Table {
    rows: Vec<Vec<String>>,
    cell: String,
    header_rows: usize,
}

impl Writer {
    fn new(palette: Palette) -> Self {
        Self {
            text: Text::default(),
            palette,
            styles: vec![],
            line_prefixes: vec![],
            list_indices: vec![],
            highlighter: None,
            in_plain_code: false,
            link_url: None,
            image_url: None,
            table: None,
            needs_newline: false,
        }
    }

    fn style(&self) -> Style {
        self.styles
            .last()
            .copied()
            .unwrap_or_else(|| Palette::fg(self.palette.text))
    }

    fn push_style(&mut self, overlay: Style) {
        self.styles.push(self.style().patch(overlay));
    }

    fn pop_style(&mut self) {
        self.styles.pop();
    }

    fn muted(&self) -> Style {
        Palette::fg(self.palette.muted)
    }

    fn push_line(&mut self, line: Line<'static>) {
        let mut out = line;
        for pfx in self.line_prefixes.iter().rev().cloned() {
            out.spans.insert(0, pfx);
        }
        self.text.lines.push(out);
    }

    fn push_span(&mut self, span: Span<'static>) {
        if let Some(line) = self.text.lines.last_mut() {
            line.push_span(span);
        } else {
            self.push_line(Line::from(vec![span]));
        }
    }

    fn blank_line_if_needed(&mut self) {
        if self.needs_newline {
            self.push_line(Line::default());
            self.needs_newline = false;
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        if let Some(table) = self.table.as_mut() {
            match &event {
                Event::Text(t) | Event::Code(t) => {
                    table.cell.push_str(t);
                    return;
                }
                Event::Start(Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. })
                | Event::End(TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link) => {
                    return;
                }
                _ => {}
            }
        }

        match event {
            Event::Start(tag) => self.open(tag),
            Event::End(tag) => self.close(tag),
            Event::Text(t) => self.text(t),
            Event::Code(c) => self.inline_code(c),
            Event::SoftBreak => self.push_span(Span::raw(" ")),
            Event::HardBreak => self.push_line(Line::default()),
            Event::Rule => {
                self.blank_line_if_needed();
                let style = self.muted();
                self.push_line(Line::from(Span::styled("─".repeat(40), style)));
                self.needs_newline = true;
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[✓] " } else { "[ ] " };
                self.push_span(Span::raw(marker));
            }
            _ => {} // HTML, footnotes, math
        }
    }

    fn open(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.blank_line_if_needed();
                self.push_line(Line::default());
            }
            Tag::Heading { level, .. } => {
                self.blank_line_if_needed();
                let hs = self.heading_style(level);
                if level == HeadingLevel::H1 {
                    self.push_line(Line::from(Span::styled(" ", hs)));
                } else {
                    let depth = heading_depth(level) as usize;
                    self.push_line(Line::from(Span::styled(format!("{} ", "#".repeat(depth)), hs)));
                }
                self.push_style(hs);
            }
            Tag::BlockQuote(_) => {
                self.blank_line_if_needed();
                let muted = self.muted();
                self.line_prefixes.push(Span::styled("│ ", muted));
                self.push_style(Style::default().add_modifier(Modifier::ITALIC));
            }
            Tag::CodeBlock(kind) => {
                self.blank_line_if_needed();
                let lang = match &kind {
                    CodeBlockKind::Fenced(l) => l.split_whitespace().next().unwrap_or(""),
                    CodeBlockKind::Indented => "",
                };

                let bs = self.muted();
                let top = if lang.is_empty() {
                    Line::from(Span::styled("╭──", bs))
                } else {
                    Line::from(vec![
                        Span::styled("╭── ", bs),
                        Span::styled(lang.to_owned(), bs.add_modifier(Modifier::BOLD)),
                        Span::styled(" ──", bs),
                    ])
                };
                self.push_line(top);
                self.line_prefixes.push(Span::styled("│ ", bs));

                if let Some(theme_name) = self.palette.syntax
                    && !lang.is_empty()
                    && let Some(syn) = SYNTAX_SET.find_syntax_by_token(lang)
                    && let Some(theme) = THEME_SET.themes.get(theme_name)
                {
                    self.highlighter = Some(HighlightLines::new(syn, theme));
                }
                if self.highlighter.is_none() {
                    self.in_plain_code = true;
                }
            }
            Tag::List(start) => {
                if self.list_indices.is_empty() {
                    self.blank_line_if_needed();
                }
                self.list_indices.push(start);
            }
            Tag::Item => {
                self.push_line(Line::default());
                let depth = self.list_indices.len().saturating_sub(1);
                let indent = "  ".repeat(depth);
                let muted = self.muted();
                if let Some(idx) = self.list_indices.last_mut() {
                    let marker = match idx {
                        None => format!("{indent}• "),
                        Some(n) => {
                            let s = format!("{indent}{n}. ");
                            *n += 1;
                            s
                        }
                    };
                    self.push_span(Span::styled(marker, muted));
                }
            }
            Tag::Table(_) => {
                self.blank_line_if_needed();
                self.table = Some(Table::default());
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.rows.push(Vec::new());
                }
            }
            Tag::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.cell.clear();
                }
            }

            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { dest_url, .. } => {
                self.link_url = Some(dest_url.to_string());
                let link = Palette::fg(self.palette.link).add_modifier(Modifier::UNDERLINED);
                self.push_style(link);
            }
            Tag::Image { dest_url, .. } => {
                self.image_url = Some(dest_url.to_string());
                let muted = self.muted();
                self.push_span(Span::styled("[image: ", muted));
                self.push_style(muted);
            }
            _ => {}
        }
    }

    fn close(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.needs_newline = true,
            TagEnd::Heading(level) => {
                if level == HeadingLevel::H1 {
                    let hs = self.style();
                    self.push_span(Span::styled(" ", hs));
                }
                self.pop_style();
                self.needs_newline = true;
            }
            TagEnd::BlockQuote(_) => {
                self.line_prefixes.pop();
                self.pop_style();
                self.needs_newline = true;
            }
            TagEnd::CodeBlock => {
                self.highlighter = None;
                self.in_plain_code = false;
                self.line_prefixes.pop();
                let bs = self.muted();
                self.push_line(Line::from(Span::styled("╰──", bs)));
                self.needs_newline = true;
            }
            TagEnd::List(_) => {
                self.list_indices.pop();
                self.needs_newline = true;
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    if let Some(row) = table.rows.last_mut() {
                        row.push(cell.trim().to_string());
                    }
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.header_rows = table.rows.len();
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.emit_table(table);
                }
                self.needs_newline = true;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.link_url.take() {
                    let muted = self.muted();
                    self.push_span(Span::styled(format!(" ({url})"), muted));
                }
            }
            TagEnd::Image => {
                self.pop_style();
                let muted = self.muted();
                let url = self.image_url.take().unwrap_or_default();
                self.push_span(Span::styled(format!("]({url})"), muted));
            }
            _ => {}
        }
    }

    fn text(&mut self, cow: CowStr<'_>) {
        // ratatui renders \t as zero-width
        let text = cow.replace('\t', "    ");

        if let Some(mut hl) = self.highlighter.take() {
            for line in LinesWithEndings::from(text.as_str()) {
                let Ok(ranges) = hl.highlight_line(line, &SYNTAX_SET) else {
                    continue;
                };
                let spans: Vec<Span<'static>> = ranges
                    .into_iter()
                    .filter_map(|(hl_style, frag)| {
                        let content = frag.trim_end_matches('\n').to_string();
                        if content.is_empty() {
                            return None;
                        }
                        let fg = Color::Rgb(
                            hl_style.foreground.r,
                            hl_style.foreground.g,
                            hl_style.foreground.b,
                        );
                        Some(Span::styled(content, Style::default().fg(fg)))
                    })
                    .collect();
                self.push_line(Line::from(spans));
            }
            self.highlighter = Some(hl);
            return;
        }

        if self.in_plain_code {
            let code_style = Palette::fg(self.palette.code_fg);
            for line in text.lines() {
                self.push_line(Line::from(Span::styled(line.to_owned(), code_style)));
            }
            return;
        }

        let style = self.style();
        self.push_span(Span::styled(text, style));
    }

    fn inline_code(&mut self, cow: CowStr<'_>) {
        let mut style = Palette::fg(self.palette.code_fg);
        if let Some(bg) = self.palette.code_bg {
            style = style.bg(bg);
        }
        self.push_span(Span::styled(cow.to_string(), style));
    }

    fn heading_style(&self, level: HeadingLevel) -> Style {
        let base = Palette::fg(self.palette.heading).add_modifier(Modifier::BOLD);
        match level {
            HeadingLevel::H1 => match self.palette.heading {
                Some(color) => Style::default()
                    .fg(Color::Black)
                    .bg(color)
                    .add_modifier(Modifier::BOLD),
                None => base.add_modifier(Modifier::REVERSED),
            },
            HeadingLevel::H2 => base,
            _ => base.add_modifier(Modifier::ITALIC),
        }
    }

    fn emit_table(&mut self, table: Table) {
        let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for row in &table.rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }

        let border = self.muted();
        let text = self.style();
        for (r, row) in table.rows.iter().enumerate() {
            let cell_style = if r < table.header_rows {
                text.add_modifier(Modifier::BOLD)
            } else {
                text
            };
            let mut spans = Vec::with_capacity(columns * 2);
            for (i, width) in widths.iter().enumerate() {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                let pad = width.saturating_sub(cell.width());
                if i > 0 {
                    spans.push(Span::styled(" │ ", border));
                }
                spans.push(Span::styled(format!("{cell}{}", " ".repeat(pad)), cell_style));
            }
            self.push_line(Line::from(spans));

            if r + 1 == table.header_rows {
                let rule = widths
                    .iter()
                    .map(|w| "─".repeat(*w))
                    .collect::<Vec<_>>()
                    .join("─┼─");
                self.push_line(Line::from(Span::styled(rule, border)));
            }
        }
    }
}

fn heading_depth(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
