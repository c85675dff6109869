//! # Document Content
//!
//! Turns a selected document into the lines the viewport scrolls over:
//! read raw bytes, drop the metadata block, render markdown, wrap to width.
//! Read and render failures are replaced by placeholder text here so the
//! session never sees them as errors.

use log::warn;
use ratatui::text::{Line, Span, Text};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::core::library::DocumentSource;

pub const READ_ERROR_PLACEHOLDER: &str = "Error reading file";
pub const RENDER_ERROR_PLACEHOLDER: &str = "Error parsing markdown";

/// Markdown renderer boundary: `render(text, theme) -> styled text | error`.
pub trait ContentRenderer: Send + Sync {
    fn render(&self, markdown: &str, theme: &str) -> Result<Text<'static>, RenderFailure>;
}

pub type RenderFailure = Box<dyn std::error::Error + Send + Sync>;

/// Result of loading one selection: what was read and what will be shown.
pub struct LoadedContent {
    pub raw: String,
    pub rendered: Text<'static>,
}

/// Read, strip and render a document, degrading to placeholders on failure.
pub fn load(
    source: &dyn DocumentSource,
    renderer: &dyn ContentRenderer,
    name: &str,
    header_lines: usize,
    theme: &str,
) -> LoadedContent {
    let raw = match source.read_document(name) {
        Ok(bytes) => strip_metadata(&String::from_utf8_lossy(&bytes), header_lines),
        Err(e) => {
            warn!("Failed to read document {name}: {e}");
            return LoadedContent {
                raw: READ_ERROR_PLACEHOLDER.to_string(),
                rendered: Text::raw(READ_ERROR_PLACEHOLDER),
            };
        }
    };

    let rendered = match renderer.render(&raw, theme) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to render document {name}: {e}");
            Text::raw(RENDER_ERROR_PLACEHOLDER)
        }
    };

    LoadedContent { raw, rendered }
}

/// Drop the first `header_lines` lines (the metadata block).
pub fn strip_metadata(content: &str, header_lines: usize) -> String {
    content
        .split('\n')
        .skip(header_lines)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Hard-wrap styled lines so none is wider than `width` display columns.
///
/// Splits between grapheme clusters, never inside a wide glyph. A zero width
/// leaves the lines untouched.
pub fn wrap(text: &Text<'static>, width: u16) -> Vec<Line<'static>> {
    let width = width as usize;
    if width == 0 {
        return text.lines.clone();
    }

    let mut out = Vec::with_capacity(text.lines.len());
    for line in &text.lines {
        if line.width() <= width {
            out.push(line.clone());
            continue;
        }

        let mut current = Line::default().style(line.style);
        let mut used = 0usize;
        for span in &line.spans {
            let mut chunk = String::new();
            for grapheme in span.content.graphemes(true) {
                let kept = chunk.len();
                chunk.push_str(grapheme);
                // Measured as a whole, like ratatui measures the span.
                if used + chunk.width() > width && (used > 0 || kept > 0) {
                    chunk.truncate(kept);
                    if !chunk.is_empty() {
                        current.push_span(Span::styled(std::mem::take(&mut chunk), span.style));
                    }
                    out.push(std::mem::replace(
                        &mut current,
                        Line::default().style(line.style),
                    ));
                    used = 0;
                    chunk.push_str(grapheme);
                }
            }
            if !chunk.is_empty() {
                used += chunk.width();
                current.push_span(Span::styled(chunk, span.style));
            }
        }
        out.push(current);
    }
    out
}
