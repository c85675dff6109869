//! # Session State
//!
//! Everything one connection knows about itself. Owned by exactly one
//! session event loop; nothing here is shared between sessions.
//!
//! ```text
//! SessionState
//! ├── documents: Vec<Document>   // listing fetched at session start
//! ├── cursor: usize              // index into documents
//! ├── view: ViewState            // List | Content
//! ├── selected: Option<Document> // set on entering Content
//! ├── raw_content: String        // cached per selection
//! ├── rendered: Text<'static>    // cached per selection
//! ├── viewport: Viewport         // scroll window over wrapped content
//! ├── terminal: TerminalSize     // last reported geometry
//! └── ready: bool                // true after the first resize
//! ```
//!
//! State changes only happen through `update(state, action)` in action.rs.

use ratatui::text::Text;

use crate::core::content;
use crate::core::library::Document;
use crate::core::viewport::Viewport;

/// Which screen the session is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    List,
    Content,
}

impl ViewState {
    /// Rows reserved above the viewport in this view.
    pub fn header_rows(self) -> u16 {
        match self {
            ViewState::List => 0,
            ViewState::Content => 1,
        }
    }

    /// Rows reserved below the viewport in this view.
    pub fn footer_rows(self) -> u16 {
        match self {
            ViewState::List => 0,
            ViewState::Content => 2,
        }
    }
}

/// Largest geometry a client may report. Frames and the remote terminal's
/// cell buffers are sized from this, so it bounds per-session memory.
pub const MAX_COLUMNS: u16 = 1000;
pub const MAX_ROWS: u16 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TerminalSize {
    pub width: u16,
    pub height: u16,
}

impl TerminalSize {
    /// Dimensions past `MAX_COLUMNS` x `MAX_ROWS` are clamped.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width: width.min(MAX_COLUMNS),
            height: height.min(MAX_ROWS),
        }
    }

    /// Geometry from a pty or window-change request, which carry `u32`s.
    pub fn from_pty(columns: u32, rows: u32) -> Self {
        let clamp = |value: u32, max: u16| u16::try_from(value).map_or(max, |v| v.min(max));
        Self {
            width: clamp(columns, MAX_COLUMNS),
            height: clamp(rows, MAX_ROWS),
        }
    }
}

pub struct SessionState {
    pub documents: Vec<Document>,
    pub cursor: usize,
    pub view: ViewState,
    pub selected: Option<Document>,
    pub raw_content: String,
    pub rendered: Text<'static>,
    pub viewport: Viewport,
    pub terminal: TerminalSize,
    pub ready: bool,
}

impl SessionState {
    pub fn new(documents: Vec<Document>, terminal: TerminalSize) -> Self {
        Self {
            documents,
            cursor: 0,
            view: ViewState::List,
            selected: None,
            raw_content: String::new(),
            rendered: Text::default(),
            viewport: Viewport::default(),
            terminal,
            ready: false,
        }
    }

    /// The document under the cursor, if the cursor indexes a real entry.
    pub fn document_at_cursor(&self) -> Option<&Document> {
        self.documents.get(self.cursor)
    }

    /// Fit the viewport to the terminal minus the current view's chrome and
    /// re-wrap the cached content to the new width.
    pub fn layout(&mut self) {
        let chrome = self.view.header_rows() + self.view.footer_rows();
        let height = self.terminal.height.saturating_sub(chrome);
        let width = self.terminal.width;
        self.viewport.resize(width, height);
        self.viewport.set_content(content::wrap(&self.rendered, width));
    }
}
