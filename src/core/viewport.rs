//! # Viewport
//!
//! A scrollable window over a sequence of already-rendered lines.
//!
//! ```text
//!   lines[0]
//!   lines[1]
//!   ┌──────────────┐  ← y_offset
//!   │ lines[2]     │
//!   │ lines[3]     │  height rows
//!   │ lines[4]     │
//!   └──────────────┘
//!   lines[5]
//! ```
//!
//! `y_offset` is clamped to `0..=max_y_offset()` after every mutation, so
//! callers never have to re-validate it.

use ratatui::text::Line;

#[derive(Debug, Clone)]
pub struct Viewport<L = Line<'static>> {
    width: u16,
    height: u16,
    y_offset: usize,
    lines: Vec<L>,
}

impl<L: Clone + Default> Default for Viewport<L> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl<L: Clone + Default> Viewport<L> {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            y_offset: 0,
            lines: Vec::new(),
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn y_offset(&self) -> usize {
        self.y_offset
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Replace the content and clamp the offset into the new range.
    pub fn set_content(&mut self, lines: Vec<L>) {
        self.lines = lines;
        self.clamp();
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.clamp();
    }

    /// Largest valid `y_offset`: zero when everything fits.
    pub fn max_y_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height as usize)
    }

    pub fn set_y_offset(&mut self, offset: usize) {
        self.y_offset = offset.min(self.max_y_offset());
    }

    pub fn scroll_to_top(&mut self) {
        self.y_offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.y_offset = self.max_y_offset();
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.set_y_offset(self.y_offset.saturating_add(n));
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.y_offset = self.y_offset.saturating_sub(n);
    }

    pub fn page_down(&mut self) {
        self.scroll_down((self.height as usize).max(1));
    }

    pub fn page_up(&mut self) {
        self.scroll_up((self.height as usize).max(1));
    }

    pub fn at_top(&self) -> bool {
        self.y_offset == 0
    }

    pub fn at_bottom(&self) -> bool {
        self.y_offset >= self.max_y_offset()
    }

    /// Fraction of the scrollable range above the window, in `[0, 1]`.
    ///
    /// Exactly `0.0` when the content fits without overflow.
    pub fn scroll_percent(&self) -> f64 {
        let total = self.lines.len();
        let height = self.height as usize;
        if total <= height {
            return 0.0;
        }
        let range = (total - height).max(1) as f64;
        (self.y_offset as f64 / range).clamp(0.0, 1.0)
    }

    /// Exactly `height` lines starting at `y_offset`, padded with empty lines.
    pub fn visible_lines(&self) -> Vec<L> {
        let height = self.height as usize;
        let mut visible: Vec<L> = self
            .lines
            .iter()
            .skip(self.y_offset)
            .take(height)
            .cloned()
            .collect();
        visible.resize_with(height, L::default);
        visible
    }

    fn clamp(&mut self) {
        self.y_offset = self.y_offset.min(self.max_y_offset());
    }
}
