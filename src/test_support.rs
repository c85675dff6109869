//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use async_trait::async_trait;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use ratatui::text::Text;
use uuid::Uuid;

use crate::core::content::{ContentRenderer, RenderFailure};
use crate::core::library::{Document, DocumentSource, SourceError};
use crate::server::Connection;
use crate::server::SessionContext;
use crate::tui::banner::Banner;
use crate::tui::keymap::KeyMap;
use crate::tui::theme::Theme;

/// In-memory document source. Bodies default to `"<description>\n---\n# <name>"`.
pub struct StaticSource {
    documents: Vec<Document>,
    bodies: HashMap<String, String>,
    fail_list: bool,
    fail_reads: bool,
    accessed_from: Arc<Mutex<Vec<ThreadId>>>,
}

impl StaticSource {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            documents: entries
                .iter()
                .map(|(name, desc)| Document::new(*name, *desc))
                .collect(),
            bodies: HashMap::new(),
            fail_list: false,
            fail_reads: false,
            accessed_from: Arc::default(),
        }
    }

    /// Threads that listed or read documents, in call order.
    pub fn access_log(&self) -> Arc<Mutex<Vec<ThreadId>>> {
        self.accessed_from.clone()
    }

    fn record_access(&self) {
        if let Ok(mut log) = self.accessed_from.lock() {
            log.push(thread::current().id());
        }
    }

    pub fn with_body(mut self, name: &str, body: &str) -> Self {
        self.bodies.insert(name.to_string(), body.to_string());
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }
}

impl DocumentSource for StaticSource {
    fn list_documents(&self) -> Result<Vec<Document>, SourceError> {
        self.record_access();
        if self.fail_list {
            return Err(SourceError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "permission denied",
            )));
        }
        Ok(self.documents.clone())
    }

    fn read_document(&self, name: &str) -> Result<Vec<u8>, SourceError> {
        self.record_access();
        if self.fail_reads {
            return Err(SourceError::Io(io::Error::other("simulated read failure")));
        }
        let doc = self
            .documents
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| SourceError::NotFound(name.to_string()))?;
        let body = self
            .bodies
            .get(name)
            .cloned()
            .unwrap_or_else(|| format!("{}\n---\n# {}", doc.description, doc.name));
        Ok(body.into_bytes())
    }
}

/// One unstyled line per input line.
pub struct PlainRenderer;

impl ContentRenderer for PlainRenderer {
    fn render(&self, markdown: &str, _theme: &str) -> Result<Text<'static>, RenderFailure> {
        Ok(Text::raw(markdown.to_string()))
    }
}

/// Always fails, like an unknown theme would.
pub struct FailingRenderer;

impl ContentRenderer for FailingRenderer {
    fn render(&self, _markdown: &str, _theme: &str) -> Result<Text<'static>, RenderFailure> {
        Err("renderer exploded".into())
    }
}

/// Session context with plain rendering and no banner art.
pub fn test_context(source: StaticSource) -> Arc<SessionContext> {
    Arc::new(SessionContext {
        source: Arc::new(source),
        renderer: Arc::new(PlainRenderer),
        theme: Theme::default(),
        keymap: KeyMap::default(),
        banner: Ok(Banner::default()),
        title: " DOCUMENTS ".to_string(),
        intro: "Pick a document.".to_string(),
        markdown_theme: "dark".to_string(),
        header_lines: 2,
    })
}

pub fn key(code: KeyCode) -> Event {
    Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

pub fn ctrl(c: char) -> Event {
    Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
}

/// A connection that replays scripted events and records every frame.
///
/// Once the script runs out, `next_event` reports a disconnect unless
/// `hold_open` was set, in which case it waits forever.
pub struct ScriptedConnection {
    pub id: Uuid,
    pub pty: Option<(u16, u16)>,
    pub events: VecDeque<Event>,
    pub frames: Vec<Text<'static>>,
    pub fatal: Option<String>,
    pub closed: bool,
    pub fail_draws: bool,
    pub hold_open: bool,
}

impl ScriptedConnection {
    pub fn new(width: u16, height: u16, events: Vec<Event>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pty: Some((width, height)),
            events: events.into(),
            frames: Vec::new(),
            fatal: None,
            closed: false,
            fail_draws: false,
            hold_open: false,
        }
    }

    pub fn without_pty() -> Self {
        Self {
            pty: None,
            ..Self::new(0, 0, vec![])
        }
    }

    /// Plain text of the last painted frame.
    pub fn last_frame(&self) -> String {
        self.frames
            .last()
            .map(|frame| {
                frame
                    .lines
                    .iter()
                    .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    fn session_id(&self) -> Uuid {
        self.id
    }

    fn pty(&self) -> Option<(u16, u16)> {
        self.pty
    }

    async fn next_event(&mut self) -> Option<Event> {
        match self.events.pop_front() {
            Some(event) => Some(event),
            None if self.hold_open => std::future::pending().await,
            None => None,
        }
    }

    async fn draw(&mut self, frame: Text<'static>) -> io::Result<()> {
        if self.fail_draws {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "channel closed"));
        }
        self.frames.push(frame);
        Ok(())
    }

    async fn fatal(&mut self, message: &str) {
        self.fatal = Some(message.to_string());
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}
