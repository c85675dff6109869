//! # Server
//!
//! Everything between a TCP socket and a running session.
//!
//! - [`ssh`]: russh handler, host key, accept loop, remote painting
//! - [`session`]: per-connection setup checks and the event loop
//! - [`shutdown`]: signal handling and bounded drain
//!
//! The session loop only sees the [`Connection`] trait, so it runs the same
//! against a real SSH channel and against the scripted fakes in tests.

pub mod session;
pub mod shutdown;
pub mod ssh;

use std::fmt;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use crossterm::event::Event;
use ratatui::text::Text;
use uuid::Uuid;

use crate::core::action::Deps;
use crate::core::content::ContentRenderer;
use crate::core::library::DocumentSource;
use crate::tui::banner::{Banner, BannerError};
use crate::tui::compose::Ui;
use crate::tui::keymap::KeyMap;
use crate::tui::theme::Theme;

/// One interactive client, as the session loop sees it.
#[async_trait]
pub trait Connection: Send {
    /// Identifier used in log lines for this connection.
    fn session_id(&self) -> Uuid;

    /// Initial `(width, height)` if the client requested a pty.
    fn pty(&self) -> Option<(u16, u16)>;

    /// Next decoded input or resize event. `None` once the client is gone.
    async fn next_event(&mut self) -> Option<Event>;

    /// Paint a full frame.
    async fn draw(&mut self, frame: Text<'static>) -> io::Result<()>;

    /// Show a message and refuse the session.
    async fn fatal(&mut self, message: &str);

    /// Restore the remote terminal and close the channel.
    async fn close(&mut self);
}

/// Process-wide, read-only state shared by every session.
pub struct SessionContext {
    pub source: Arc<dyn DocumentSource>,
    pub renderer: Arc<dyn ContentRenderer>,
    pub theme: Theme,
    pub keymap: KeyMap,
    /// Generated once at startup. An error here means art is required and
    /// could not be produced, so every session is refused.
    pub banner: Result<Banner, BannerError>,
    pub title: String,
    pub intro: String,
    pub markdown_theme: String,
    pub header_lines: usize,
}

impl SessionContext {
    pub fn deps(&self) -> Deps<'_> {
        Deps {
            source: self.source.as_ref(),
            renderer: self.renderer.as_ref(),
            theme: &self.markdown_theme,
            header_lines: self.header_lines,
        }
    }

    pub fn ui<'a>(&'a self, banner: &'a Banner) -> Ui<'a> {
        Ui {
            theme: &self.theme,
            keymap: &self.keymap,
            banner,
            title: &self.title,
            intro: &self.intro,
        }
    }
}

#[derive(Debug)]
pub enum ServerError {
    Io(io::Error),
    Ssh(russh::Error),
    HostKey(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Io(e) => write!(f, "I/O error: {e}"),
            ServerError::Ssh(e) => write!(f, "SSH error: {e}"),
            ServerError::HostKey(msg) => write!(f, "host key error: {msg}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<io::Error> for ServerError {
    fn from(e: io::Error) -> Self {
        ServerError::Io(e)
    }
}

impl From<russh::Error> for ServerError {
    fn from(e: russh::Error) -> Self {
        ServerError::Ssh(e)
    }
}
