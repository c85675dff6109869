//! # TUI Adapter
//!
//! The ratatui-specific layer. Turns raw terminal input into core::Action
//! values and session state into styled frames.
//!
//! Nothing here touches a real terminal. Frames are plain `Text` values that
//! the server layer paints onto a remote pty, so every piece is testable
//! without a connection.
//!
//! ## Pipeline
//!
//! ```text
//! bytes ─► input::InputDecoder ─► Event ─► keymap::KeyMap ─► Action
//!                                                              │
//!                                                   core::action::update()
//!                                                              │
//! remote pty ◄── server ◄── compose::compose() ◄── SessionState
//! ```
//!
//! - [`input`]: raw bytes to crossterm events
//! - [`keymap`]: configurable chords, view-gated dispatch and help text
//! - [`compose`]: list and content frames
//! - [`markdown`]: pulldown-cmark + syntect renderer
//! - [`ansi`]: escape-coded tool output to styled text
//! - [`banner`]: catimg / qrencode art
//! - [`theme`]: shared styles

pub mod ansi;
pub mod banner;
pub mod compose;
pub mod input;
pub mod keymap;
pub mod markdown;
pub mod theme;
