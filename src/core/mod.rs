//! # Core Session Logic
//!
//! Everything a single browsing session knows and does, with no knowledge
//! of SSH or of how frames reach the screen.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • State (per session)  │
//!                    │  • Action (events)      │
//!                    │  • update() (reducer)   │
//!                    │  • Viewport (scrolling) │
//!                    └───────────┬─────────────┘
//!                                │
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │    TUI     │      │  Server    │      │  Library   │
//!     │  (frames,  │      │  (russh,   │      │ (document  │
//!     │   keys)    │      │  sessions) │      │  storage)  │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`state`]: `SessionState`, one per connection
//! - [`action`]: the `Action` enum and the `update()` reducer
//! - [`viewport`]: scroll window over rendered lines
//! - [`content`]: read, strip, render and wrap a selected document
//! - [`library`]: the `DocumentSource` boundary and its directory implementation
//! - [`config`]: layered configuration

pub mod action;
pub mod config;
pub mod content;
pub mod library;
pub mod state;
pub mod viewport;
