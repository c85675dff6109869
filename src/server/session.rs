//! # Session Supervisor
//!
//! Drives one connection from handshake to close:
//!
//! ```text
//! pty? ─no─► fatal "no active terminal, skipping"
//!  │
//! list documents ─err─► fatal "can't read directory: ..."
//!  │
//! banner ─err─► fatal "failed to generate banner: ..."
//!  │
//! initial Resize ─► event loop ─► close
//! ```
//!
//! The loop handles one event at a time: map it to an action, run
//! `update()`, and paint a frame when the effect asks for one. It ends on
//! Quit, disconnect, a failed write, or a server shutdown signal. `close()`
//! runs on every path that got past the checks and on every rejection.
//!
//! Listing the shelf and opening a document touch the filesystem and run the
//! markdown renderer, so both happen on tokio's blocking pool. Everything
//! else in `update()` is cheap and runs inline.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::broadcast;
use tokio::task;

use crate::core::action::{Action, Effect, update};
use crate::core::state::{SessionState, TerminalSize, ViewState};
use crate::server::shutdown::ShutdownSignal;
use crate::server::{Connection, SessionContext};
use crate::tui::compose::compose;

pub const NO_PTY_MESSAGE: &str = "no active terminal, skipping";

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// A setup check failed and the client got a fatal message.
    Rejected,
    Quit,
    Disconnected,
    /// Painting a frame failed; the client is most likely gone.
    TransportError,
    Shutdown,
    /// A blocking load panicked; the session state went with it.
    Failed,
}

pub async fn on_connect<C: Connection>(
    conn: &mut C,
    ctx: &Arc<SessionContext>,
    mut shutdown: broadcast::Receiver<ShutdownSignal>,
) -> SessionEnd {
    let id = conn.session_id();

    let Some((width, height)) = conn.pty() else {
        info!("[{id}] Rejected: no pty requested");
        return reject(conn, NO_PTY_MESSAGE).await;
    };

    let listing = {
        let ctx = ctx.clone();
        task::spawn_blocking(move || ctx.source.list_documents()).await
    };
    let documents = match listing {
        Ok(Ok(documents)) => documents,
        Ok(Err(e)) => {
            warn!("[{id}] Rejected: can't read directory: {e}");
            return reject(conn, &format!("can't read directory: {e}")).await;
        }
        Err(e) => {
            warn!("[{id}] Rejected: listing task failed: {e}");
            return reject(conn, &format!("can't read directory: {e}")).await;
        }
    };

    let banner = match &ctx.banner {
        Ok(banner) => banner,
        Err(e) => {
            warn!("[{id}] Rejected: failed to generate banner: {e}");
            return reject(conn, &format!("failed to generate banner: {e}")).await;
        }
    };

    debug!("[{id}] Session start: {} document(s), {width}x{height}", documents.len());
    let deps = ctx.deps();
    let ui = ctx.ui(banner);
    let mut state = SessionState::new(documents, TerminalSize::new(width, height));

    let mut pending = Some(Action::Resize { width, height });
    let end = loop {
        let action = match pending.take() {
            Some(action) => action,
            None => {
                let event = tokio::select! {
                    event = conn.next_event() => event,
                    signal = shutdown.recv() => {
                        debug!("[{id}] Shutdown signal: {signal:?}");
                        break SessionEnd::Shutdown;
                    }
                };
                let Some(event) = event else {
                    break SessionEnd::Disconnected;
                };
                match ctx.keymap.action_for(state.view, &event) {
                    Some(action) => action,
                    None => continue,
                }
            }
        };

        let effect = if action == Action::Enter && state.view == ViewState::List {
            match load_off_worker(state, action, ctx).await {
                Ok((next, effect)) => {
                    state = next;
                    effect
                }
                Err(e) => {
                    warn!("[{id}] Document load failed: {e}");
                    break SessionEnd::Failed;
                }
            }
        } else {
            update(&mut state, action, &deps)
        };

        match effect {
            Effect::None => {}
            Effect::Render => {
                if let Err(e) = conn.draw(compose(&state, &ui)).await {
                    debug!("[{id}] Write failed, ending session: {e}");
                    break SessionEnd::TransportError;
                }
            }
            Effect::Quit => break SessionEnd::Quit,
        }
    };

    conn.close().await;
    debug!("[{id}] Session end: {end:?}");
    end
}

/// Run one `update()` on the blocking pool, handing the state over and back.
async fn load_off_worker(
    mut state: SessionState,
    action: Action,
    ctx: &Arc<SessionContext>,
) -> Result<(SessionState, Effect), task::JoinError> {
    let ctx = ctx.clone();
    task::spawn_blocking(move || {
        let effect = update(&mut state, action, &ctx.deps());
        (state, effect)
    })
    .await
}

async fn reject<C: Connection>(conn: &mut C, message: &str) -> SessionEnd {
    conn.fatal(message).await;
    conn.close().await;
    SessionEnd::Rejected
}
