//! # SSH Transport
//!
//! russh glue: one `SshHandler` per TCP connection, one session task per
//! interactive shell channel.
//!
//! ```text
//! client ──bytes──► SshHandler::data ──► InputDecoder ──► mpsc ──► SshConnection::next_event
//! client ◄─frames── writer task ◄── mpsc ◄── ChannelWriter ◄── ratatui Terminal ◄── draw
//! ```
//!
//! Frames are painted by a ratatui `Terminal` whose backend writes into a
//! `ChannelWriter`. The terminal uses a fixed viewport because the size of
//! the remote pty only ever comes from pty and window-change requests.
//! Every connection is accepted regardless of user or credentials.

use std::fmt;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use crossterm::cursor::{Hide, Show};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use log::{debug, info, warn};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::text::Text;
use ratatui::widgets::Paragraph;
use ratatui::{Terminal, TerminalOptions, Viewport};
use russh::server::{Auth, Config, Handle, Handler, Msg, Session};
use russh::{Channel, ChannelId, CryptoVec, Pty};
use russh_keys::key::{KeyPair, PublicKey};
use tokio::net::TcpListener;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::state::TerminalSize;
use crate::server::session::on_connect;
use crate::server::shutdown::ShutdownCoordinator;
use crate::server::{Connection, ServerError, SessionContext};
use crate::tui::input::InputDecoder;

// ============================================================================
// Host key and server config
// ============================================================================

/// Load the host key, creating it with `ssh-keygen` on first run.
pub async fn load_or_generate_host_key(path: &Path) -> Result<KeyPair, ServerError> {
    if !path.exists() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        info!("Generating host key at {}", path.display());
        let output = Command::new("ssh-keygen")
            .args(["-q", "-t", "ed25519", "-N", "", "-f"])
            .arg(path)
            .output()
            .await
            .map_err(|e| ServerError::HostKey(format!("could not run ssh-keygen: {e}")))?;
        if !output.status.success() {
            return Err(ServerError::HostKey(format!(
                "ssh-keygen failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
    }

    russh_keys::load_secret_key(path, None)
        .map_err(|e| ServerError::HostKey(format!("{}: {e}", path.display())))
}

pub fn ssh_config(host_key: KeyPair) -> Arc<Config> {
    Arc::new(Config {
        inactivity_timeout: Some(Duration::from_secs(3600)),
        auth_rejection_time: Duration::from_secs(1),
        auth_rejection_time_initial: Some(Duration::from_secs(0)),
        keys: vec![host_key],
        ..Default::default()
    })
}

// ============================================================================
// Accept loop
// ============================================================================

/// Accept connections until the coordinator broadcasts shutdown.
pub async fn serve(
    listener: TcpListener,
    config: Arc<Config>,
    ctx: Arc<SessionContext>,
    coordinator: Arc<ShutdownCoordinator>,
) {
    let mut shutdown = coordinator.subscribe();
    loop {
        let (socket, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Accept failed: {e}");
                    continue;
                }
            },
            _ = shutdown.recv() => {
                info!("No longer accepting connections");
                break;
            }
        };

        let handler = SshHandler::new(ctx.clone(), coordinator.clone(), peer);
        let config = config.clone();
        tokio::spawn(async move {
            match russh::server::run_stream(config, socket, handler).await {
                Ok(running) => {
                    if let Err(e) = running.await {
                        debug!("Connection from {peer} ended with error: {e}");
                    }
                }
                Err(e) => debug!("Handshake with {peer} failed: {e}"),
            }
        });
    }
}

// ============================================================================
// Handler
// ============================================================================

/// Per-connection protocol state. Dropped when the TCP connection ends,
/// which is where the connection's close line is logged.
pub struct SshHandler {
    id: Uuid,
    ctx: Arc<SessionContext>,
    coordinator: Arc<ShutdownCoordinator>,
    peer: SocketAddr,
    user: String,
    opened: Instant,
    channel: Option<ChannelId>,
    term: String,
    pty: Option<(u16, u16)>,
    decoder: InputDecoder,
    input: Option<mpsc::UnboundedSender<Event>>,
}

impl SshHandler {
    pub fn new(
        ctx: Arc<SessionContext>,
        coordinator: Arc<ShutdownCoordinator>,
        peer: SocketAddr,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ctx,
            coordinator,
            peer,
            user: String::new(),
            opened: Instant::now(),
            channel: None,
            term: String::new(),
            pty: None,
            decoder: InputDecoder::new(),
            input: None,
        }
    }

    fn accept(&mut self, user: &str, method: &str) -> Auth {
        self.user = user.to_string();
        debug!("[{}] Accepted {user} from {} via {method}", self.id, self.peer);
        Auth::Accept
    }

    fn is_ours(&self, channel: ChannelId) -> bool {
        self.channel == Some(channel)
    }

    fn send_input(&self, event: Event) {
        if let Some(input) = &self.input {
            if input.send(event).is_err() {
                debug!("[{}] Input after session ended, dropped", self.id);
            }
        }
    }
}

impl Drop for SshHandler {
    fn drop(&mut self) {
        info!(
            "[{}] Connection closed: user={} peer={} duration={:.1?}",
            self.id,
            self.user,
            self.peer,
            self.opened.elapsed()
        );
    }
}

/// Client-reported pty geometry, clamped before anything is sized from it.
fn pty_size(col_width: u32, row_height: u32) -> (u16, u16) {
    let size = TerminalSize::from_pty(col_width, row_height);
    (size.width, size.height)
}

#[async_trait]
impl Handler for SshHandler {
    type Error = ServerError;

    async fn auth_none(&mut self, user: &str) -> Result<Auth, Self::Error> {
        Ok(self.accept(user, "none"))
    }

    async fn auth_publickey(
        &mut self,
        user: &str,
        _public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        Ok(self.accept(user, "publickey"))
    }

    async fn auth_password(&mut self, user: &str, _password: &str) -> Result<Auth, Self::Error> {
        Ok(self.accept(user, "password"))
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut Session,
    ) -> Result<bool, Self::Error> {
        // One interactive session per connection.
        if self.channel.is_some() {
            return Ok(false);
        }
        self.channel = Some(channel.id());
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    async fn pty_request(
        &mut self,
        channel: ChannelId,
        term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if self.is_ours(channel) {
            self.term = term.to_string();
            self.pty = Some(pty_size(col_width, row_height));
            session.channel_success(channel);
        } else {
            session.channel_failure(channel);
        }
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if self.is_ours(channel) {
            let (width, height) = pty_size(col_width, row_height);
            self.pty = Some((width, height));
            self.send_input(Event::Resize(width, height));
        }
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if !self.is_ours(channel) || self.input.is_some() {
            session.channel_failure(channel);
            return Ok(());
        }
        session.channel_success(channel);

        match self.pty {
            Some((w, h)) => info!(
                "[{}] Connection opened: user={} peer={} term={} size={w}x{h}",
                self.id, self.user, self.peer, self.term
            ),
            None => info!(
                "[{}] Connection opened: user={} peer={} (no pty)",
                self.id, self.user, self.peer
            ),
        }

        let (input_tx, input_rx) = mpsc::unbounded_channel();
        self.input = Some(input_tx);

        let mut conn = SshConnection::new(self.id, self.pty, input_rx, session.handle(), channel);
        let ctx = self.ctx.clone();
        let shutdown = self.coordinator.subscribe();
        let task = tokio::spawn(async move {
            on_connect(&mut conn, &ctx, shutdown).await;
        });
        if !self.coordinator.register_task(task).await {
            info!("[{}] Server shutting down, session aborted", self.id);
        }
        Ok(())
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if self.is_ours(channel) {
            for event in self.decoder.feed(data) {
                self.send_input(event);
            }
        }
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if self.is_ours(channel) {
            self.input = None;
        }
        Ok(())
    }

    async fn channel_close(
        &mut self,
        channel: ChannelId,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if self.is_ours(channel) {
            self.input = None;
        }
        Ok(())
    }
}

// ============================================================================
// Remote painting
// ============================================================================

/// `io::Write` sink for the ratatui backend. Bytes are buffered until
/// `flush`, then handed to the channel's writer task as one message.
pub struct ChannelWriter {
    buf: Vec<u8>,
    out: mpsc::UnboundedSender<Vec<u8>>,
}

impl ChannelWriter {
    pub fn new(out: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self { buf: Vec::new(), out }
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.out
            .send(std::mem::take(&mut self.buf))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "session channel closed"))
    }
}

type RemoteTerminal = Terminal<CrosstermBackend<ChannelWriter>>;

/// A shell channel as the session loop sees it.
pub struct SshConnection {
    id: Uuid,
    pty: Option<(u16, u16)>,
    size: Rect,
    events: mpsc::UnboundedReceiver<Event>,
    terminal: Option<RemoteTerminal>,
    out: Option<mpsc::UnboundedSender<Vec<u8>>>,
    writer: Option<JoinHandle<()>>,
    handle: Handle,
    channel: ChannelId,
    exit_status: u32,
}

impl SshConnection {
    fn new(
        id: Uuid,
        pty: Option<(u16, u16)>,
        events: mpsc::UnboundedReceiver<Event>,
        handle: Handle,
        channel: ChannelId,
    ) -> Self {
        let (out, mut frames) = mpsc::unbounded_channel::<Vec<u8>>();
        let writer_handle = handle.clone();
        let writer = tokio::spawn(async move {
            while let Some(bytes) = frames.recv().await {
                if writer_handle.data(channel, CryptoVec::from(bytes)).await.is_err() {
                    break;
                }
            }
        });

        let size = pty.map_or_else(TerminalSize::default, |(w, h)| TerminalSize::new(w, h));
        Self {
            id,
            pty,
            size: Rect::new(0, 0, size.width, size.height),
            events,
            terminal: None,
            out: Some(out),
            writer: Some(writer),
            handle,
            channel,
            exit_status: 0,
        }
    }

    /// Create the remote terminal on first use: alternate screen, hidden
    /// cursor, mouse reporting.
    fn terminal(&mut self) -> io::Result<&mut RemoteTerminal> {
        if self.terminal.is_none() {
            let out = self
                .out
                .clone()
                .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "connection closed"))?;
            let mut backend = CrosstermBackend::new(ChannelWriter::new(out));
            execute!(backend, EnterAlternateScreen, Hide, EnableMouseCapture)?;
            let options = TerminalOptions {
                viewport: Viewport::Fixed(self.size),
            };
            self.terminal = Some(Terminal::with_options(backend, options)?);
        }
        self.terminal
            .as_mut()
            .ok_or_else(|| io::Error::other("terminal unavailable"))
    }

    fn resize(&mut self, width: u16, height: u16) {
        let size = TerminalSize::new(width, height);
        self.size = Rect::new(0, 0, size.width, size.height);
        if let Some(terminal) = self.terminal.as_mut() {
            if let Err(e) = terminal.resize(self.size) {
                debug!("[{}] Resize failed: {e}", self.id);
            }
        }
    }

    async fn write_stderr(&self, message: &str) {
        let bytes = CryptoVec::from(format!("{message}\r\n").into_bytes());
        if self.handle.extended_data(self.channel, 1, bytes).await.is_err() {
            debug!("[{}] Could not deliver message to client", self.id);
        }
    }
}

/// Log a failed teardown step. The client is usually already gone, so
/// failures only end up in the debug log. Returns whether the step succeeded.
fn teardown_step<E: fmt::Debug>(id: Uuid, what: &str, result: Result<(), E>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!("[{id}] Could not {what}: {e:?}");
            false
        }
    }
}

#[async_trait]
impl Connection for SshConnection {
    fn session_id(&self) -> Uuid {
        self.id
    }

    fn pty(&self) -> Option<(u16, u16)> {
        self.pty
    }

    async fn next_event(&mut self) -> Option<Event> {
        let event = self.events.recv().await?;
        if let Event::Resize(width, height) = event {
            self.resize(width, height);
        }
        Some(event)
    }

    async fn draw(&mut self, frame: Text<'static>) -> io::Result<()> {
        let terminal = self.terminal()?;
        terminal.draw(|f| f.render_widget(Paragraph::new(frame), f.area()))?;
        Ok(())
    }

    async fn fatal(&mut self, message: &str) {
        self.write_stderr(message).await;
        self.exit_status = 1;
    }

    async fn close(&mut self) {
        if let Some(mut terminal) = self.terminal.take() {
            let restored = execute!(
                terminal.backend_mut(),
                DisableMouseCapture,
                Show,
                LeaveAlternateScreen
            );
            if let Err(e) = restored {
                debug!("[{}] Could not restore remote terminal: {e}", self.id);
            }
        }
        // Let queued frames reach the client before the channel closes.
        self.out = None;
        let id = self.id;
        if let Some(writer) = self.writer.take() {
            teardown_step(id, "drain frame writer", writer.await);
        }

        let status = self.exit_status;
        teardown_step(
            id,
            "send exit status",
            self.handle.exit_status_request(self.channel, status).await,
        );
        teardown_step(id, "send eof", self.handle.eof(self.channel).await);
        teardown_step(id, "close channel", self.handle.close(self.channel).await);
    }
}
