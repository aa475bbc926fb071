use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rconwire_frame::{
    check_payload, packet_type_name, Direction, Frame, FrameError, FrameWriter, StreamAssembler,
};
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthMachine, AuthOutcome, AuthStart, AuthState};
use crate::config::ClientConfig;
use crate::error::{ClientError, DisconnectReason, Result};
use crate::event::{ClientEvent, EventBus};
use crate::reassembly::{FragmentReassembler, Routed};
use crate::tracker::{RequestKind, RequestTracker};

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Lifecycle of the client's single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Authenticating,
    Authenticated,
    Closing,
}

impl ConnectionState {
    /// Whether the transport is up.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            ConnectionState::Connected
                | ConnectionState::Authenticating
                | ConnectionState::Authenticated
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Authenticated => "authenticated",
            ConnectionState::Closing => "closing",
        };
        f.write_str(s)
    }
}

type SharedWriter = Arc<tokio::sync::Mutex<FrameWriter<OwnedWriteHalf>>>;

/// The live half of a connection: present exactly while the transport is up.
struct Link {
    writer: SharedWriter,
    cancel: CancellationToken,
    peer: SocketAddr,
}

struct Session {
    state: ConnectionState,
    /// Bumped on every connect; work tagged with an older epoch is stale.
    epoch: u64,
    link: Option<Link>,
    auth: AuthMachine,
    tracker: RequestTracker,
    reassembler: FragmentReassembler,
    auto_reconnect: bool,
    reconnecting: bool,
    /// Reconnect attempts since the last successful handshake or
    /// caller-initiated connect.
    reconnect_attempts: u32,
}

/// State shared between the client handle, the read task, request timers
/// and the reconnect task.
pub(crate) struct Shared {
    pub(crate) config: ClientConfig,
    pub(crate) events: EventBus,
    session: Mutex<Session>,
    shutdown: CancellationToken,
}

impl Shared {
    pub(crate) fn new(config: ClientConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            events: EventBus::new(),
            session: Mutex::new(Session {
                state: ConnectionState::Disconnected,
                epoch: 0,
                link: None,
                auth: AuthMachine::new(),
                tracker: RequestTracker::new(),
                reassembler: FragmentReassembler::new(),
                auto_reconnect: false,
                reconnecting: false,
                reconnect_attempts: 0,
            }),
            shutdown: CancellationToken::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.lock().state
    }

    pub(crate) fn auth_state(&self) -> AuthState {
        self.lock().auth.state()
    }

    pub(crate) fn peer_addr(&self) -> Option<SocketAddr> {
        self.lock().link.as_ref().map(|link| link.peer)
    }

    /// Stop the read task and any reconnect loop. Used when the client handle
    /// is dropped.
    pub(crate) fn close(&self) {
        self.lock().auto_reconnect = false;
        self.shutdown.cancel();
    }

    fn dispatch(&self, epoch: u64, frame: Frame) {
        let mut session = self.lock();
        if session.epoch != epoch {
            return;
        }
        debug!(
            request_id = frame.request_id,
            packet_type = packet_type_name(frame.packet_type, Direction::ServerToClient),
            size = frame.payload.len(),
            "frame received"
        );

        match session.auth.on_frame(&frame) {
            AuthOutcome::Accepted(id) => {
                session.state = ConnectionState::Authenticated;
                session.reconnect_attempts = 0;
                session.tracker.resolve(id, String::new());
                info!(request_id = id, "authenticated");
                self.events.emit(ClientEvent::Authenticated);
                return;
            }
            AuthOutcome::Rejected(id) => {
                session.state = ConnectionState::Connected;
                session.tracker.reject(id, ClientError::AuthenticationFailed);
                self.events.emit(ClientEvent::AuthFailed {
                    reason: "server rejected the password".to_string(),
                });
                return;
            }
            AuthOutcome::Ignored => return,
            AuthOutcome::NotAuth => {}
        }

        match session.reassembler.accept(&frame) {
            Routed::Fragment { .. } => {}
            Routed::Complete {
                command_id,
                payload,
            } => {
                session.tracker.resolve(command_id, payload);
            }
            Routed::Unknown => warn!(
                request_id = frame.request_id,
                packet_type = packet_type_name(frame.packet_type, Direction::ServerToClient),
                "dropping frame for unknown request"
            ),
        }
    }

    fn expire(&self, epoch: u64, id: i32) {
        let mut session = self.lock();
        if session.epoch != epoch || !session.tracker.expire(id) {
            return;
        }
        warn!(request_id = id, timeout = ?self.config.timeout, "request timed out");
        session.reassembler.discard(id);
        if session.auth.expire(id) && session.state == ConnectionState::Authenticating {
            session.state = ConnectionState::Connected;
        }
    }
}

fn expiry(shared: &Arc<Shared>, epoch: u64, id: i32) -> impl FnOnce() + Send + 'static {
    let shared = Arc::downgrade(shared);
    move || {
        if let Some(shared) = shared.upgrade() {
            shared.expire(epoch, id);
        }
    }
}

/// Open the transport and start the read task.
pub(crate) async fn connect(shared: &Arc<Shared>) -> Result<()> {
    establish(shared, false).await
}

async fn establish(shared: &Arc<Shared>, reconnect: bool) -> Result<()> {
    let epoch = {
        let mut session = shared.lock();
        if session.state != ConnectionState::Disconnected {
            return Err(ClientError::AlreadyConnected);
        }
        session.epoch += 1;
        session.state = ConnectionState::Connecting;
        session.epoch
    };

    let config = &shared.config;
    let address = config.address();
    info!(%address, "connecting");

    let stream = match rconwire_transport::connect(&config.host, config.port, config.timeout).await
    {
        Ok(stream) => stream,
        Err(err) => {
            let mut session = shared.lock();
            if session.epoch == epoch {
                session.state = ConnectionState::Disconnected;
            }
            warn!(%address, error = %err, "connect failed");
            return Err(ClientError::ConnectionFailed(err));
        }
    };

    let peer = stream.peer_addr();
    let (reader, writer) = stream.into_split();
    let writer = Arc::new(tokio::sync::Mutex::new(FrameWriter::with_config(
        writer,
        config.frame_config(),
    )));

    let mut session = shared.lock();
    if session.epoch != epoch || session.state != ConnectionState::Connecting {
        debug!(%address, "connect abandoned by disconnect");
        return Err(ClientError::Disconnected(DisconnectReason::Requested));
    }

    let cancel = shared.shutdown.child_token();
    session.link = Some(Link {
        writer,
        cancel: cancel.clone(),
        peer,
    });
    session.state = ConnectionState::Connected;
    session.auth.reset();
    if reconnect {
        // From here on a teardown starts a fresh reconnect loop.
        session.reconnecting = false;
    } else {
        session.reconnect_attempts = 0;
    }
    if config.reconnect.enabled {
        session.auto_reconnect = true;
    }
    tokio::spawn(read_loop(Arc::clone(shared), epoch, reader, cancel));

    info!(%peer, "connection established");
    shared.events.emit(ClientEvent::Connected);
    Ok(())
}

/// Run the auth handshake on the current connection.
pub(crate) async fn authenticate(shared: &Arc<Shared>, password: &str) -> Result<()> {
    check_payload(password.as_bytes(), shared.config.max_payload_size)?;

    let (handle, writer, epoch) = {
        let mut guard = shared.lock();
        let session = &mut *guard;
        let writer = session.link.as_ref().map(|link| Arc::clone(&link.writer));
        if session.auth.check_start(writer.is_some())? == AuthStart::AlreadyAuthenticated {
            return Ok(());
        }
        let Some(writer) = writer else {
            return Err(ClientError::NotConnected);
        };

        let epoch = session.epoch;
        let id = session.tracker.next_id();
        let handle = session.tracker.register(
            id,
            RequestKind::Auth,
            shared.config.timeout,
            expiry(shared, epoch, id),
        )?;
        session.auth.start(id);
        session.state = ConnectionState::Authenticating;
        (handle, writer, epoch)
    };

    let frame = Frame::auth(handle.id(), password);
    let written = {
        let mut writer = writer.lock().await;
        writer.write_frame(&frame).await
    };
    if let Err(err) = written {
        return Err(fail_write(shared, epoch, err).await);
    }

    handle.wait().await.map(|_| ())
}

/// Send one command plus its sentinel probe and wait for the reassembled
/// response.
pub(crate) async fn send_command(shared: &Arc<Shared>, command: &str) -> Result<String> {
    check_payload(command.as_bytes(), shared.config.max_payload_size)?;

    let (handle, sentinel, writer, epoch) = {
        let mut guard = shared.lock();
        let session = &mut *guard;
        let Some(link) = &session.link else {
            return Err(ClientError::NotConnected);
        };
        if !session.auth.is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }
        if !session.reassembler.is_empty() {
            return Err(ClientError::CommandInFlight);
        }

        let writer = Arc::clone(&link.writer);
        let epoch = session.epoch;
        let (id, sentinel) = session.tracker.next_command_ids();
        let handle = session.tracker.register(
            id,
            RequestKind::Command,
            shared.config.timeout,
            expiry(shared, epoch, id),
        )?;
        session.reassembler.begin(id, sentinel);
        (handle, sentinel, writer, epoch)
    };

    debug!(
        request_id = handle.id(),
        sentinel_id = sentinel,
        size = command.len(),
        "sending command"
    );
    let frames = [
        Frame::command(handle.id(), command),
        Frame::command(sentinel, ""),
    ];
    let written = {
        let mut writer = writer.lock().await;
        writer.send_all(&frames).await
    };
    if let Err(err) = written {
        return Err(fail_write(shared, epoch, err).await);
    }

    handle.wait().await
}

/// Close the connection on request. Safe to call in any state.
pub(crate) async fn disconnect(shared: &Arc<Shared>) {
    let epoch = {
        let mut session = shared.lock();
        session.auto_reconnect = false;
        match session.state {
            ConnectionState::Disconnected => return,
            ConnectionState::Connecting => {
                // The pending connect sees the new epoch and drops its socket.
                session.epoch += 1;
                session.state = ConnectionState::Disconnected;
                return;
            }
            _ => session.epoch,
        }
    };
    teardown(shared, epoch, DisconnectReason::Requested).await;
}

async fn fail_write(shared: &Arc<Shared>, epoch: u64, err: FrameError) -> ClientError {
    let detail = err.to_string();
    warn!(error = %detail, "write failed, closing connection");
    teardown(shared, epoch, DisconnectReason::ConnectionLost(detail)).await;
    ClientError::from(err)
}

async fn read_loop(
    shared: Arc<Shared>,
    epoch: u64,
    mut reader: OwnedReadHalf,
    cancel: CancellationToken,
) {
    let mut assembler = StreamAssembler::with_config(shared.config.frame_config());
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    let reason = loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => return,
            read = reader.read(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                break DisconnectReason::ConnectionLost("connection closed by server".to_string())
            }
            Ok(n) => match assembler.feed(&buf[..n]) {
                Ok(frames) => {
                    for frame in frames {
                        shared.dispatch(epoch, frame);
                    }
                }
                Err(err) => {
                    error!(
                        error = %err,
                        buffered = assembler.buffered_len(),
                        "protocol violation, closing connection"
                    );
                    shared.events.emit(ClientEvent::Error {
                        cause: err.to_string(),
                    });
                    let detail = match err {
                        FrameError::CorruptFrame { reason } => reason,
                        other => other.to_string(),
                    };
                    break DisconnectReason::ProtocolViolation(detail);
                }
            },
            Err(err) => break DisconnectReason::ConnectionLost(err.to_string()),
        }
    };

    teardown(&shared, epoch, reason).await;
}

/// Fail pending work, drop the link and publish `Disconnected`.
///
/// A no-op unless `epoch` is the current connection.
async fn teardown(shared: &Arc<Shared>, epoch: u64, reason: DisconnectReason) {
    let (link, reconnect) = {
        let mut session = shared.lock();
        if session.epoch != epoch {
            return;
        }
        let Some(link) = session.link.take() else {
            return;
        };

        session.state = ConnectionState::Closing;
        let failed = session.tracker.cancel_all(&reason);
        session.reassembler.clear();
        session.auth.reset();
        link.cancel.cancel();
        session.state = ConnectionState::Disconnected;

        info!(peer = %link.peer, %reason, failed, "disconnected");
        shared.events.emit(ClientEvent::Disconnected {
            reason: reason.clone(),
        });

        let reconnect = reason.is_unexpected()
            && session.auto_reconnect
            && !session.reconnecting
            && !shared.shutdown.is_cancelled();
        if reconnect {
            session.reconnecting = true;
        }
        (link, reconnect)
    };

    let shutdown = async {
        let mut writer = link.writer.lock().await;
        writer.shutdown().await
    };
    match tokio::time::timeout(shared.config.timeout, shutdown).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => debug!(error = %err, "write half shutdown failed"),
        Err(_) => debug!("write half shutdown timed out"),
    }

    if reconnect {
        spawn_reconnect(Arc::clone(shared));
    }
}

fn spawn_reconnect(shared: Arc<Shared>) {
    // Boxed to break the connect -> read_loop -> teardown -> reconnect type cycle.
    let task: Pin<Box<dyn Future<Output = ()> + Send>> = Box::pin(reconnect_loop(shared));
    tokio::spawn(task);
}

async fn reconnect_loop(shared: Arc<Shared>) {
    let policy = shared.config.reconnect.clone();

    loop {
        let attempt = {
            let mut session = shared.lock();
            if policy.allows(session.reconnect_attempts) {
                session.reconnect_attempts += 1;
                Ok(session.reconnect_attempts)
            } else {
                Err(session.reconnect_attempts)
            }
        };
        let attempt = match attempt {
            Ok(attempt) => attempt,
            Err(attempts) => {
                warn!(attempts, "giving up on reconnect");
                shared.events.emit(ClientEvent::Error {
                    cause: format!("reconnect failed after {attempts} attempts"),
                });
                break;
            }
        };
        let delay = policy.delay_for(attempt);
        info!(attempt, ?delay, "reconnecting");
        shared.events.emit(ClientEvent::Reconnecting { attempt, delay });

        tokio::select! {
            _ = shared.shutdown.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
        if !shared.lock().auto_reconnect {
            debug!("reconnect cancelled");
            break;
        }

        match establish(&shared, true).await {
            Ok(()) => {
                reauthenticate(&shared).await;
                return;
            }
            Err(ClientError::AlreadyConnected) => break,
            Err(err) => warn!(attempt, error = %err, "reconnect attempt failed"),
        }
    }

    shared.lock().reconnecting = false;
}

async fn reauthenticate(shared: &Arc<Shared>) {
    let Some(password) = shared.config.password.clone() else {
        return;
    };
    match authenticate(shared, &password).await {
        Ok(()) => {}
        // Already published as `AuthFailed`.
        Err(ClientError::AuthenticationFailed) => {}
        Err(err) => {
            warn!(error = %err, "re-authentication after reconnect failed");
            shared.events.emit(ClientEvent::Error {
                cause: format!("re-authentication failed: {err}"),
            });
        }
    }
}
