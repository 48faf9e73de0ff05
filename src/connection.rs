//! Session connection: owns the transport for one game session.
//!
//! The session holds exactly one logical WebSocket to the game server
//! and keeps it alive: on any close or error it re-attempts the connect
//! according to its [`ReconnectPolicy`]. There is no send queue:
//! a send while disconnected is refused, not buffered.
//!
//! # Architecture
//!
//! ```text
//! SessionConnection (handle)
//!   │ send() ──► outbound mpsc ──┐
//!   │ status() ◄── shared status │
//!   ▼                            ▼
//! run_connection_loop ──► run_socket_loop (tokio::select!)
//!   │ connect / retry      │ writes outbound frames
//!   │ per policy           │ decodes inbound frames
//!   ▼                      ▼
//! ConnectionStatus    SessionEvent mpsc ──► single consumer
//! ```
//!
//! All events (`Up`, `Down`, decoded frames) travel one unbounded mpsc
//! to a single consumer, in arrival order. Board mutations are not
//! commutative, so that ordering is load-bearing.

// Rust guideline compliant 2026-02

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::constants::{
    BACKOFF_JITTER, DEFAULT_RECONNECT_DELAY, INITIAL_BACKOFF_DELAY, MAX_BACKOFF_DELAY,
};
use crate::protocol::{self, ClientMessage, ServerMessage};
use crate::ws::{self, WsMessage, WsReader, WsWriter};

// ─── Reconnect policy ──────────────────────────────────────────────────────

/// How the session paces reconnect attempts.
///
/// The policy is injectable so retry behavior can be tuned or tested
/// without touching the connection loop itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Retry forever at a fixed pace. The default: the session
    /// prioritizes eventual reconnection over protecting the endpoint
    /// from retry storms.
    FixedDelay(Duration),
    /// Double the delay per consecutive failure up to `max`, plus
    /// random jitter so a fleet of clients does not retry in lockstep.
    Backoff {
        /// Delay before the first retry.
        initial: Duration,
        /// Ceiling the doubling stops at.
        max: Duration,
    },
    /// Give up after `attempts` consecutive failures.
    BoundedAttempts {
        /// Consecutive failures tolerated before the loop exits.
        attempts: u32,
        /// Delay between those attempts.
        delay: Duration,
    },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::FixedDelay(DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    /// Backoff with the standard pacing constants.
    #[must_use]
    pub fn backoff() -> Self {
        ReconnectPolicy::Backoff {
            initial: INITIAL_BACKOFF_DELAY,
            max: MAX_BACKOFF_DELAY,
        }
    }

    /// Delay before reconnect attempt `attempt` (1-based, counted since
    /// the last successful connection). `None` means stop retrying.
    #[must_use]
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        match *self {
            ReconnectPolicy::FixedDelay(delay) => Some(delay),
            ReconnectPolicy::Backoff { initial, max } => {
                // Cap the exponent so the multiply cannot overflow
                let exp = attempt.saturating_sub(1).min(16);
                let delay = initial.saturating_mul(2_u32.saturating_pow(exp)).min(max);
                let jitter_ms = rand::random::<u64>() % BACKOFF_JITTER.as_millis() as u64;
                Some(delay + Duration::from_millis(jitter_ms))
            }
            ReconnectPolicy::BoundedAttempts { attempts, delay } => {
                (attempt <= attempts).then_some(delay)
            }
        }
    }
}

// ─── Connectivity status ───────────────────────────────────────────────────

/// Connectivity of the session, observable from any thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No transport. Initial state; terminal once the loop gives up or
    /// is shut down.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Live transport; sends reach the wire.
    Connected,
    /// Waiting out the policy delay before attempt `attempt`.
    Reconnecting {
        /// 1-based count of consecutive failed attempts.
        attempt: u32,
    },
}

/// Shared view of the session's [`ConnectionStatus`].
#[derive(Debug, Clone)]
pub struct SharedStatus {
    inner: Arc<RwLock<ConnectionStatus>>,
}

impl SharedStatus {
    fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ConnectionStatus::Disconnected)),
        }
    }

    /// Current status.
    #[must_use]
    pub fn get(&self) -> ConnectionStatus {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set(&self, status: ConnectionStatus) {
        match self.inner.write() {
            Ok(mut guard) => *guard = status,
            Err(poisoned) => *poisoned.into_inner() = status,
        }
    }

    /// Whether a send would currently reach the wire.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionStatus::Connected
    }
}

// ─── Events & errors ───────────────────────────────────────────────────────

/// Everything the session reports to its single consumer, in order.
#[derive(Debug)]
pub enum SessionEvent {
    /// Transport established.
    Up,
    /// A previously established transport was lost. The loop schedules
    /// a reconnect per policy; failed attempts log diagnostics only.
    Down {
        /// Human-readable cause of the drop.
        reason: String,
    },
    /// One decoded inbound message, delivered in arrival order.
    Frame(ServerMessage),
}

/// Error from [`SessionConnection::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// Not currently connected. The message was dropped, not queued.
    NotConnected,
    /// The background task has shut down; no further sends are possible.
    Closed,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::NotConnected => write!(f, "not connected: message dropped"),
            SendError::Closed => write!(f, "session has shut down"),
        }
    }
}

impl std::error::Error for SendError {}

// ─── Handle ────────────────────────────────────────────────────────────────

/// Connection parameters for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket endpoint of the game server.
    pub url: String,
    /// Retry pacing after transport loss.
    pub policy: ReconnectPolicy,
}

/// Handle to a live session connection.
///
/// Created by [`SessionConnection::open`], which starts the background
/// connect/reconnect loop exactly once; connecting is idempotent by
/// construction, and every later reconnect belongs to the loop, not the
/// caller. Dropping the handle shuts the loop down.
#[derive(Debug)]
pub struct SessionConnection {
    outbound_tx: mpsc::UnboundedSender<String>,
    status: SharedStatus,
    shutdown: Arc<AtomicBool>,
}

impl SessionConnection {
    /// Opens the session and spawns its background loop.
    ///
    /// `events_tx` is the sole delivery path for connectivity changes
    /// and decoded frames; keep exactly one consumer on the other end.
    #[must_use]
    pub fn open(config: SessionConfig, events_tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let status = SharedStatus::new();
        let shutdown = Arc::new(AtomicBool::new(false));

        tokio::spawn(run_connection_loop(
            config,
            status.clone(),
            Arc::clone(&shutdown),
            outbound_rx,
            events_tx,
        ));

        Self {
            outbound_tx,
            status,
            shutdown,
        }
    }

    /// Encodes and transmits one outbound message.
    ///
    /// # Errors
    ///
    /// [`SendError::NotConnected`] while the transport is down; the
    /// message is dropped (no send queue, no retry). [`SendError::Closed`]
    /// once the session has shut down.
    pub fn send(&self, msg: &ClientMessage) -> Result<(), SendError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(SendError::Closed);
        }
        if !self.status.is_connected() {
            log::warn!("[Session] send while disconnected, dropping message");
            return Err(SendError::NotConnected);
        }
        let text = protocol::encode(msg);
        self.outbound_tx.send(text).map_err(|_| SendError::Closed)
    }

    /// Current connectivity status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status.get()
    }

    /// Whether a send would currently reach the wire.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    /// Requests shutdown. The loop exits at its next transport event;
    /// dropping the handle additionally closes the outbound channel,
    /// which wakes the loop immediately.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

impl Drop for SessionConnection {
    fn drop(&mut self) {
        self.shutdown();
        log::debug!("[Session] handle dropped, shutting down");
    }
}

// ─── Background loop ───────────────────────────────────────────────────────

/// Why [`run_socket_loop`] returned.
enum SocketLoopExit {
    /// Shutdown was requested or the consumer went away.
    Shutdown,
    /// The transport failed or closed; reconnect per policy.
    Disconnected(String),
}

/// Connect/reconnect driver. Runs until shutdown or until the policy
/// declines a further attempt.
async fn run_connection_loop(
    config: SessionConfig,
    status: SharedStatus,
    shutdown: Arc<AtomicBool>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
) {
    log::info!("[Session] opening {}", config.url);
    let mut attempt: u32 = 0;

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        status.set(ConnectionStatus::Connecting);
        match ws::connect(&config.url).await {
            Ok((mut writer, mut reader)) => {
                attempt = 0;
                // A racing send can slip in after the post-exit drain;
                // nothing queued while down may reach this socket.
                discard_queued_sends(&mut outbound_rx);
                status.set(ConnectionStatus::Connected);
                log::info!("[Session] connected to {}", config.url);
                if events_tx.send(SessionEvent::Up).is_err() {
                    break;
                }

                let exit = run_socket_loop(
                    &mut writer,
                    &mut reader,
                    &mut outbound_rx,
                    &events_tx,
                    &shutdown,
                )
                .await;

                status.set(ConnectionStatus::Disconnected);
                discard_queued_sends(&mut outbound_rx);

                match exit {
                    SocketLoopExit::Shutdown => {
                        if let Err(e) = writer.close().await {
                            log::debug!("[Session] close on shutdown failed: {e}");
                        }
                        break;
                    }
                    SocketLoopExit::Disconnected(reason) => {
                        log::warn!("[Session] connection lost: {reason}");
                        if events_tx
                            .send(SessionEvent::Down {
                                reason: reason.clone(),
                            })
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                log::warn!("[Session] connect attempt failed: {e:#}");
            }
        }

        attempt += 1;
        match config.policy.next_delay(attempt) {
            Some(delay) => {
                status.set(ConnectionStatus::Reconnecting { attempt });
                log::debug!("[Session] reconnect attempt {attempt} in {delay:?}");
                tokio::time::sleep(delay).await;
            }
            None => {
                log::error!(
                    "[Session] giving up after {attempt} failed attempt(s) ({:?})",
                    config.policy
                );
                break;
            }
        }
    }

    status.set(ConnectionStatus::Disconnected);
    log::info!("[Session] connection loop exited");
}

/// Pumps one live socket: outbound writes and inbound decode/dispatch.
async fn run_socket_loop(
    writer: &mut WsWriter,
    reader: &mut WsReader,
    outbound_rx: &mut mpsc::UnboundedReceiver<String>,
    events_tx: &mpsc::UnboundedSender<SessionEvent>,
    shutdown: &AtomicBool,
) -> SocketLoopExit {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return SocketLoopExit::Shutdown;
        }

        tokio::select! {
            maybe_text = outbound_rx.recv() => {
                match maybe_text {
                    Some(text) => {
                        if let Err(e) = writer.send_text(&text).await {
                            return SocketLoopExit::Disconnected(format!("send failed: {e}"));
                        }
                    }
                    // Handle dropped: nothing will ever send again
                    None => return SocketLoopExit::Shutdown,
                }
            }

            maybe_msg = reader.recv() => {
                match maybe_msg {
                    Some(Ok(WsMessage::Text(text))) => match protocol::decode(&text) {
                        Ok(frame) => {
                            if events_tx.send(SessionEvent::Frame(frame)).is_err() {
                                return SocketLoopExit::Shutdown;
                            }
                        }
                        Err(e) => {
                            log::warn!("[Session] dropping undecodable frame: {e}");
                        }
                    },
                    Some(Ok(WsMessage::Ping(data))) => {
                        if let Err(e) = writer.send_pong(data).await {
                            log::warn!("[Session] pong failed: {e}");
                        }
                    }
                    Some(Ok(WsMessage::Pong(_))) => {}
                    Some(Ok(WsMessage::Binary(data))) => {
                        log::warn!(
                            "[Session] ignoring unexpected binary frame ({} bytes)",
                            data.len()
                        );
                    }
                    Some(Ok(WsMessage::Close { code, reason })) => {
                        return SocketLoopExit::Disconnected(format!(
                            "server closed (code {code}): {reason}"
                        ));
                    }
                    Some(Err(e)) => {
                        return SocketLoopExit::Disconnected(format!("read error: {e}"));
                    }
                    None => {
                        return SocketLoopExit::Disconnected("stream ended".to_string());
                    }
                }
            }
        }
    }
}

/// Drops messages that were enqueued in the instant the transport died.
/// Keeping them would turn the no-queue contract into silent buffering
/// across reconnects. Runs when a socket loop exits and again before the
/// next one starts, so a send that raced the status flip cannot ride a
/// reconnect.
fn discard_queued_sends(outbound_rx: &mut mpsc::UnboundedReceiver<String>) {
    let mut dropped = 0_usize;
    while outbound_rx.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        log::warn!("[Session] discarded {dropped} stale queued send(s)");
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────
