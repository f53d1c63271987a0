//! The IPC client that relays events to the downstream consumer.
//!
//! An explicit two-state machine: `Disconnected` or `Connected(peer)`,
//! guarded by a single lock so state transitions stay atomic even if the
//! source ever delivers concurrently. The policy is drop, don't block,
//! don't queue: a send against a dead peer makes one bounded connection
//! attempt, drops the event on failure, and leaves reconnection to the
//! next send. Event loss on a down consumer is the accepted tradeoff for
//! never stalling the delivery callback.

use std::io::{self, Write as _};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tracing::debug;

use filesentry_core::config::ForwarderConfig;
use filesentry_core::event::FileEvent;
use filesentry_core::ipc::{EventSink, MonitorMessage};
use filesentry_core::rate_limit::{DropLogLimiter, RateLimitResult};

/// A way to reach the consumer. Both operations must be bounded in time.
pub trait Transport: Send + Sync {
    /// A live link to the consumer.
    type Peer: Send;

    /// Establish a fresh link. Fails fast when no consumer is listening.
    fn connect(&self) -> io::Result<Self::Peer>;

    /// Deliver one message over an established link.
    fn transmit(&self, peer: &mut Self::Peer, message: &MonitorMessage) -> io::Result<()>;
}

enum PeerState<P> {
    Disconnected,
    Connected(P),
}

/// Counters for forwarding outcomes. Snapshot via [`Forwarder::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwarderStats {
    pub sent: u64,
    pub dropped_no_peer: u64,
    pub dropped_send_error: u64,
}

/// Lazily-connecting, fire-and-forget event forwarder.
pub struct Forwarder<T: Transport> {
    transport: T,
    state: Mutex<PeerState<T::Peer>>,
    sent: AtomicU64,
    dropped_no_peer: AtomicU64,
    dropped_send_error: AtomicU64,
    drop_logs: Mutex<DropLogLimiter>,
}

impl<T: Transport> Forwarder<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: Mutex::new(PeerState::Disconnected),
            sent: AtomicU64::new(0),
            dropped_no_peer: AtomicU64::new(0),
            dropped_send_error: AtomicU64::new(0),
            drop_logs: Mutex::new(DropLogLimiter::default()),
        }
    }

    /// Snapshot of the forwarding counters.
    pub fn stats(&self) -> ForwarderStats {
        ForwarderStats {
            sent: self.sent.load(Ordering::Relaxed),
            dropped_no_peer: self.dropped_no_peer.load(Ordering::Relaxed),
            dropped_send_error: self.dropped_send_error.load(Ordering::Relaxed),
        }
    }

    /// Whether a peer link is currently established.
    pub fn is_connected(&self) -> bool {
        matches!(
            self.state.lock().as_deref(),
            Ok(PeerState::Connected(_))
        )
    }

    fn note_drop(&self, reason: &'static str, err: &io::Error) {
        let Ok(mut limiter) = self.drop_logs.lock() else {
            return;
        };
        match limiter.check(reason) {
            RateLimitResult::Allowed => {
                debug!(reason, error = %err, "event dropped by forwarder");
            }
            RateLimitResult::NewlySuppressed => {
                debug!(reason, "forwarder drop diagnostics over cap, suppressing further lines");
            }
            RateLimitResult::Suppressed => {}
        }
    }
}

impl<T: Transport> EventSink for Forwarder<T> {
    fn send(&self, event: &FileEvent) {
        let message = MonitorMessage::from(event);
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        match &mut *state {
            PeerState::Disconnected => {
                let mut peer = match self.transport.connect() {
                    Ok(peer) => peer,
                    Err(err) => {
                        // One attempt only; the next send tries again.
                        self.dropped_no_peer.fetch_add(1, Ordering::Relaxed);
                        self.note_drop("no_peer", &err);
                        return;
                    }
                };
                match self.transport.transmit(&mut peer, &message) {
                    Ok(()) => {
                        debug!("peer connection established");
                        *state = PeerState::Connected(peer);
                        self.sent.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => {
                        self.dropped_send_error.fetch_add(1, Ordering::Relaxed);
                        self.note_drop("send_failed", &err);
                    }
                }
            }
            PeerState::Connected(peer) => {
                if let Err(err) = self.transport.transmit(peer, &message) {
                    // Peer died mid-call: drop the event, reconnect lazily.
                    *state = PeerState::Disconnected;
                    self.dropped_send_error.fetch_add(1, Ordering::Relaxed);
                    self.note_drop("send_failed", &err);
                } else {
                    self.sent.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

/// Production transport: newline-delimited JSON frames over a Unix domain
/// socket, with a write timeout so a stalled consumer cannot hold the
/// delivery callback hostage.
pub struct UnixTransport {
    socket_path: PathBuf,
    timeout: Duration,
}

impl UnixTransport {
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ForwarderConfig) -> Self {
        Self::new(
            config.socket_path.clone(),
            Duration::from_millis(config.send_timeout_ms),
        )
    }
}

impl Transport for UnixTransport {
    type Peer = UnixStream;

    fn connect(&self) -> io::Result<UnixStream> {
        let stream = UnixStream::connect(&self.socket_path)?;
        stream.set_write_timeout(Some(self.timeout))?;
        Ok(stream)
    }

    fn transmit(&self, peer: &mut UnixStream, message: &MonitorMessage) -> io::Result<()> {
        let mut frame = serde_json::to_vec(message)?;
        frame.push(b'\n');
        peer.write_all(&frame)
    }
}
