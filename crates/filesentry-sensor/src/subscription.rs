//! Connection lifecycle for the event source.
//!
//! The source hands out exactly one exclusively-owned client handle per
//! process, and double-releasing it is undefined behavior in the underlying
//! API. [`Connection`] makes that impossible: the inner handle is taken out
//! exactly once, by the first `release` (or by `Drop`), and every later
//! release is a no-op.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use filesentry_core::event::{FileEventKind, SUBSCRIBED_KINDS};

use crate::source::{ConnectError, DispatchSink, EventSource, SubscribeError};

/// A live registration with the event source.
///
/// Holds the source's client handle with take-once release semantics. The
/// connection must outlive the last possible callback invocation; dropping
/// it releases the handle if `release` was never called explicitly.
pub struct Connection<S: EventSource> {
    source: Arc<S>,
    client: Option<S::Client>,
}

impl<S: EventSource> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("is_live", &self.client.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: EventSource> Connection<S> {
    fn new(source: Arc<S>, client: S::Client) -> Self {
        Self {
            source,
            client: Some(client),
        }
    }

    /// Whether the underlying handle has not been released yet.
    pub fn is_live(&self) -> bool {
        self.client.is_some()
    }

    /// Release the underlying handle. The first call performs exactly one
    /// release against the source; every subsequent call is a no-op.
    pub fn release(&mut self) {
        if let Some(client) = self.client.take() {
            self.source.release(client);
            debug!("event source connection released");
        }
    }
}

impl<S: EventSource> Drop for Connection<S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Failure to bring up a monitoring session.
///
/// Fatal either way: the cause is environmental (missing privilege grant,
/// bad kind set), so the caller reports it and exits rather than retrying.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Subscribe(#[from] SubscribeError),
}

/// Owns connect/subscribe/shutdown against an [`EventSource`].
pub struct SubscriptionManager<S: EventSource> {
    source: Arc<S>,
}

impl<S: EventSource> SubscriptionManager<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Open a connection, registering `sink` as the delivery callback.
    pub fn connect(&self, sink: DispatchSink) -> Result<Connection<S>, ConnectError> {
        let client = self.source.connect(sink)?;
        info!("connected to security-event source");
        Ok(Connection::new(Arc::clone(&self.source), client))
    }

    /// Subscribe the connection to the fixed five-kind set.
    pub fn subscribe(&self, connection: &Connection<S>) -> Result<(), SubscribeError> {
        let client = connection
            .client
            .as_ref()
            .ok_or_else(|| SubscribeError::Rejected("connection already released".to_string()))?;
        self.source.subscribe(client, &SUBSCRIBED_KINDS)?;
        info!(
            kinds = ?SUBSCRIBED_KINDS.map(FileEventKind::as_str),
            "subscribed to file event kinds"
        );
        Ok(())
    }

    /// Connect and subscribe in one step. A rejected subscription releases
    /// the fresh connection before the error is returned, so no handle
    /// leaks on the failure path.
    pub fn start(&self, sink: DispatchSink) -> Result<Connection<S>, SessionError> {
        let mut connection = self.connect(sink)?;
        if let Err(err) = self.subscribe(&connection) {
            connection.release();
            return Err(err.into());
        }
        Ok(connection)
    }

    /// End the session, releasing the handle exactly once.
    pub fn shutdown(&self, mut connection: Connection<S>) {
        connection.release();
        info!("monitoring session shut down");
    }
}
