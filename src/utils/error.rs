//! The `error` module defines the error types used within `chathub`.
//!
//! The hub itself reports almost nothing as an error: full queues block,
//! redundant cancellations and unknown unsubscribes are no-ops. The only
//! failure a caller can observe is talking to a hub whose task has stopped.

use thiserror::Error;

/// Failure to reach the hub actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HubError {
    /// The hub task is no longer running, so the request could not be queued
    /// or its reply never arrived.
    #[error("hub is closed")]
    Closed,
}

/// Errors raised by the WebSocket transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept connections: {0}")]
    Accept(#[source] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Hub(#[from] HubError),
}
