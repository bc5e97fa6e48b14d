//! Error types for the transport layer.

use std::fmt;

use agar_protocol::ProtocolError;
use agar_session::SessionError;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// `start()` was called on a manager that already left `Idle`.
    #[error("transport already started")]
    AlreadyStarted,

    /// The HTTP handshake failed; the socket was never opened.
    #[error(transparent)]
    Handshake(#[from] SessionError),

    /// Opening the WebSocket failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// An inbound message could not be unframed. Fatal to the session.
    #[error(transparent)]
    Malformed(#[from] ProtocolError),

    /// A pipeline task panicked.
    #[error("pipeline task failed: {0}")]
    TaskFailed(String),

    /// The transport was shut down; the queue no longer accepts packets.
    #[error("transport shut down")]
    Shutdown,

    /// Every non-cancellation fault collected by `stop()`.
    #[error("{} pipeline fault(s): {}", .0.len(), Faults(.0))]
    Aggregate(Vec<TransportError>),
}

impl TransportError {
    /// The individual faults, flattening an [`Aggregate`](Self::Aggregate).
    pub fn faults(&self) -> Vec<&TransportError> {
        match self {
            Self::Aggregate(inner) => inner.iter().flat_map(Self::faults).collect(),
            other => vec![other],
        }
    }
}

struct Faults<'a>(&'a [TransportError]);

impl fmt::Display for Faults<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, fault) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{fault}")?;
        }
        Ok(())
    }
}
