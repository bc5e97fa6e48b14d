//! Unified error type for the agar client.

use agar_protocol::ProtocolError;
use agar_session::SessionError;
use agar_transport::TransportError;

/// Errors raised by [`AgarClient`](crate::AgarClient) itself.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The transport's inbound queue was already taken by another client.
    #[error("inbound queue already taken")]
    InboundTaken,

    /// `start_processing_loop()` was called while the loop was running.
    #[error("processing loop already running")]
    AlreadyRunning,

    /// A previous loop task failed and took the client's queues with it.
    #[error("processing loop failed earlier; the client cannot restart")]
    LoopFailed,

    /// Enqueueing a packet failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum AgarError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: AgarError = TransportError::AlreadyStarted.into();
        assert!(matches!(err, AgarError::Transport(_)));
        assert_eq!(err.to_string(), "transport already started");
    }

    #[test]
    fn test_from_protocol_error() {
        let err: AgarError = ProtocolError::MalformedMessage.into();
        assert!(matches!(err, AgarError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err: AgarError = SessionError::Handshake("bad line".into()).into();
        assert!(matches!(err, AgarError::Session(_)));
        assert!(err.to_string().contains("bad line"));
    }

    #[test]
    fn test_from_client_error() {
        let err: AgarError = ClientError::InboundTaken.into();
        assert!(matches!(err, AgarError::Client(ClientError::InboundTaken)));
    }

    #[test]
    fn test_client_error_wraps_transport() {
        let err: ClientError = TransportError::Shutdown.into();
        assert_eq!(err.to_string(), "transport shut down");
    }
}
