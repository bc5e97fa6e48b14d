//! Error types for the session layer.

/// Errors that can occur while obtaining a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The handshake response could not be interpreted: the endpoint line
    /// wasn't `host:port` with exactly one colon, the port wasn't a
    /// number, or the token line was missing.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The HTTP request itself failed (DNS, connect, non-2xx status).
    #[error("handshake request failed: {0}")]
    Http(#[source] reqwest::Error),
}
