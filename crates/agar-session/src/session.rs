//! Session types: what the handshake yields.
//!
//! A session is created once, before the socket connects, and stays
//! fixed for the transport's lifetime:
//! - WHERE to connect ([`ServerEndpoint`])
//! - WHO we are to the server ([`ConnectionToken`])

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::SessionError;

// ---------------------------------------------------------------------------
// ServerEndpoint
// ---------------------------------------------------------------------------

/// Game server address from the handshake's first response line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub host: String,
    pub port: u16,
}

impl ServerEndpoint {
    /// Creates an endpoint from parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses `"host:port"`.
    ///
    /// # Errors
    /// [`SessionError::Handshake`] unless the input contains exactly one
    /// colon with a non-empty host before it and a valid port after it.
    pub fn parse(s: &str) -> Result<Self, SessionError> {
        let s = s.trim();
        let mut parts = s.split(':');
        let (Some(host), Some(port), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(SessionError::Handshake(format!(
                "expected host:port, got {s:?}"
            )));
        };
        if host.is_empty() {
            return Err(SessionError::Handshake(format!("empty host in {s:?}")));
        }
        let port = port.parse::<u16>().map_err(|e| {
            SessionError::Handshake(format!("invalid port in {s:?}: {e}"))
        })?;
        Ok(Self::new(host, port))
    }

    /// The WebSocket URI for this endpoint: `ws://host:port/`.
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/", self.host, self.port)
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// ConnectionToken
// ---------------------------------------------------------------------------

/// Opaque token the server expects in the third init packet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionToken(String);

impl ConnectionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionInfo
// ---------------------------------------------------------------------------

/// Everything the handshake produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub endpoint: ServerEndpoint,
    pub token: ConnectionToken,
}

impl SessionInfo {
    /// Parses a handshake response body.
    ///
    /// The body is read as two lines: `host:port`, then the token.
    /// Anything after the second line is ignored.
    ///
    /// # Errors
    /// [`SessionError::Handshake`] if the endpoint is malformed or the
    /// token line is missing or blank.
    pub fn from_response(body: &str) -> Result<Self, SessionError> {
        let mut lines = body.lines();
        let endpoint = lines
            .next()
            .ok_or_else(|| SessionError::Handshake("empty response".into()))?;
        let endpoint = ServerEndpoint::parse(endpoint)?;
        let token = lines
            .next()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SessionError::Handshake("response has no connection token".into())
            })?;
        Ok(Self {
            endpoint,
            token: ConnectionToken::new(token),
        })
    }
}
