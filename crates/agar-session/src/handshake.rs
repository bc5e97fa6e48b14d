//! The one-time HTTP handshake that precedes the socket connection.
//!
//! The transport doesn't care how a session is obtained, only that it
//! gets a [`SessionInfo`]. The [`Handshake`] trait is that seam:
//! [`HttpHandshake`] talks to the real master server, and
//! [`StaticHandshake`] hands back a fixed session (local servers, tests).

use agar_protocol::SERVER_VERSION;
use serde::{Deserialize, Serialize};

use crate::{SessionError, SessionInfo};

/// Master server the handshake is POSTed to.
pub const DEFAULT_HANDSHAKE_URL: &str = "http://m.agar.io/";

/// Obtains a session before the socket connects.
///
/// - `Send + Sync` → the handshake may be invoked from any Tokio worker.
/// - `'static` → it lives as long as the transport that owns it.
pub trait Handshake: Send + Sync + 'static {
    /// Performs the handshake and returns the endpoint and token.
    ///
    /// # Errors
    /// [`SessionError`] if the request fails or the response is malformed.
    fn perform(
        &self,
    ) -> impl std::future::Future<Output = Result<SessionInfo, SessionError>> + Send;
}

// ---------------------------------------------------------------------------
// HttpHandshake
// ---------------------------------------------------------------------------

/// Settings for [`HttpHandshake`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeConfig {
    /// URL the handshake is POSTed to.
    pub url: String,
    /// Region code (e.g. `"EU-London"`). When set, the request body is
    /// `"<region>\n<server_version>"`; otherwise it is empty.
    pub region: Option<String>,
    /// Version announced alongside the region.
    pub server_version: u32,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_HANDSHAKE_URL.to_string(),
            region: None,
            server_version: SERVER_VERSION,
        }
    }
}

/// Handshake against the HTTP master server.
#[derive(Debug, Clone)]
pub struct HttpHandshake {
    client: reqwest::Client,
    config: HandshakeConfig,
}

impl HttpHandshake {
    pub fn new(config: HandshakeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    fn body(&self) -> String {
        match &self.config.region {
            Some(region) => format!("{region}\n{}", self.config.server_version),
            None => String::new(),
        }
    }
}

impl Default for HttpHandshake {
    fn default() -> Self {
        Self::new(HandshakeConfig::default())
    }
}

impl Handshake for HttpHandshake {
    async fn perform(&self) -> Result<SessionInfo, SessionError> {
        tracing::debug!(url = %self.config.url, "requesting connection token");

        let body = self
            .client
            .post(&self.config.url)
            .body(self.body())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(SessionError::Http)?
            .text()
            .await
            .map_err(SessionError::Http)?;

        let info = SessionInfo::from_response(&body)?;
        tracing::info!(endpoint = %info.endpoint, "handshake complete");
        Ok(info)
    }
}

// ---------------------------------------------------------------------------
// StaticHandshake
// ---------------------------------------------------------------------------

/// A handshake that always returns the same session.
///
/// Useful for private servers that hand out endpoints and tokens some
/// other way, and for tests against a local socket.
#[derive(Debug, Clone)]
pub struct StaticHandshake(pub SessionInfo);

impl Handshake for StaticHandshake {
    async fn perform(&self) -> Result<SessionInfo, SessionError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HandshakeConfig::default();
        assert_eq!(config.url, "http://m.agar.io/");
        assert_eq!(config.region, None);
        assert_eq!(config.server_version, SERVER_VERSION);
    }

    #[test]
    fn test_body_with_region() {
        let hs = HttpHandshake::new(HandshakeConfig {
            region: Some("EU-London".into()),
            server_version: 42,
            ..HandshakeConfig::default()
        });
        assert_eq!(hs.body(), "EU-London\n42");
        assert_eq!(HttpHandshake::default().body(), "");
    }
}
