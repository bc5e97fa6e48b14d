//! Client configuration.

use std::time::Duration;

use agar_protocol::SERVER_VERSION;
use serde::{Deserialize, Serialize};

/// Settings for an [`AgarClient`](crate::AgarClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Longest the dispatch loop sleeps without activity before
    /// rechecking for a stop request.
    pub poll_interval: Duration,

    /// Value sent in the second initialization packet.
    pub server_version: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(125),
            server_version: SERVER_VERSION,
        }
    }
}
