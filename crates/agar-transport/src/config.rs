//! Transport configuration and lifecycle state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `Origin` header the game server insists on.
pub const DEFAULT_ORIGIN: &str = "http://agar.io";

// ---------------------------------------------------------------------------
// TransportConfig
// ---------------------------------------------------------------------------

/// Settings for a [`TransportManager`](crate::TransportManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Largest WebSocket frame written per chunk. Longer packets are
    /// fragmented; only the last fragment is marked final.
    pub send_unit: usize,

    /// Size of the buffer each socket read fills.
    pub recv_unit: usize,

    /// Upper bound on every blocking wait in the pipelines. A stop
    /// request is observed within one interval.
    pub poll_interval: Duration,

    /// Value of the `Origin` request header.
    pub origin: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            send_unit: 1024,
            recv_unit: 1024,
            poll_interval: Duration::from_millis(125),
            origin: DEFAULT_ORIGIN.to_string(),
        }
    }
}

impl TransportConfig {
    /// Fixes values that would stall the pipelines.
    ///
    /// Called automatically by [`TransportManager::new`](crate::TransportManager::new).
    /// Zero-sized units become 1; a zero poll interval becomes 1 ms.
    pub fn validated(mut self) -> Self {
        if self.send_unit == 0 {
            tracing::warn!("send_unit is 0, using 1");
            self.send_unit = 1;
        }
        if self.recv_unit == 0 {
            tracing::warn!("recv_unit is 0, using 1");
            self.recv_unit = 1;
        }
        if self.poll_interval.is_zero() {
            self.poll_interval = Duration::from_millis(1);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// TransportState
// ---------------------------------------------------------------------------

/// Lifecycle of a transport manager.
///
/// ```text
/// Idle → Connecting → Running → Stopping → Stopped
/// ```
///
/// A manager is single-use: once it leaves `Idle` it never returns.
/// A failed connect goes straight to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    Idle,
    Connecting,
    Running,
    Stopping,
    Stopped,
}

impl TransportState {
    /// The next state in the normal lifecycle, `None` at the end.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Connecting),
            Self::Connecting => Some(Self::Running),
            Self::Running => Some(Self::Stopping),
            Self::Stopping => Some(Self::Stopped),
            Self::Stopped => None,
        }
    }

    /// `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
            || (self == Self::Connecting && target == Self::Stopped)
    }
}

impl std::fmt::Display for TransportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Running => write!(f, "Running"),
            Self::Stopping => write!(f, "Stopping"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}
