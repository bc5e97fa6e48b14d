//! Session discovery for the agar.io client.
//!
//! Before a socket can be opened, the client asks the master server where
//! to connect and gets a token to present once connected:
//!
//! ```text
//! POST http://m.agar.io/  →  "host:port\n<token>"
//! ```
//!
//! # How it fits in the stack
//!
//! ```text
//! Transport (above)  ← performs the handshake once, in Connecting
//!     ↕
//! Session (this crate)  ← ServerEndpoint + ConnectionToken
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod handshake;
mod session;

pub use error::SessionError;
pub use handshake::{
    Handshake, HandshakeConfig, HttpHandshake, StaticHandshake, DEFAULT_HANDSHAKE_URL,
};
pub use session::{ConnectionToken, ServerEndpoint, SessionInfo};
