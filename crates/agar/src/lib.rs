//! # agar
//!
//! Client for agar.io-style game servers.
//!
//! The client is layered: a [`TransportManager`] owns the socket and its
//! send/receive pipelines, and an [`AgarClient`] feeds it commands and
//! applies decoded server packets to a shared [`WorldStore`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agar::prelude::*;
//!
//! # async fn run() -> Result<(), AgarError> {
//! let manager = TransportManager::new(HttpHandshake::default(), TransportConfig::default());
//! let client = AgarClient::attach(&manager, ClientConfig::default())?;
//!
//! manager.start().await?;
//! client.start_processing_loop()?;
//! if let Some(session) = manager.session() {
//!     client.start_initialization(&session.token)?;
//! }
//! client.submit(Command::Spawn { name: "agar-rs".into() })?;
//!
//! let world = client.world();
//! println!("{} entities visible", world.entity_count());
//!
//! client.stop_processing_loop().await;
//! manager.stop().await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`TransportManager`]: agar_transport::TransportManager
//! [`WorldStore`]: agar_world::WorldStore

mod client;
mod config;
mod error;

pub use client::{dispatch_packet, AgarClient};
pub use config::ClientConfig;
pub use error::{AgarError, ClientError};

pub use agar_protocol as protocol;
pub use agar_session as session;
pub use agar_transport as transport;
pub use agar_world as world;

/// Everything needed to connect, play, and watch the world.
pub mod prelude {
    pub use crate::{AgarClient, AgarError, ClientConfig, ClientError};
    pub use agar_protocol::{Command, Packet, UpdateEvent, WorldBounds};
    pub use agar_session::{
        ConnectionToken, HandshakeConfig, HttpHandshake, ServerEndpoint, SessionInfo,
    };
    pub use agar_transport::{TransportConfig, TransportEvent, TransportManager, TransportState};
    pub use agar_world::{World, WorldStore};
}
