//! WebSocket transport for the agar.io client.
//!
//! A [`TransportManager`] performs the HTTP handshake, opens the socket
//! with the required `Origin` header, and runs two pipelines:
//!
//! - **send**: drains the outbound queue, frames each [`Packet`], and
//!   writes it in `send_unit`-sized WebSocket fragments.
//! - **recv**: reads `recv_unit`-sized chunks, reassembles messages, and
//!   queues the unframed packets for the caller.
//!
//! [`Packet`]: agar_protocol::Packet

mod config;
mod error;
mod manager;
mod pipeline;
mod queue;
mod websocket;

pub use config::{TransportConfig, TransportState, DEFAULT_ORIGIN};
pub use error::TransportError;
pub use manager::{TransportEvent, TransportManager};
pub use queue::{packet_queue, PacketReceiver, PacketSender};
