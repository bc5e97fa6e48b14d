//! Wire protocol for the agar.io client.
//!
//! This crate is the "language" the client and the game server speak:
//!
//! - **Codec** ([`Packet`], [`frame`], [`unframe`]): raw socket message
//!   ↔ opcode + payload.
//! - **Opcodes** ([`ClientOpcode`], [`ServerOpcode`]): the contractual
//!   opcode tables for both directions.
//! - **Commands** ([`Command`]): player intents turned into packets.
//! - **Decoders** ([`decode_world_update`], [`decode_game_area_size`],
//!   [`decode_owns_entity`]): server payloads → typed events.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sockets or the world model. It
//! only converts bytes to structures and back.
//!
//! ```text
//! Transport (bytes) → Protocol (Packet → events) → World store
//! ```
//!
//! All multi-byte numbers on the wire are little-endian.

mod codec;
mod command;
mod decode;
mod error;
mod opcode;

pub use codec::{frame, unframe, Packet};
pub use command::Command;
pub use decode::{
    decode_game_area_size, decode_owns_entity, decode_world_update, EatEvent,
    PayloadReader, UpdateEvent, WorldBounds, WorldUpdate, FLAG_HAS_SKIN,
    FLAG_OPAQUE_EXTRA,
};
pub use error::ProtocolError;
pub use opcode::{ClientOpcode, ServerOpcode, INIT1_MAGIC, SERVER_VERSION};
