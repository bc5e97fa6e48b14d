//! Packet framing: converting between raw socket messages and packets.
//!
//! The wire format is as small as it gets:
//!
//! ```text
//! ┌────────┬──────────────────────────┐
//! │ opcode │ payload (0..n bytes)     │
//! │ 1 byte │                          │
//! └────────┴──────────────────────────┘
//! ```
//!
//! There is no length field. The WebSocket message boundary *is* the
//! packet boundary, which is why an empty message can't be interpreted:
//! there is no opcode to read.

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// One protocol message: an opcode plus its payload bytes.
///
/// Packets are immutable once built. The payload is owned, so a packet
/// stays valid after the buffer it was decoded from is reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Packet {
    opcode: u8,
    payload: Vec<u8>,
}

impl Packet {
    /// Creates a packet from an opcode and payload.
    pub fn new(opcode: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// Creates a packet with an empty payload.
    pub fn empty(opcode: u8) -> Self {
        Self::new(opcode, Vec::new())
    }

    /// The packet's opcode byte.
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// The packet's payload (everything after the opcode).
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Length of the framed form (`1 + payload.len()`).
    pub fn framed_len(&self) -> usize {
        1 + self.payload.len()
    }

    /// Frames this packet. See [`frame`].
    pub fn frame(&self) -> Vec<u8> {
        frame(self)
    }
}

/// Concatenates the opcode byte and the payload. Never fails.
pub fn frame(packet: &Packet) -> Vec<u8> {
    let mut out = Vec::with_capacity(packet.framed_len());
    out.push(packet.opcode);
    out.extend_from_slice(&packet.payload);
    out
}

/// Splits a raw message into opcode and payload.
///
/// A single byte yields a packet with an empty payload. The payload is
/// copied out of `data`.
///
/// # Errors
/// Returns [`ProtocolError::MalformedMessage`] if `data` is empty.
pub fn unframe(data: &[u8]) -> Result<Packet, ProtocolError> {
    let (&opcode, payload) =
        data.split_first().ok_or(ProtocolError::MalformedMessage)?;
    Ok(Packet::new(opcode, payload.to_vec()))
}
