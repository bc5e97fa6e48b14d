//! Opcode tables for both directions of the protocol.
//!
//! The numeric values are contractual: the server speaks these exact
//! bytes. Opcodes the client doesn't know about are not an error, which
//! is why [`ServerOpcode::from_u8`] returns an `Option`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Payload of the first initialization packet (`Init1`).
pub const INIT1_MAGIC: u32 = 5;

/// Protocol version the client announces in the `Init2` packet.
pub const SERVER_VERSION: u32 = 154_669_603;

/// Opcodes sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ClientOpcode {
    SpawnWithName = 0,
    StartSpectating = 1,
    SetDirection = 16,
    Split = 17,
    Q = 18,
    Afk = 19,
    Explode = 20,
    EjectMass = 21,
    ConnectionToken = 80,
    LoginIdentifier = 81,
    Init1 = 254,
    Init2 = 255,
}

impl ClientOpcode {
    /// The opcode's wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Opcodes sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ServerOpcode {
    WorldUpdate = 16,
    ViewUpdate = 17,
    Reset = 20,
    DrawDebugLine = 21,
    OwnsEntity = 32,
    FfaLeaderboard = 49,
    TeamLeaderboard = 50,
    GameAreaSize = 64,
    Hello = b'H',
    MessageLength = 240,
}

impl ServerOpcode {
    /// Looks up a server opcode by its wire value.
    ///
    /// Returns `None` for opcodes this client doesn't recognize.
    pub fn from_u8(value: u8) -> Option<Self> {
        let opcode = match value {
            16 => Self::WorldUpdate,
            17 => Self::ViewUpdate,
            20 => Self::Reset,
            21 => Self::DrawDebugLine,
            32 => Self::OwnsEntity,
            49 => Self::FfaLeaderboard,
            50 => Self::TeamLeaderboard,
            64 => Self::GameAreaSize,
            b'H' => Self::Hello,
            240 => Self::MessageLength,
            _ => return None,
        };
        Some(opcode)
    }

    /// The opcode's wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ClientOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}({})", self.as_u8())
    }
}

impl fmt::Display for ServerOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}({})", self.as_u8())
    }
}
