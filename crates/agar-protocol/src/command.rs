//! Outbound packets: player commands and the connection handshake.

use serde::{Deserialize, Serialize};

use crate::{ClientOpcode, Packet, INIT1_MAGIC};

/// A player intent, queued by the caller and sent to the server.
///
/// Commands from one caller reach the wire in the order they were
/// submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Spawn into the arena with the given nickname.
    Spawn { name: String },
    /// Watch the game without playing.
    Spectate,
    /// Steer towards a point in world coordinates.
    SetDirection { x: f64, y: f64 },
    /// Split every owned cell.
    Split,
    /// The `Q` key (toggles spectator free-roam on the server).
    Q,
    /// Mark the player as away.
    Afk,
    /// Explode owned cells.
    Explode,
    /// Eject a small amount of mass.
    EjectMass,
    /// Any packet not covered above, sent as-is.
    Raw(Packet),
}

impl Command {
    /// Builds the packet for this command.
    pub fn to_packet(&self) -> Packet {
        match self {
            Self::Spawn { name } => {
                Packet::new(ClientOpcode::SpawnWithName.as_u8(), name.as_bytes())
            }
            Self::Spectate => Packet::empty(ClientOpcode::StartSpectating.as_u8()),
            Self::SetDirection { x, y } => {
                // x, y, then a blob id the server ignores for single-cell
                // steering.
                let mut payload = Vec::with_capacity(20);
                payload.extend_from_slice(&x.to_le_bytes());
                payload.extend_from_slice(&y.to_le_bytes());
                payload.extend_from_slice(&0u32.to_le_bytes());
                Packet::new(ClientOpcode::SetDirection.as_u8(), payload)
            }
            Self::Split => Packet::empty(ClientOpcode::Split.as_u8()),
            Self::Q => Packet::empty(ClientOpcode::Q.as_u8()),
            Self::Afk => Packet::empty(ClientOpcode::Afk.as_u8()),
            Self::Explode => Packet::empty(ClientOpcode::Explode.as_u8()),
            Self::EjectMass => Packet::empty(ClientOpcode::EjectMass.as_u8()),
            Self::Raw(packet) => packet.clone(),
        }
    }
}

impl From<Command> for Packet {
    fn from(command: Command) -> Self {
        match command {
            Command::Raw(packet) => packet,
            other => other.to_packet(),
        }
    }
}

impl Packet {
    /// First handshake packet: opcode 254 with the fixed marker `5`.
    pub fn init1() -> Self {
        Self::new(ClientOpcode::Init1.as_u8(), INIT1_MAGIC.to_le_bytes())
    }

    /// Second handshake packet: opcode 255 with the server version.
    pub fn init2(server_version: u32) -> Self {
        Self::new(ClientOpcode::Init2.as_u8(), server_version.to_le_bytes())
    }

    /// Third handshake packet: opcode 80 with the UTF-8 token, no
    /// terminator.
    pub fn connection_token(token: &str) -> Self {
        Self::new(ClientOpcode::ConnectionToken.as_u8(), token.as_bytes())
    }
}
