//! Decoders for server payloads.
//!
//! Everything here is a pure function over a payload slice. Decoders
//! never touch the socket or the world; they return structures for the
//! caller to apply.
//!
//! Every multi-byte read goes through [`PayloadReader`], which checks the
//! remaining length before consuming anything. A short payload yields
//! [`ProtocolError::TruncatedPayload`] instead of reading garbage.

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Flag bit: four opaque bytes follow the fixed update fields.
///
/// Only some protocol variants send this field and its meaning is not
/// known, so it is skipped without interpretation.
pub const FLAG_OPAQUE_EXTRA: u8 = 0x02;

/// Flag bit: a 1-byte-length-prefixed skin URL follows.
pub const FLAG_HAS_SKIN: u8 = 0x04;

// ---------------------------------------------------------------------------
// Decoded types
// ---------------------------------------------------------------------------

/// Playable area, as announced by a `GameAreaSize` packet.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl WorldBounds {
    /// Width of the area (`max_x - min_x`).
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the area (`max_y - min_y`).
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// One entity consumed another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EatEvent {
    pub eater_id: u32,
    pub victim_id: u32,
}

/// Current state of one entity.
///
/// `entity_id` is never zero: zero terminates the update list on the
/// wire and is not decoded as a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub entity_id: u32,
    pub x: u32,
    pub y: u32,
    pub radius: u16,
    pub color: (u8, u8, u8),
    pub flags: u8,
    pub skin_url: Option<String>,
    pub name: String,
}

/// The three sections of a `WorldUpdate` packet, in wire order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorldUpdate {
    pub eats: Vec<EatEvent>,
    pub updates: Vec<UpdateEvent>,
    pub removals: Vec<u32>,
}

// ---------------------------------------------------------------------------
// PayloadReader
// ---------------------------------------------------------------------------

/// A bounds-checked little-endian cursor over a payload.
#[derive(Debug, Clone)]
pub struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    /// Starts reading `data` at offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current cursor offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Consumes exactly `n` bytes.
    ///
    /// # Errors
    /// [`ProtocolError::TruncatedPayload`] if fewer than `n` remain. The
    /// cursor does not move on failure.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::TruncatedPayload {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Skips `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), ProtocolError> {
        self.take(n).map(|_| ())
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16, ProtocolError> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn u32(&mut self) -> Result<u32, ProtocolError> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn f64(&mut self) -> Result<f64, ProtocolError> {
        self.array().map(f64::from_le_bytes)
    }

    /// Reads a string with a 1-byte length prefix (length in bytes).
    pub fn string_u8(&mut self) -> Result<String, ProtocolError> {
        let len = usize::from(self.u8()?);
        self.utf8(len)
    }

    /// Reads a string with a 2-byte length prefix (length in bytes).
    pub fn string_u16(&mut self) -> Result<String, ProtocolError> {
        let len = usize::from(self.u16()?);
        self.utf8(len)
    }

    // Names come from other players, so invalid UTF-8 is replaced rather
    // than rejected.
    fn utf8(&mut self, len: usize) -> Result<String, ProtocolError> {
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

// ---------------------------------------------------------------------------
// Message decoders
// ---------------------------------------------------------------------------

/// Decodes a `GameAreaSize` payload: four `f64`s at offsets 0, 8, 16, 24.
///
/// Bytes past offset 32 are ignored.
///
/// # Errors
/// [`ProtocolError::TruncatedPayload`] if the payload is shorter than
/// 32 bytes.
pub fn decode_game_area_size(payload: &[u8]) -> Result<WorldBounds, ProtocolError> {
    let mut r = PayloadReader::new(payload);
    Ok(WorldBounds {
        min_x: r.f64()?,
        min_y: r.f64()?,
        max_x: r.f64()?,
        max_y: r.f64()?,
    })
}

/// Decodes a `WorldUpdate` payload.
///
/// Layout, read left to right with one cursor:
///
/// ```text
/// eats:     u16 n, then n × { eater u32, victim u32 }   (record i at 2 + 8i)
/// updates:  { id u32 ≠ 0, x u32, y u32, radius u16, r g b u8, flags u8,
///             [4 opaque bytes if flags & 0x02],
///             [u8 len + skin url if flags & 0x04],
///             u16 len + name }*  terminated by id = 0
/// removals: u32 n, then n × id u32
/// ```
///
/// # Errors
/// [`ProtocolError::TruncatedPayload`] if any section runs off the end.
pub fn decode_world_update(payload: &[u8]) -> Result<WorldUpdate, ProtocolError> {
    let mut r = PayloadReader::new(payload);

    let eat_count = r.u16()?;
    let mut eats = Vec::with_capacity(usize::from(eat_count).min(r.remaining() / 8));
    for _ in 0..eat_count {
        eats.push(EatEvent {
            eater_id: r.u32()?,
            victim_id: r.u32()?,
        });
    }

    let mut updates = Vec::new();
    while let Some(update) = read_update(&mut r)? {
        updates.push(update);
    }

    let removal_count = r.u32()?;
    // Cap the preallocation; a hostile count can't exceed what's left.
    let capacity = (removal_count as usize).min(r.remaining() / 4);
    let mut removals = Vec::with_capacity(capacity);
    for _ in 0..removal_count {
        removals.push(r.u32()?);
    }

    Ok(WorldUpdate {
        eats,
        updates,
        removals,
    })
}

/// Reads one update record, or `None` on the zero-id sentinel.
fn read_update(
    r: &mut PayloadReader<'_>,
) -> Result<Option<UpdateEvent>, ProtocolError> {
    let entity_id = r.u32()?;
    if entity_id == 0 {
        return Ok(None);
    }

    let x = r.u32()?;
    let y = r.u32()?;
    let radius = r.u16()?;
    let color = (r.u8()?, r.u8()?, r.u8()?);
    let flags = r.u8()?;

    if flags & FLAG_OPAQUE_EXTRA != 0 {
        r.skip(4)?;
    }
    let skin_url = if flags & FLAG_HAS_SKIN != 0 {
        Some(r.string_u8()?)
    } else {
        None
    };
    let name = r.string_u16()?;

    Ok(Some(UpdateEvent {
        entity_id,
        x,
        y,
        radius,
        color,
        flags,
        skin_url,
        name,
    }))
}

/// Decodes an `OwnsEntity` payload: the id of a cell this client controls.
///
/// # Errors
/// [`ProtocolError::TruncatedPayload`] if fewer than 4 bytes are present.
pub fn decode_owns_entity(payload: &[u8]) -> Result<u32, ProtocolError> {
    PayloadReader::new(payload).u32()
}
