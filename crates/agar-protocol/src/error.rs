//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. A
//! `ProtocolError` always means the bytes themselves were wrong, never
//! that the network or the world store misbehaved.

/// Errors that can occur while framing or decoding packets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A raw socket message had zero bytes, so there is no opcode to read.
    ///
    /// The framing has no resync marker, so the session cannot recover
    /// from this and should be closed.
    #[error("malformed message: empty frame has no opcode")]
    MalformedMessage,

    /// A decoder tried to read past the end of a payload.
    ///
    /// The offending packet is discarded; later packets are unaffected.
    #[error(
        "truncated payload: needed {needed} byte(s) at offset {offset}, \
         only {remaining} remaining"
    )]
    TruncatedPayload {
        /// Cursor position where the read was attempted.
        offset: usize,
        /// Bytes the read required.
        needed: usize,
        /// Bytes actually left in the payload.
        remaining: usize,
    },
}
