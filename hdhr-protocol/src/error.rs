//! Error types for the HDHomeRun discovery protocol.

use thiserror::Error;

/// Errors raised while decoding a discovery packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Packet is shorter than its header.
    #[error("Packet too short: {0} bytes")]
    TooShort(usize),

    /// Header announces more payload than was received.
    #[error("Incomplete packet: expected {expected} payload bytes, got {actual}")]
    IncompletePacket { expected: usize, actual: usize },

    /// A TLV record runs past the end of the payload.
    #[error("Truncated TLV record for tag 0x{0:02X}")]
    TruncatedTag(u8),

    /// Packet type is not a discover reply.
    #[error("Unexpected packet type: 0x{0:04X}")]
    UnexpectedType(u16),
}
