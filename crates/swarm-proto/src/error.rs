// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

/// Decode-time failure for an inbound packet (spec §7, `MalformedPacket`).
///
/// Every variant is non-fatal: the caller drops the packet and moves on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtoError {
    /// Packet shorter than a type tag byte.
    #[error("packet has no type tag byte")]
    Empty,
    /// `packet_size` cannot hold even one slot (spec §8, B4).
    #[error("packet_size {packet_size} too small for one slot ({slot_len} bytes) at this lamport width")]
    PacketTooSmall {
        /// Configured packet size in bytes.
        packet_size: usize,
        /// Bytes one slot occupies at the configured Lamport width.
        slot_len: usize,
    },
    /// A slot was truncated by the end of the buffer.
    #[error("truncated slot at offset {offset}")]
    TruncatedSlot {
        /// Byte offset into the packet where the truncated slot starts.
        offset: usize,
    },
    /// Leading byte did not match a recognized packet type.
    #[error("unknown packet type tag {tag}")]
    UnknownType {
        /// The unrecognized type tag byte.
        tag: u8,
    },
}
