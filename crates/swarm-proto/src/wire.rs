// SPDX-License-Identifier: Apache-2.0
//! Fixed-size packet framing for swarm packets (spec §6).
//!
//! Layout (little-endian, stabilized per spec §9's design note on raw
//! struct-punning):
//!
//! ```text
//! offset 0:        type tag (0 = empty/idle, 1 = SWARM)
//! offset 1 + i*S:  slot i, for i in [0, K)
//!   [0..4)         robot id   (u32, LE)
//!   [4]            swarm mask (u8)
//!   [5..5+W)       lamport    (u8 or u32, LE)
//! ```
//!
//! `K = (packet_size - 1) / S`. Bytes beyond `1 + K*S` are reserved: zero
//! on send, ignored on receive.

use tracing::warn;

use crate::{LamportWidth, ProtoError, RobotId, SwarmMask};

/// Leading type byte of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// Idle/empty frame; slots are ignored.
    Empty,
    /// Carries up to `K` swarmlist entries.
    Swarm,
}

impl PacketType {
    const fn tag(self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Swarm => 1,
        }
    }

    const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Empty),
            1 => Some(Self::Swarm),
            _ => None,
        }
    }
}

/// One decoded (or to-be-encoded) swarmlist observation, wire-level only:
/// no freshness/activity semantics attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireEntry {
    /// Robot identifier.
    pub robot: RobotId,
    /// Opaque application payload.
    pub mask: SwarmMask,
    /// Lamport counter value, widened to `u32` regardless of wire width.
    pub lamport: u32,
}

/// A fixed-capacity swarm packet: a type tag plus up to `K` entry slots.
pub struct Packet;

impl Packet {
    /// Encode `entries` into a `packet_size`-byte buffer. At most
    /// `slot_count(packet_size, width)` entries are packed; extra entries
    /// beyond that are dropped by the caller's own slicing. Unused slots
    /// are zero-filled.
    ///
    /// # Errors
    /// Returns [`ProtoError::PacketTooSmall`] if `packet_size` cannot hold
    /// even one slot at `width` (spec §8, B4).
    pub fn encode(
        kind: PacketType,
        entries: &[WireEntry],
        packet_size: usize,
        width: LamportWidth,
    ) -> Result<Vec<u8>, ProtoError> {
        let slot_len = crate::slot_len(width);
        let k = crate::slot_count(packet_size, width);
        if k == 0 {
            warn!(packet_size, slot_len, "packet_size too small to hold a slot");
            return Err(ProtoError::PacketTooSmall {
                packet_size,
                slot_len,
            });
        }
        let mut buf = vec![0u8; packet_size];
        buf[0] = kind.tag();
        for (i, entry) in entries.iter().take(k).enumerate() {
            let off = 1 + i * slot_len;
            buf[off..off + 4].copy_from_slice(&entry.robot.to_le_bytes());
            buf[off + 4] = entry.mask;
            let lamport_bytes = entry.lamport.to_le_bytes();
            buf[off + 5..off + 5 + width.byte_len()]
                .copy_from_slice(&lamport_bytes[..width.byte_len()]);
        }
        Ok(buf)
    }

    /// Decode a packet framed at `packet_size` bytes / `width` Lamport
    /// width, reading exactly the `K = slot_count(packet_size, width)`
    /// slots that framing implies. Bytes beyond `1 + K*slot_len` are
    /// reserved and ignored.
    ///
    /// # Errors
    /// Returns [`ProtoError::Empty`] on a zero-length buffer,
    /// [`ProtoError::PacketTooSmall`] if `packet_size` admits no slots,
    /// [`ProtoError::TruncatedSlot`] if `bytes` is shorter than the framed
    /// slot region, or [`ProtoError::UnknownType`] on an unrecognized tag.
    pub fn decode(
        bytes: &[u8],
        packet_size: usize,
        width: LamportWidth,
    ) -> Result<(PacketType, Vec<WireEntry>), ProtoError> {
        let tag = *bytes.first().ok_or_else(|| {
            warn!("decode: empty buffer");
            ProtoError::Empty
        })?;
        let kind = PacketType::from_tag(tag).ok_or_else(|| {
            warn!(tag, "decode: unrecognized packet type tag");
            ProtoError::UnknownType { tag }
        })?;

        let slot_len = crate::slot_len(width);
        let k = crate::slot_count(packet_size, width);
        if k == 0 {
            warn!(packet_size, slot_len, "packet_size too small to hold a slot");
            return Err(ProtoError::PacketTooSmall {
                packet_size,
                slot_len,
            });
        }

        let mut entries = Vec::with_capacity(k);
        for i in 0..k {
            let off = 1 + i * slot_len;
            if off + slot_len > bytes.len() {
                warn!(offset = off, len = bytes.len(), "decode: truncated slot");
                return Err(ProtoError::TruncatedSlot { offset: off });
            }
            let robot = RobotId::from_le_bytes([
                bytes[off],
                bytes[off + 1],
                bytes[off + 2],
                bytes[off + 3],
            ]);
            let mask = bytes[off + 4];
            let mut lamport_bytes = [0u8; 4];
            lamport_bytes[..width.byte_len()]
                .copy_from_slice(&bytes[off + 5..off + 5 + width.byte_len()]);
            let lamport = u32::from_le_bytes(lamport_bytes);
            entries.push(WireEntry {
                robot,
                mask,
                lamport,
            });
        }
        Ok((kind, entries))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;

    fn sample_entries() -> Vec<WireEntry> {
        vec![
            WireEntry {
                robot: 7,
                mask: 0x01,
                lamport: 1,
            },
            WireEntry {
                robot: 3,
                mask: 0x02,
                lamport: 250,
            },
        ]
    }

    #[test]
    fn round_trip_identity_eight_bit() {
        // R1: encode then decode yields the same (robot, mask, lamport).
        let entries = sample_entries();
        let packet_size = 1 + entries.len() * crate::slot_len(LamportWidth::Eight);
        let encoded = Packet::encode(
            PacketType::Swarm,
            &entries,
            packet_size,
            LamportWidth::Eight,
        )
        .expect("encode");
        let (kind, decoded) =
            Packet::decode(&encoded, packet_size, LamportWidth::Eight).expect("decode");
        assert_eq!(kind, PacketType::Swarm);
        assert_eq!(decoded, entries);
    }

    #[test]
    fn round_trip_identity_thirty_two_bit() {
        let entries = sample_entries();
        let packet_size = 1 + entries.len() * crate::slot_len(LamportWidth::ThirtyTwo);
        let encoded = Packet::encode(
            PacketType::Swarm,
            &entries,
            packet_size,
            LamportWidth::ThirtyTwo,
        )
        .expect("encode");
        let (_, decoded) =
            Packet::decode(&encoded, packet_size, LamportWidth::ThirtyTwo).expect("decode");
        assert_eq!(decoded, entries);
    }

    #[test]
    fn unused_slots_are_zero_filled_and_parsed() {
        let entries = sample_entries();
        let packet_size = 1 + 4 * crate::slot_len(LamportWidth::Eight);
        let encoded = Packet::encode(
            PacketType::Swarm,
            &entries,
            packet_size,
            LamportWidth::Eight,
        )
        .expect("encode");
        let (_, decoded) =
            Packet::decode(&encoded, packet_size, LamportWidth::Eight).expect("decode");
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded[2].robot, 0);
        assert_eq!(decoded[2].mask, 0);
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let entries = sample_entries();
        let packet_size = 1 + entries.len() * crate::slot_len(LamportWidth::Eight);
        let encoded = Packet::encode(
            PacketType::Swarm,
            &entries,
            packet_size,
            LamportWidth::Eight,
        )
        .expect("encode");
        let short = &encoded[..encoded.len() - 1];
        assert!(matches!(
            Packet::decode(short, packet_size, LamportWidth::Eight),
            Err(ProtoError::TruncatedSlot { .. })
        ));
    }

    #[test]
    fn unknown_type_tag_is_rejected() {
        let mut buf = vec![0u8; 10];
        buf[0] = 0xFF;
        assert!(matches!(
            Packet::decode(&buf, 10, LamportWidth::Eight),
            Err(ProtoError::UnknownType { tag: 0xFF })
        ));
    }

    #[test]
    fn packet_size_too_small_is_rejected_b4() {
        // B4: packet_size too small to hold a single slot fails deterministically.
        assert!(matches!(
            Packet::encode(PacketType::Swarm, &[], 1, LamportWidth::ThirtyTwo),
            Err(ProtoError::PacketTooSmall { .. })
        ));
        assert!(matches!(
            Packet::decode(&[0u8], 1, LamportWidth::ThirtyTwo),
            Err(ProtoError::PacketTooSmall { .. })
        ));
    }

    #[test]
    fn literal_byte_layout_matches_scenario_1() {
        // spec scenario 1: packet_size=10, 8-bit lamport, one slot holding
        // {robot=7, mask=0x01, lamport=1}. Spelled as a hex literal so the
        // wire layout (tag, robot LE, mask, lamport, zero-filled tail) is
        // visible at a glance rather than reconstructed from field values.
        let expected = hex::decode("01070000000101000000").expect("valid hex literal");

        let entries = vec![WireEntry {
            robot: 7,
            mask: 0x01,
            lamport: 1,
        }];
        let encoded =
            Packet::encode(PacketType::Swarm, &entries, 10, LamportWidth::Eight).expect("encode");
        assert_eq!(hex::encode(&encoded), hex::encode(&expected));

        let (kind, decoded) =
            Packet::decode(&expected, 10, LamportWidth::Eight).expect("decode");
        assert_eq!(kind, PacketType::Swarm);
        assert_eq!(decoded, entries);
    }

    #[test]
    fn empty_buffer_is_rejected() {
        assert!(matches!(
            Packet::decode(&[], 10, LamportWidth::Eight),
            Err(ProtoError::Empty)
        ));
    }
}
