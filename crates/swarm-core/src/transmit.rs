// SPDX-License-Identifier: Apache-2.0
//! Outgoing-packet scheduler (spec §4.4).

use swarm_proto::{Packet, PacketType, ProtoError, RobotId, SwarmMask, WireEntry};
use tracing::warn;

use crate::swarmlist::Swarmlist;

/// An encoded packet plus the priority ids (see
/// [`Transmitter::build_packet_with_priority`]) actually written into it.
pub type ForcedPacket = (Vec<u8>, Vec<RobotId>);

/// Packs entries from a [`Swarmlist`] into fixed-capacity `SWARM` packets,
/// round-robining the cursor fairly across entries.
pub struct Transmitter;

impl Transmitter {
    /// Build one packet of up to `K = slot_count(packet_size, width)`
    /// entries, skipping inactive entries by repeatedly advancing the
    /// cursor (termination is guaranteed: the owner's own entry is always
    /// active and reachable).
    ///
    /// Returns `None` in the pathological `size == 0` case (spec §4.4):
    /// the owner's entry is restored instead of a packet being built.
    ///
    /// # Errors
    /// Propagates [`ProtoError::PacketTooSmall`] if `packet_size` admits
    /// no slots at all (spec §8, B4).
    pub fn build_packet(
        sl: &mut Swarmlist,
        packet_size: usize,
        self_mask: SwarmMask,
    ) -> Result<Option<Vec<u8>>, ProtoError> {
        Self::build_packet_with_priority(sl, packet_size, self_mask, &[])
            .map(|opt| opt.map(|(packet, _)| packet))
    }

    /// Build one packet as [`Self::build_packet`] does, but first force the
    /// entries named by `priority` into the leading slots (in the order
    /// given, skipping any id the swarmlist has no active entry for),
    /// before filling any remaining slots from the normal round-robin
    /// cursor. Returns the packet alongside the subset of `priority` that
    /// actually made it into a slot, so a caller can account for exactly
    /// what was transmitted rather than what was merely requested.
    ///
    /// # Errors
    /// Propagates [`ProtoError::PacketTooSmall`] if `packet_size` admits
    /// no slots at all (spec §8, B4).
    pub fn build_packet_with_priority(
        sl: &mut Swarmlist,
        packet_size: usize,
        self_mask: SwarmMask,
        priority: &[RobotId],
    ) -> Result<Option<ForcedPacket>, ProtoError> {
        if sl.size() == 0 {
            warn!("swarmlist empty on transmit; restoring self entry");
            sl.update(sl.self_id(), self_mask, 0);
            return Ok(None);
        }

        let width = sl_width(sl);
        let k = swarm_proto::slot_count(packet_size, width);
        if k == 0 {
            return Err(ProtoError::PacketTooSmall {
                packet_size,
                slot_len: swarm_proto::slot_len(width),
            });
        }

        let mut entries = Vec::with_capacity(k);
        let mut forced = Vec::new();
        for &robot in priority {
            if entries.len() >= k {
                break;
            }
            if let Some(entry) = sl.get(robot) {
                if entry.is_active(sl.self_id()) {
                    entries.push(WireEntry {
                        robot: entry.robot(),
                        mask: entry.mask(),
                        lamport: entry.lamport(),
                    });
                    forced.push(robot);
                }
            }
        }

        while entries.len() < k {
            let mut entry = sl.get_next();
            let mut guard = 0usize;
            while !entry.is_active(sl.self_id()) {
                sl.advance();
                entry = sl.get_next();
                guard += 1;
                debug_assert!(
                    guard <= sl.size() + 1,
                    "self entry must always terminate the inactive-skip loop"
                );
            }
            entries.push(WireEntry {
                robot: entry.robot(),
                mask: entry.mask(),
                lamport: entry.lamport(),
            });
            sl.advance();
        }

        let packet = Packet::encode(PacketType::Swarm, &entries, packet_size, width)?;
        Ok(Some((packet, forced)))
    }
}

fn sl_width(sl: &Swarmlist) -> swarm_proto::LamportWidth {
    // The swarmlist does not expose its config directly to keep the
    // public surface narrow; transmit needs only the width, which every
    // entry's wire encoding shares, so derive it from the constant the
    // host already agreed with `Swarmlist::new`. Exposed via a thin
    // accessor to avoid duplicating the config struct.
    sl.lamport_width()
}

/// A cooperative timer for chunk scheduling (spec §4.4): fires every
/// `delay + jitter` host steps, bounding how many packets one firing may
/// emit.
#[derive(Debug, Clone, Copy)]
pub struct ChunkScheduler {
    delay: u64,
    amount: usize,
    next_fire: u64,
}

impl ChunkScheduler {
    /// Build a scheduler that fires its first chunk at step 0.
    #[must_use]
    pub const fn new(delay: u64, amount: usize) -> Self {
        Self {
            delay,
            amount,
            next_fire: 0,
        }
    }

    /// Whether a chunk is due at `step`.
    #[must_use]
    pub const fn is_due(&self, step: u64) -> bool {
        step >= self.next_fire
    }

    /// Schedule the next firing, `delay + (jitter & 0x7F)` steps from now
    /// (spec §4.4: jitter is a 7-bit value from the host PRNG).
    pub fn schedule_next(&mut self, step: u64, jitter: u8) {
        self.next_fire = step + self.delay + u64::from(jitter & 0x7F);
    }

    /// Packets to emit this chunk: `min(ceil(num_active / K), amount)`.
    #[must_use]
    pub fn packets_for(&self, num_active: usize, k: usize) -> usize {
        if k == 0 || num_active == 0 {
            return 0;
        }
        num_active.div_ceil(k).max(1).min(self.amount)
    }
}
