// SPDX-License-Identifier: Apache-2.0
//! Host-visible swarmlist configuration (spec §6).

use swarm_proto::LamportWidth;

/// Tunables the engine requires from the host at construction. All of the
/// options spec §6 lists as "host-visible configuration" except
/// `packet_size`/`swarm_chunk_*`, which belong to the transmit scheduler
/// ([`crate::ChunkScheduler`]) rather than the swarmlist itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwarmlistConfig {
    /// Ticks of inactivity before an entry becomes inactive.
    pub tti_max: u8,
    /// Whether the `ttr` eviction stage runs at all.
    pub remove_old_entries: bool,
    /// Ticks an inactive entry survives before eviction (ignored unless
    /// `remove_old_entries`).
    pub ttr_max: u8,
    /// `T` for the circular Lamport comparison.
    pub lamport_threshold: u32,
    /// Width of the Lamport counter.
    pub lamport_width: LamportWidth,
}

impl Default for SwarmlistConfig {
    fn default() -> Self {
        Self {
            tti_max: u8::MAX,
            remove_old_entries: false,
            ttr_max: u8::MAX,
            lamport_threshold: 50,
            lamport_width: LamportWidth::Eight,
        }
    }
}
