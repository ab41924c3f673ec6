// SPDX-License-Identifier: Apache-2.0
//! Per-robot swarmlist record (spec §4.2).

use swarm_proto::{LamportWidth, RobotId, SwarmMask};

/// A single belief about one robot: identity, opaque payload, freshness,
/// and the two aging timers that govern activity and eviction.
///
/// `robot` is immutable once assigned. No method here reads or writes
/// swarmlist-wide state (`num_active`, the cursor, the id→position map);
/// those invariants are the [`crate::Swarmlist`]'s responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    robot: RobotId,
    mask: SwarmMask,
    lamport: u32,
    tti: u8,
    ttr: Option<u8>,
}

impl Entry {
    /// Construct a freshly observed entry; its inactivity timer starts at
    /// `tti_max`.
    #[must_use]
    pub const fn new(robot: RobotId, mask: SwarmMask, lamport: u32, tti_max: u8) -> Self {
        Self {
            robot,
            mask,
            lamport,
            tti: tti_max,
            ttr: None,
        }
    }

    /// Robot this entry describes.
    #[must_use]
    pub const fn robot(&self) -> RobotId {
        self.robot
    }

    /// Opaque application payload.
    #[must_use]
    pub const fn mask(&self) -> SwarmMask {
        self.mask
    }

    /// Stored Lamport counter value.
    #[must_use]
    pub const fn lamport(&self) -> u32 {
        self.lamport
    }

    /// Ticks remaining before this entry becomes inactive.
    #[must_use]
    pub const fn tti(&self) -> u8 {
        self.tti
    }

    /// Ticks remaining before an inactive entry is evicted, if the
    /// removal stage is enabled and counting down.
    #[must_use]
    pub const fn ttr(&self) -> Option<u8> {
        self.ttr
    }

    /// `active(e) ≡ (e.tti > 0) ∨ (e.robot == self)` (spec §3).
    #[must_use]
    pub const fn is_active(&self, self_id: RobotId) -> bool {
        self.tti > 0 || self.robot == self_id
    }

    /// Overwrite payload and lamport, and reset the inactivity timer. Used
    /// by the update rule's refresh/reactivate branches.
    pub fn refresh(&mut self, mask: SwarmMask, lamport: u32, tti_max: u8) {
        self.mask = mask;
        self.lamport = lamport;
        self.tti = tti_max;
        self.ttr = None;
    }

    /// Decrement `tti` by one tick, saturating at zero.
    pub fn tick_tti(&mut self) {
        self.tti = self.tti.saturating_sub(1);
    }

    /// Begin (or continue) the removal countdown. The first call (made on
    /// the tick an entry goes inactive) sets the timer to `ttr_max`
    /// without decrementing it; every call thereafter decrements by one.
    /// This way an entry spends exactly `ttr_max` further ticks inactive
    /// before `is_evictable` (spec §8, B2).
    pub fn tick_ttr(&mut self, ttr_max: u8) {
        self.ttr = Some(match self.ttr {
            None => ttr_max,
            Some(t) => t.saturating_sub(1),
        });
    }

    /// `true` once the removal countdown has reached zero.
    #[must_use]
    pub fn is_evictable(&self) -> bool {
        self.ttr == Some(0)
    }

    /// Advance the owner's own Lamport clock by one (wrapping at `width`).
    /// Only ever called on the entry whose `robot == self`.
    pub fn increment_lamport(&mut self, width: LamportWidth) {
        self.lamport = crate::clock::increment(self.lamport, width);
    }

    /// Overwrite the payload byte without touching freshness state. Lets a
    /// host update its own announced mask between transmits (spec
    /// SPEC_FULL §5).
    pub fn set_mask(&mut self, mask: SwarmMask) {
        self.mask = mask;
    }
}
