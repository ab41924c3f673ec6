// SPDX-License-Identifier: Apache-2.0
//! The swarmlist itself (spec §4.3): entries keyed by robot id, with O(1)
//! lookup by id and by position, a moving "next to send" cursor, and a
//! running count of active entries.

use std::collections::HashMap;

use tracing::{debug, trace};

use swarm_proto::{RobotId, SwarmMask};

use crate::clock::newer;
use crate::config::SwarmlistConfig;
use crate::entry::Entry;
use crate::error::CoreError;

/// Per-robot collection of beliefs about the swarm (spec §4.3).
pub struct Swarmlist {
    self_id: RobotId,
    cfg: SwarmlistConfig,
    entries: Vec<Entry>,
    index: HashMap<RobotId, usize>,
    next: usize,
    num_active: usize,
}

impl Swarmlist {
    /// `construct(self)`: empty collection, owner's entry present and
    /// active (spec §4.3).
    #[must_use]
    pub fn new(self_id: RobotId, self_mask: SwarmMask, cfg: SwarmlistConfig) -> Self {
        let mut sl = Self {
            self_id,
            cfg,
            entries: Vec::new(),
            index: HashMap::new(),
            next: 0,
            num_active: 0,
        };
        sl.apply_update(self_id, self_mask, 0);
        sl
    }

    /// This swarmlist's owner.
    #[must_use]
    pub const fn self_id(&self) -> RobotId {
        self.self_id
    }

    /// Number of entries currently stored.
    #[must_use]
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Number of entries for which `active(e)` currently holds.
    #[must_use]
    pub const fn num_active(&self) -> usize {
        self.num_active
    }

    /// Current "next to send" cursor.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.next
    }

    /// Lamport width this swarmlist was configured with (needed by the
    /// transmit/receive codec; everything else about [`SwarmlistConfig`]
    /// stays internal).
    #[must_use]
    pub const fn lamport_width(&self) -> swarm_proto::LamportWidth {
        self.cfg.lamport_width
    }

    /// O(1) lookup by robot id.
    #[must_use]
    pub fn get(&self, id: RobotId) -> Option<Entry> {
        self.index.get(&id).map(|&pos| self.entries[pos])
    }

    /// Iterate all entries in insertion order (for observability/logging).
    pub fn foreach(&self, mut visitor: impl FnMut(&Entry)) {
        for e in &self.entries {
            visitor(e);
        }
    }

    /// Overwrite the owner's own announced mask without touching
    /// freshness state (SPEC_FULL §5).
    pub fn set_self_mask(&mut self, mask: SwarmMask) {
        if let Some(&pos) = self.index.get(&self.self_id) {
            self.entries[pos].set_mask(mask);
        }
    }

    /// Apply an incoming observation for `id != self` through the
    /// freshness rule (spec §4.3). Self-observations are a no-op once the
    /// owner's entry exists, per spec; [`Self::new`] bypasses this check
    /// to create that entry in the first place.
    pub fn update(&mut self, id: RobotId, mask: SwarmMask, lamport: u32) {
        if id == self.self_id && self.index.contains_key(&id) {
            return;
        }
        self.apply_update(id, mask, lamport);
    }

    fn apply_update(&mut self, id: RobotId, mask: SwarmMask, lamport: u32) {
        let Some(&pos) = self.index.get(&id) else {
            // 1. No existing entry: create it.
            let pos = self.entries.len();
            self.entries.push(Entry::new(id, mask, lamport, self.cfg.tti_max));
            self.index.insert(id, pos);
            self.num_active += 1;
            trace!(robot = id, "swarmlist: created entry");
            return;
        };

        let entry = &mut self.entries[pos];
        if entry.is_active(self.self_id) {
            // 2. Existing, active: refresh only if strictly newer.
            if newer(lamport, entry.lamport(), self.cfg.lamport_threshold, self.cfg.lamport_width) {
                entry.refresh(mask, lamport, self.cfg.tti_max);
            }
        } else {
            // 3. Existing, inactive: reactivate on any change of lamport.
            if lamport != entry.lamport() {
                entry.refresh(mask, lamport, self.cfg.tti_max);
                self.num_active += 1;
                debug!(robot = id, "swarmlist: reactivated entry");
            }
        }
    }

    /// Entry at the cursor position, advancing the owner's own Lamport
    /// clock first if that's the entry being returned (spec §4.3, §9 —
    /// the self-lamport advance happens here rather than only in the
    /// transmit loop, satisfying "self-lamport advances on each
    /// self-entry transmission" regardless of caller).
    pub fn get_next(&mut self) -> Entry {
        let pos = self.next.min(self.entries.len().saturating_sub(1));
        let entry = &mut self.entries[pos];
        if entry.robot() == self.self_id {
            entry.increment_lamport(self.cfg.lamport_width);
        }
        *entry
    }

    /// Advance the cursor by one, wrapping modulo `size`.
    pub fn advance(&mut self) {
        if self.entries.is_empty() {
            self.next = 0;
        } else {
            self.next = (self.next + 1) % self.entries.len();
        }
    }

    /// Decrement every entry's `tti`; entries reaching zero become
    /// inactive. If removal is enabled, inactive entries' `ttr` also
    /// counts down and entries reaching zero are evicted.
    pub fn tick(&mut self) {
        let mut i = 0;
        while i < self.entries.len() {
            let was_active = self.entries[i].is_active(self.self_id);
            self.entries[i].tick_tti();
            let now_active = self.entries[i].is_active(self.self_id);

            if was_active && !now_active {
                self.num_active -= 1;
                debug!(robot = self.entries[i].robot(), "swarmlist: entry went inactive");
            }

            if !now_active && self.cfg.remove_old_entries {
                self.entries[i].tick_ttr(self.cfg.ttr_max);
                if self.entries[i].is_evictable() {
                    self.remove_at(i);
                    // Don't advance i: the swapped-in entry now occupies i.
                    continue;
                }
            }
            i += 1;
        }
    }

    /// Swap-remove the entry at `pos`, fixing the id→position map and
    /// patching the cursor so no entry is skipped on the next
    /// `get_next` (spec §4.3).
    fn remove_at(&mut self, pos: usize) {
        let removed_id = self.entries[pos].robot();
        let last = self.entries.len() - 1;

        self.entries.swap_remove(pos);
        self.index.remove(&removed_id);
        if pos != last {
            let moved_id = self.entries[pos].robot();
            self.index.insert(moved_id, pos);
        }

        if pos == self.next {
            // Cursor now points at what used to be the tail; leave it.
        } else if pos < self.next {
            self.next -= 1;
        }
        if self.next >= self.entries.len() {
            self.next = 0;
        }
    }

    /// Recompute and compare every universal invariant from spec §8
    /// (P1–P4). Never produced by `update`/`tick`/`remove`; exists for
    /// tests to assert the implementation never breaks them.
    ///
    /// # Errors
    /// Returns the first [`CoreError`] variant describing the violation
    /// found, if any.
    pub fn check_invariants(&self) -> Result<(), CoreError> {
        if self.index.len() != self.entries.len() {
            return Err(CoreError::IdMapInconsistent {
                robot: self.self_id,
                detail: "index length differs from entry count",
            });
        }
        for (id, &pos) in &self.index {
            if pos >= self.entries.len() || self.entries[pos].robot() != *id {
                return Err(CoreError::IdMapInconsistent {
                    robot: *id,
                    detail: "index position does not point back to this robot",
                });
            }
        }
        let actual_active = self
            .entries
            .iter()
            .filter(|e| e.is_active(self.self_id))
            .count();
        if actual_active != self.num_active {
            return Err(CoreError::ActiveCountMismatch {
                tracked: self.num_active,
                actual: actual_active,
            });
        }
        if !self.entries.is_empty() && self.next >= self.entries.len() {
            return Err(CoreError::CursorOutOfRange {
                next: self.next,
                size: self.entries.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;

    fn cfg() -> SwarmlistConfig {
        SwarmlistConfig::default()
    }

    #[test]
    fn construct_creates_active_self_entry() {
        let sl = Swarmlist::new(7, 0x01, cfg());
        assert_eq!(sl.size(), 1);
        assert_eq!(sl.num_active(), 1);
        let e = sl.get(7).expect("self entry present");
        assert!(e.is_active(7));
        sl.check_invariants().expect("invariants hold");
    }

    #[test]
    fn r3_double_construct_matches_single() {
        let a = Swarmlist::new(7, 0x01, cfg());
        let b = Swarmlist::new(7, 0x01, cfg());
        assert_eq!(a.size(), b.size());
        assert_eq!(a.num_active(), b.num_active());
        assert_eq!(a.get(7), b.get(7));
    }

    #[test]
    fn r2_idempotent_double_update() {
        let mut sl = Swarmlist::new(7, 0x01, cfg());
        sl.update(3, 0x02, 5);
        let after_first = sl.get(3);
        sl.update(3, 0x02, 5);
        assert_eq!(sl.get(3), after_first);
        assert_eq!(sl.num_active(), 2);
    }

    #[test]
    fn stale_update_on_active_entry_is_rejected() {
        let mut sl = Swarmlist::new(7, 0x01, cfg());
        sl.update(3, 0x01, 1);
        sl.update(3, 0x02, 1); // same lamport: not newer.
        assert_eq!(sl.get(3).expect("present").mask(), 0x01);
    }

    #[test]
    fn b1_entries_go_inactive_after_exactly_tti_max_ticks() {
        let mut sl = Swarmlist::new(7, 0x01, SwarmlistConfig {
            tti_max: 5,
            ..cfg()
        });
        sl.update(3, 0x01, 1);
        assert_eq!(sl.num_active(), 2);
        for _ in 0..4 {
            sl.tick();
            assert_eq!(sl.num_active(), 2, "still active before tti_max ticks");
        }
        sl.tick();
        assert_eq!(sl.num_active(), 1, "inactive after exactly tti_max ticks");
        assert!(sl.get(7).expect("self").is_active(7), "self stays active");
    }

    #[test]
    fn b2_removal_survives_tti_max_plus_ttr_max_ticks() {
        let mut sl = Swarmlist::new(7, 0x01, SwarmlistConfig {
            tti_max: 3,
            remove_old_entries: true,
            ttr_max: 2,
            ..cfg()
        });
        sl.update(3, 0x01, 1);
        for _ in 0..(3 + 2) {
            assert!(sl.get(3).is_some(), "entry must survive tti_max + ttr_max ticks");
            sl.tick();
        }
        assert!(sl.get(3).is_none(), "entry evicted after tti_max + ttr_max ticks");
        sl.check_invariants().expect("invariants hold after eviction");
    }

    #[test]
    fn removal_patches_cursor_past_removed_slot() {
        let mut sl = Swarmlist::new(1, 0, SwarmlistConfig {
            tti_max: 1,
            remove_old_entries: true,
            ttr_max: 1,
            ..cfg()
        });
        sl.update(2, 0, 1);
        sl.update(3, 0, 1);
        sl.update(4, 0, 1);
        // cursor starts at 0 (self); move it onto robot 2's slot.
        sl.advance();
        assert_eq!(sl.cursor(), 1);

        for _ in 0..2 {
            sl.tick();
        }
        sl.check_invariants().expect("invariants hold after eviction");
        assert!(sl.cursor() < sl.size().max(1));
    }

    #[test]
    fn inactive_reactivation_scenario_6() {
        let mut sl = Swarmlist::new(3, 0x00, cfg());
        sl.update(7, 0x01, 1);
        for _ in 0..255 {
            sl.tick();
        }
        assert_eq!(sl.num_active(), 1);
        assert!(!sl.get(7).expect("still present").is_active(3));

        sl.update(7, 0x01, 2);
        assert_eq!(sl.num_active(), 2);
        let e = sl.get(7).expect("reactivated");
        assert_eq!(e.tti(), u8::MAX);
    }

    #[test]
    fn set_self_mask_overwrites_without_touching_freshness() {
        let mut sl = Swarmlist::new(7, 0x01, cfg());
        sl.tick();
        let before = sl.get(7).expect("self entry present");

        sl.set_self_mask(0x42);

        let after = sl.get(7).expect("self entry present");
        assert_eq!(after.mask(), 0x42);
        assert_eq!(after.lamport(), before.lamport());
        assert_eq!(after.tti(), before.tti());
        assert!(after.is_active(7));
    }

    #[test]
    fn set_self_mask_does_not_touch_other_entries() {
        let mut sl = Swarmlist::new(7, 0x01, cfg());
        sl.update(3, 0x02, 1);

        sl.set_self_mask(0x99);

        assert_eq!(sl.get(3).expect("present").mask(), 0x02);
    }

    #[test]
    fn p4_cursor_stays_in_range_after_advance() {
        let mut sl = Swarmlist::new(1, 0, cfg());
        sl.update(2, 0, 1);
        sl.update(3, 0, 1);
        for _ in 0..10 {
            sl.advance();
            assert!(sl.cursor() < sl.size());
        }
    }
}
