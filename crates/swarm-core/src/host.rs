// SPDX-License-Identifier: Apache-2.0
//! Host interface contract (spec §4.6).
//!
//! The engine requires only identity, a step counter, and a source of
//! randomness from its host; sending and receiving bytes is left to the
//! caller (host daemon / test harness) rather than baked into this trait,
//! since the wire transport is explicitly out of scope (spec §1).

use swarm_proto::RobotId;

/// What the membership engine needs from its embedding host.
pub trait Host {
    /// This robot's identifier, assigned before
    /// [`Swarmlist::new`](crate::Swarmlist::new).
    fn self_id(&self) -> RobotId;

    /// Monotonic step counter. The engine uses it only for diagnostics and
    /// chunk scheduling, never for correctness of the freshness rule.
    fn now_step(&self) -> u64;

    /// A small jitter value (masked to 7 bits by callers per spec §4.4).
    fn rand_small(&mut self) -> u8;

    /// A wider random value, e.g. for seeding.
    fn rand_hard(&mut self) -> u32;
}
