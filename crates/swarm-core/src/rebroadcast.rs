// SPDX-License-Identifier: Apache-2.0
//! Optional rebroadcast extension (spec §4.4): newly learned entries are
//! repeated a bounded number of times to raise their odds of reaching
//! every neighbor despite a lossy channel, before rejoining the ordinary
//! round-robin rotation.

use std::collections::VecDeque;

use swarm_proto::RobotId;

/// How many times a newly learned entry must be rebroadcast to reach
/// `target_success` delivery probability against a channel that drops
/// each packet independently with probability `drop_probability`.
///
/// `n = ceil(log_q(1 - p))`, solved as `ln(1-p) / ln(q)` (spec §4.4).
#[must_use]
pub fn required_rebroadcasts(target_success: f64, drop_probability: f64) -> u32 {
    if drop_probability <= 0.0 || target_success <= 0.0 {
        return 1;
    }
    if target_success >= 1.0 {
        // No drop rate makes certainty achievable in finite attempts;
        // cap generously rather than looping forever.
        return 64;
    }
    let n = (1.0 - target_success).ln() / drop_probability.ln();
    let n = n.ceil().clamp(1.0, f64::from(u32::MAX));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        n as u32
    }
}

/// Tracks newly learned robots awaiting their bounded rebroadcast quota.
pub struct RebroadcastQueue {
    target_success: f64,
    drop_probability: f64,
    queue: VecDeque<(RobotId, u32)>,
}

impl RebroadcastQueue {
    /// Build a queue targeting `target_success` delivery probability
    /// against a channel with the given `drop_probability`.
    #[must_use]
    pub fn new(target_success: f64, drop_probability: f64) -> Self {
        Self {
            target_success,
            drop_probability,
            queue: VecDeque::new(),
        }
    }

    /// Record a newly learned robot, queuing it for its rebroadcast quota.
    pub fn record_new(&mut self, robot: RobotId) {
        let quota = required_rebroadcasts(self.target_success, self.drop_probability);
        self.queue.push_back((robot, quota));
    }

    /// Peek at up to `k` robots still awaiting rebroadcast, front of the
    /// queue first, without consuming any quota. A caller should attempt to
    /// force these ids into the next outgoing packet and report back via
    /// [`Self::confirm_sent`] only the ones that actually made it onto the
    /// wire — quota is spent on confirmed transmission, not on intent.
    #[must_use]
    pub fn pending_robots(&self, k: usize) -> Vec<RobotId> {
        self.queue.iter().take(k).map(|&(robot, _)| robot).collect()
    }

    /// Record that `sent` were confirmed written into a packet that was
    /// actually transmitted, in front-of-queue order. Each confirmed robot
    /// has its quota decremented by one and is requeued if any remains, or
    /// dropped once exhausted. Entries not confirmed (e.g. skipped because
    /// the swarmlist no longer has them) keep their full remaining quota
    /// and stay at the front for the next attempt.
    pub fn confirm_sent(&mut self, sent: &[RobotId]) {
        for &robot in sent {
            let Some(&(front_robot, remaining)) = self.queue.front() else {
                break;
            };
            if front_robot != robot {
                continue;
            }
            self.queue.pop_front();
            if remaining > 1 {
                self.queue.push_back((front_robot, remaining - 1));
            }
        }
    }

    /// Number of robots still awaiting rebroadcast.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
