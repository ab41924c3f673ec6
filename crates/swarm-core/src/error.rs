// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;
use swarm_proto::RobotId;

/// Fatal invariant breach (spec §7, `InvariantViolated`). The
/// update/tick/remove paths in [`crate::Swarmlist`] are required to never
/// produce one; [`crate::Swarmlist::check_invariants`] exists to catch a
/// regression in tests, not to be handled at runtime.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The id→position map and the entry sequence disagree about which
    /// robots are present, or about where one of them lives.
    #[error("id map inconsistent for robot {robot}: {detail}")]
    IdMapInconsistent {
        /// Robot whose mapping is inconsistent.
        robot: RobotId,
        /// Human-readable description of the mismatch.
        detail: &'static str,
    },
    /// `num_active` does not equal the number of entries for which
    /// `active(e)` holds.
    #[error("num_active mismatch: tracked {tracked}, actual {actual}")]
    ActiveCountMismatch {
        /// Value the swarmlist was tracking incrementally.
        tracked: usize,
        /// Value recomputed by scanning all entries.
        actual: usize,
    },
    /// The cursor fell outside `[0, size)` with a non-empty swarmlist.
    #[error("cursor {next} out of range for size {size}")]
    CursorOutOfRange {
        /// Current cursor value.
        next: usize,
        /// Current entry count.
        size: usize,
    },
}
