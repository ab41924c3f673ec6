// SPDX-License-Identifier: Apache-2.0
//! Circular Lamport-clock freshness rule (spec §4.1).

use swarm_proto::LamportWidth;

/// `newer(a, b)`: is `a` close enough ahead of `b`, modulo `2^W`, to count
/// as a fresher observation? Strict — equal values are never "newer" than
/// each other (spec §4.1, P5).
///
/// All arithmetic happens in `u64` so neither `width`'s maximum nor the
/// threshold can overflow `u32` while computing `b + threshold`.
#[must_use]
pub fn newer(a: u32, b: u32, threshold: u32, width: LamportWidth) -> bool {
    let max = u64::from(width.max_value());
    let a = u64::from(a);
    let b = u64::from(b);
    let threshold = u64::from(threshold);
    let modulus = max + 1;

    let overflow = (max - b) < threshold;
    if overflow {
        (a > b) || (a <= (b + threshold) % modulus)
    } else {
        (a > b) && (a <= b + threshold)
    }
}

/// Increment a Lamport counter modulo `2^W`.
#[must_use]
pub const fn increment(lamport: u32, width: LamportWidth) -> u32 {
    if lamport >= width.max_value() {
        0
    } else {
        lamport + 1
    }
}
