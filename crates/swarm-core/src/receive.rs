// SPDX-License-Identifier: Apache-2.0
//! Receive path: demultiplex a packet by type, feed entries back through
//! the update rule (spec §4.5).

use swarm_proto::{Packet, PacketType, ProtoError};
use tracing::warn;

use crate::swarmlist::Swarmlist;

/// Decodes an inbound packet and applies each contained observation.
pub struct Receiver;

impl Receiver {
    /// Handle one fully-formed inbound packet. `SWARM` frames feed every
    /// non-self entry into [`Swarmlist::update`]; `Empty` frames (and any
    /// reserved trailing bytes within a `SWARM` frame) are tolerated
    /// without error.
    ///
    /// # Errors
    /// Returns [`ProtoError`] on a malformed packet (spec §7); the
    /// swarmlist is left untouched in that case.
    pub fn handle_packet(
        sl: &mut Swarmlist,
        bytes: &[u8],
        packet_size: usize,
    ) -> Result<(), ProtoError> {
        let width = sl.lamport_width();
        let (kind, entries) = match Packet::decode(bytes, packet_size, width) {
            Ok(ok) => ok,
            Err(err) => {
                warn!(?err, "dropping malformed packet");
                return Err(err);
            }
        };

        match kind {
            PacketType::Empty => {}
            PacketType::Swarm => {
                let self_id = sl.self_id();
                for entry in entries {
                    if entry.robot == self_id {
                        continue;
                    }
                    sl.update(entry.robot, entry.mask, entry.lamport);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    use super::*;
    use crate::config::SwarmlistConfig;
    use swarm_proto::{LamportWidth, WireEntry};

    #[test]
    fn self_observations_are_skipped() {
        let mut sl = Swarmlist::new(7, 0x01, SwarmlistConfig::default());
        let forged = Packet::encode(
            PacketType::Swarm,
            &[WireEntry {
                robot: 7,
                mask: 0xFF,
                lamport: 99,
            }],
            10,
            LamportWidth::Eight,
        )
        .expect("encode");
        Receiver::handle_packet(&mut sl, &forged, 10).expect("decode ok");
        assert_eq!(sl.get(7).expect("self").mask(), 0x01);
    }

    #[test]
    fn empty_type_packets_are_tolerated() {
        let mut sl = Swarmlist::new(7, 0x01, SwarmlistConfig::default());
        let idle = Packet::encode(PacketType::Empty, &[], 10, LamportWidth::Eight).expect("encode");
        Receiver::handle_packet(&mut sl, &idle, 10).expect("tolerated");
        assert_eq!(sl.size(), 1);
    }

    #[test]
    fn malformed_packet_does_not_mutate_swarmlist() {
        let mut sl = Swarmlist::new(7, 0x01, SwarmlistConfig::default());
        let mut bad = vec![0xFFu8; 10];
        bad[0] = 0xAB; // unknown tag
        let before = sl.size();
        assert!(Receiver::handle_packet(&mut sl, &bad, 10).is_err());
        assert_eq!(sl.size(), before);
    }

    #[test]
    fn scenarios_2_3_4_stale_and_fresh_updates() {
        // 8-bit lamport, T=50 (spec §8, scenarios 2-4).
        let mut b = Swarmlist::new(3, 0x00, SwarmlistConfig::default());
        b.update(7, 0x01, 1);

        // Scenario 2: forged same-lamport update is rejected.
        b.update(7, 0x02, 1);
        assert_eq!(b.get(7).expect("present").mask(), 0x01);

        // Scenario 3: within-threshold update is accepted.
        b.update(7, 0x02, 40);
        let e = b.get(7).expect("present");
        assert_eq!(e.mask(), 0x02);
        assert_eq!(e.lamport(), 40);

        // Scenario 4: 95 - 40 = 55 > T=50, rejected.
        b.update(7, 0x04, 95);
        let e = b.get(7).expect("present");
        assert_eq!(e.mask(), 0x02);
        assert_eq!(e.lamport(), 40);
    }

    #[test]
    fn scenario_5_wrap_around_newer_is_accepted() {
        let mut a = Swarmlist::new(1, 0x01, SwarmlistConfig::default());
        let mut b = Swarmlist::new(3, 0x00, SwarmlistConfig::default());

        // 250 self-transmissions, then one more makes it 251 (spec §8, scenario 5).
        let mut last_pkt = None;
        for _ in 0..251 {
            last_pkt = crate::transmit::Transmitter::build_packet(&mut a, 10, 0x01).expect("ok");
        }
        assert_eq!(a.get(1).expect("self").lamport(), 251);
        Receiver::handle_packet(&mut b, &last_pkt.expect("packet"), 10).expect("decode");
        assert_eq!(b.get(1).expect("present").lamport(), 251);

        // Drive further until it wraps past 255 down to exactly 10.
        let mut last_pkt = None;
        while a.get(1).expect("self").lamport() != 10 {
            last_pkt = crate::transmit::Transmitter::build_packet(&mut a, 10, 0x01).expect("ok");
        }
        Receiver::handle_packet(&mut b, &last_pkt.expect("packet"), 10).expect("decode");
        let e = b.get(1).expect("present");
        assert_eq!(e.lamport(), 10, "10 is within T=50 of 251 via wrap");
        assert_eq!(e.mask(), 0x01);
    }
}
