// SPDX-License-Identifier: Apache-2.0
//! Per-robot gossip membership engine (spec §2–§4).
//!
//! Each robot owns one [`Swarmlist`]: a collection of [`Entry`] records
//! describing what it currently believes about every robot it has heard
//! from, aged by [`tick`](Swarmlist::tick) and exchanged via
//! [`Transmitter`]/[`Receiver`]. The engine is a pure value type — it owns
//! no sockets, timers, or threads; a host drives it through the [`Host`]
//! trait and the `transmit`/`receive` entry points.

mod clock;
mod config;
mod entry;
mod error;
mod host;
mod rebroadcast;
mod receive;
mod swarmlist;
mod transmit;

pub use clock::{increment, newer};
pub use config::SwarmlistConfig;
pub use entry::Entry;
pub use error::CoreError;
pub use host::Host;
pub use rebroadcast::{required_rebroadcasts, RebroadcastQueue};
pub use receive::Receiver;
pub use swarmlist::Swarmlist;
pub use transmit::{ChunkScheduler, ForcedPacket, Transmitter};

pub use swarm_proto::{LamportWidth, ProtoError, RobotId, SwarmMask};
