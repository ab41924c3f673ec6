// SPDX-License-Identifier: Apache-2.0
//! Local multi-robot host/simulator for the swarm membership engine.
//!
//! Runs `--robots` engines as independent tasks, each owning its own
//! `Swarmlist`, and fans packets out over a lossy in-process broadcast bus
//! that stands in for the one-hop radio link spec.md treats as an
//! external collaborator (§1). Placement topology, experiment state
//! machines, and CSV emission are out of scope here too — this binary
//! only drives the membership engine end to end.

use std::collections::HashSet;

use anyhow::Result;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use swarm_config::ConfigService;
use swarm_config_fs::FsConfigStore;
use swarm_core::{
    ChunkScheduler, Host, Receiver, RebroadcastQueue, Swarmlist, SwarmlistConfig, Transmitter,
};
use swarm_proto::{LamportWidth, RobotId};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Host-visible configuration (spec §6), exposed as CLI flags and
/// persisted as a JSON profile via `swarm-config-fs`.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "swarm-hostd", about = "Swarm membership engine host/simulator")]
struct Cli {
    /// Number of simulated robots.
    #[arg(long, default_value_t = 8)]
    robots: usize,

    /// Number of host steps to run before exiting.
    #[arg(long, default_value_t = 20_000)]
    steps: u64,

    /// Fixed packet size in bytes.
    #[arg(long, default_value_t = 32)]
    packet_size: usize,

    /// Minimum steps between transmit chunks.
    #[arg(long, default_value_t = 50)]
    swarm_chunk_delay: u64,

    /// Maximum packets emitted per chunk.
    #[arg(long, default_value_t = 2)]
    swarm_chunk_amount: usize,

    /// Ticks of inactivity before an entry becomes inactive.
    #[arg(long, default_value_t = 255)]
    tti_max: u8,

    /// Enable the ttr eviction stage.
    #[arg(long, default_value_t = false)]
    remove_old_entries: bool,

    /// Ticks before an inactive entry is evicted (ignored unless
    /// `remove_old_entries`).
    #[arg(long, default_value_t = 255)]
    ttr_max: u8,

    /// Host-step multiplier for one tick call.
    #[arg(long, default_value_t = 10)]
    loops_per_tick: u64,

    /// Circular Lamport comparison threshold `T`.
    #[arg(long, default_value_t = 50)]
    lamport_threshold: u32,

    /// Lamport counter width in bits (8 or 32).
    #[arg(long, default_value_t = 8)]
    lamport_width: u32,

    /// Independent per-packet drop probability on the simulated channel.
    #[arg(long, default_value_t = 0.1)]
    drop_probability: f64,

    /// PRNG seed for jitter and channel drops.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Target delivery probability for newly learned entries, driving the
    /// bounded rebroadcast extension (SPEC_FULL §5).
    #[arg(long, default_value_t = 0.99)]
    rebroadcast_target_success: f64,
}

impl Cli {
    fn lamport_width(&self) -> LamportWidth {
        if self.lamport_width >= 32 {
            LamportWidth::ThirtyTwo
        } else {
            LamportWidth::Eight
        }
    }

    fn swarmlist_config(&self) -> SwarmlistConfig {
        SwarmlistConfig {
            tti_max: self.tti_max,
            remove_old_entries: self.remove_old_entries,
            ttr_max: self.ttr_max,
            lamport_threshold: self.lamport_threshold,
            lamport_width: self.lamport_width(),
        }
    }
}

struct SimHost {
    id: RobotId,
    step: u64,
    rng: StdRng,
}

impl Host for SimHost {
    fn self_id(&self) -> RobotId {
        self.id
    }

    fn now_step(&self) -> u64 {
        self.step
    }

    fn rand_small(&mut self) -> u8 {
        self.rng.gen()
    }

    fn rand_hard(&mut self) -> u32 {
        self.rng.gen()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Best-effort profile persistence, mirroring the session-hub pattern:
    // load a saved profile if present, otherwise persist the CLI-derived
    // defaults once.
    let config: Option<ConfigService<FsConfigStore>> =
        FsConfigStore::new().map(ConfigService::new).ok();
    if let Some(cfg) = &config {
        if cfg.load::<Cli>("hostd_profile").ok().flatten().is_none() {
            let _ = cfg.save("hostd_profile", &cli);
        }
    }

    info!(robots = cli.robots, steps = cli.steps, "starting swarm-hostd");

    let (bus_tx, _) = broadcast::channel::<(RobotId, Vec<u8>)>(4096);
    let num_robots = RobotId::try_from(cli.robots)?;
    let mut handles = Vec::with_capacity(cli.robots);
    for id in 0..num_robots {
        let cli = cli.clone();
        let tx = bus_tx.clone();
        let rx = bus_tx.subscribe();
        handles.push(tokio::spawn(run_robot(id, cli, tx, rx)));
    }

    for handle in handles {
        handle.await??;
    }

    Ok(())
}

async fn run_robot(
    id: RobotId,
    cli: Cli,
    bus_tx: broadcast::Sender<(RobotId, Vec<u8>)>,
    mut bus_rx: broadcast::Receiver<(RobotId, Vec<u8>)>,
) -> Result<()> {
    let mut self_mask: u8 = 1;
    let mut sl = Swarmlist::new(id, self_mask, cli.swarmlist_config());
    let mut host = SimHost {
        id,
        step: 0,
        rng: StdRng::seed_from_u64(cli.seed.wrapping_add(u64::from(id))),
    };
    let mut scheduler = ChunkScheduler::new(cli.swarm_chunk_delay, cli.swarm_chunk_amount);
    let mut rebroadcasts =
        RebroadcastQueue::new(cli.rebroadcast_target_success, cli.drop_probability);
    let mut known: HashSet<RobotId> = HashSet::from([id]);
    let packet_size = cli.packet_size;
    let k = swarm_proto::slot_count(packet_size, cli.lamport_width());

    for step in 0..cli.steps {
        host.step = step;
        tokio::task::yield_now().await;

        while let Ok((sender, packet)) = bus_rx.try_recv() {
            if sender == id {
                continue;
            }
            if host.rng.gen::<f64>() < cli.drop_probability {
                continue; // simulated drop
            }
            if let Err(err) = Receiver::handle_packet(&mut sl, &packet, packet_size) {
                warn!(robot = id, ?err, "dropping malformed packet");
            }
        }

        let mut newly_learned = Vec::new();
        sl.foreach(|e| {
            if known.insert(e.robot()) {
                newly_learned.push(e.robot());
            }
        });
        for robot in newly_learned {
            rebroadcasts.record_new(robot);
        }

        if cli.loops_per_tick > 0 && step % cli.loops_per_tick == 0 {
            sl.tick();
        }

        if scheduler.is_due(step) {
            let base_chunks = scheduler.packets_for(sl.num_active(), k.max(1)).max(1);
            let heavy = rebroadcasts.pending_robots(rebroadcasts.pending());
            let extra = heavy.len();
            for i in 0..(base_chunks + extra) {
                // Spend the first chunk's worth of slots forcing the
                // newly learned entries still under quota onto the wire;
                // only entries actually written are confirmed against the
                // queue, so a robot the swarmlist has already evicted
                // keeps its quota for the next attempt instead of
                // "graduating" unsent.
                let priority: &[RobotId] = if i == 0 { &heavy } else { &[] };
                match Transmitter::build_packet_with_priority(
                    &mut sl,
                    packet_size,
                    self_mask,
                    priority,
                ) {
                    Ok(Some((packet, forced))) => {
                        rebroadcasts.confirm_sent(&forced);
                        let _ = bus_tx.send((id, packet));
                    }
                    Ok(None) => {}
                    Err(err) => warn!(robot = id, ?err, "failed to build packet"),
                }
            }
            let jitter = host.rand_small();
            scheduler.schedule_next(step, jitter);

            // Let the owner's announced mask drift slowly over the run
            // (SPEC_FULL §5): demonstrates self-mask updates propagating
            // end to end without touching freshness state.
            self_mask = self_mask.wrapping_add(1);
            sl.set_self_mask(self_mask);
        }
    }

    info!(
        robot = id,
        size = sl.size(),
        num_active = sl.num_active(),
        "swarm-hostd finished"
    );
    Ok(())
}
