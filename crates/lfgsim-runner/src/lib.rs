//! # lfgsim-runner library
//!
//! Library interface for the LFGSim simulation runner.
//!
//! [`Simulation`] owns the node registry and drives it one tick at a time:
//! physics for every node (acceleration, then velocity, then position), then
//! one firmware dispatch slot per node in id order. [`Simulation::run`]
//! repeats this until every node has landed.
//!
//! Determinism: all randomness comes from a single `ChaCha8Rng` seeded from
//! the run's seed, and nodes are always visited in id order, so a seed and a
//! set of settings fully determine a run.

pub mod output;

pub use lfgsim_common::{Settings, SimTime};
pub use output::OutputWriter;

use lfgsim_common::{ConfigError, Kinematics, NodeId, Vec3};
use lfgsim_firmware::{EngineTick, FirmwareEngine, FirmwareError, LfgOutcome, Node, NodeTracer};
use lfgsim_metrics::metric_defs;
use lfgsim_physics::{randomized_terminal_velocity, Integrator, VelocityUpdate};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during simulation.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Invalid settings.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Firmware invariant violation.
    #[error("Firmware error: {0}")]
    Firmware(#[from] FirmwareError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The run hit its tick limit with nodes still in the air.
    #[error("Tick limit of {ticks} reached at {time}s with {moving} nodes still falling")]
    TickLimit { ticks: u64, time: SimTime, moving: usize },
}

// ============================================================================
// Simulation Statistics
// ============================================================================

/// Final state of one node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub id: usize,
    /// How the firmware program ended, if it did.
    pub outcome: Option<LfgOutcome>,
    pub active_channel: u8,
    pub transmit_active: bool,
    /// Total firmware busy time in microseconds.
    pub busy_us: u64,
    /// Peers heard while scanning.
    pub group: Vec<usize>,
    pub position: Vec3,
    pub velocity: Vec3,
    pub terminal_velocity: f64,
}

impl NodeSummary {
    fn of(node: &Node) -> Self {
        NodeSummary {
            id: node.id.index(),
            outcome: node.mcu.outcome,
            active_channel: node.radio.active_channel,
            transmit_active: node.radio.transmit_active,
            busy_us: node.mcu.busy_accumulated.as_micros(),
            group: node.mcu.group_list.peers().map(|p| p.index()).collect(),
            position: node.kinematics.position,
            velocity: node.kinematics.velocity,
            terminal_velocity: node.kinematics.terminal_velocity,
        }
    }
}

/// Statistics collected during simulation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationStats {
    /// Seed the run's random stream was derived from.
    pub seed: u64,
    /// Ticks executed.
    pub ticks: u64,
    /// Final simulation time.
    pub final_time_us: u64,
    /// Wall clock time in milliseconds.
    pub wall_time_ms: u64,
    /// Nodes on the ground.
    pub landed_nodes: usize,
    /// Transmitters keyed.
    pub transmissions: u64,
    /// Firmware calls made.
    pub firmware_calls: u64,
    /// Firmware returns made.
    pub firmware_returns: u64,
    /// Per-node final state.
    pub nodes: Vec<NodeSummary>,
}

// ============================================================================
// Simulation
// ============================================================================

/// The simulation clock and node registry for one run.
pub struct Simulation {
    settings: Settings,
    nodes: Vec<Node>,
    integrator: Integrator,
    engine: FirmwareEngine,
    rng: ChaCha8Rng,
    seed: u64,
    tracer: NodeTracer,
    tick: SimTime,
    current_time: SimTime,
    ticks: u64,
    moving: usize,
    halted_seen: Vec<bool>,
    transmissions: u64,
    firmware_calls: u64,
    firmware_returns: u64,
}

impl Simulation {
    /// Validate `settings` and build the node registry.
    ///
    /// Without a configured seed one is drawn from the OS; it is reported by
    /// [`Simulation::seed`] so the run can be repeated.
    pub fn new(settings: Settings, tracer: NodeTracer) -> Result<Self, RunnerError> {
        settings.validate()?;

        let seed = settings
            .random_seed
            .unwrap_or_else(|| rand::thread_rng().gen());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let count = settings.node_count;
        let start = settings.start_position();
        let nodes: Vec<Node> = (0..count)
            .map(|i| {
                let terminal = randomized_terminal_velocity(settings.terminal_velocity, &mut rng);
                let kinematics = Kinematics::at_rest(start, settings.gravity, terminal);
                Node::new(
                    NodeId(i),
                    kinematics,
                    settings.default_power_output,
                    count,
                    settings.group_max,
                )
            })
            .collect();
        let moving = nodes.iter().filter(|n| !n.kinematics.is_landed()).count();

        tracing::info!("Created {} nodes at {:?} (seed {})", count, start, seed);

        Ok(Simulation {
            integrator: Integrator::from_settings(&settings),
            engine: FirmwareEngine::from_settings(&settings, tracer.clone()),
            tick: settings.tick(),
            settings,
            halted_seen: vec![false; nodes.len()],
            nodes,
            rng,
            seed,
            tracer,
            current_time: SimTime::ZERO,
            ticks: 0,
            moving,
            transmissions: 0,
            firmware_calls: 0,
            firmware_returns: 0,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Seed of the run's random stream.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The node registry, indexed by id.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Mutable node registry, for setting up scenarios.
    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Nodes still above ground.
    pub fn moving_nodes(&self) -> usize {
        self.moving
    }

    /// Whether every node has landed.
    pub fn is_finished(&self) -> bool {
        self.moving == 0
    }

    /// Advance simulated time by one tick.
    pub fn tick(&mut self) -> Result<EngineTick, RunnerError> {
        self.current_time += self.tick;
        self.ticks += 1;
        let now = self.current_time;
        tracing::debug!("tick {} at {}s", self.ticks, now);

        self.update_physics(now);

        let summary = self.engine.tick_all(&mut self.nodes, now)?;
        self.record_firmware(&summary);

        self.moving = self.nodes.iter().filter(|n| !n.kinematics.is_landed()).count();
        metrics::counter!(metric_defs::CLOCK_TICKS.name).increment(1);
        metrics::gauge!(metric_defs::CLOCK_MOVING_NODES.name).set(self.moving as f64);

        Ok(summary)
    }

    /// Tick until every node has landed, writing records to `output` on each
    /// write interval.
    ///
    /// `max_ticks` bounds the run; reaching it with nodes still falling is a
    /// [`RunnerError::TickLimit`].
    pub fn run(
        &mut self,
        mut output: Option<&mut OutputWriter>,
        max_ticks: Option<u64>,
    ) -> Result<SimulationStats, RunnerError> {
        let wall_start = Instant::now();

        while !self.is_finished() {
            if let Some(limit) = max_ticks {
                if self.ticks >= limit {
                    return Err(RunnerError::TickLimit {
                        ticks: self.ticks,
                        time: self.current_time,
                        moving: self.moving,
                    });
                }
            }

            let step_start = Instant::now();
            self.tick()?;
            metrics::histogram!(metric_defs::CLOCK_STEP_TIME.name)
                .record(step_start.elapsed().as_micros() as f64);

            if let Some(writer) = output.as_deref_mut() {
                if writer.is_due(self.current_time) {
                    writer.write(self.current_time, &self.nodes)?;
                }
            }
        }

        if let Some(writer) = output {
            writer.flush()?;
        }
        Ok(self.stats(wall_start.elapsed()))
    }

    /// Statistics for the run so far.
    pub fn stats(&self, wall_time: Duration) -> SimulationStats {
        SimulationStats {
            seed: self.seed,
            ticks: self.ticks,
            final_time_us: self.current_time.as_micros(),
            wall_time_ms: wall_time.as_millis() as u64,
            landed_nodes: self.nodes.len() - self.moving,
            transmissions: self.transmissions,
            firmware_calls: self.firmware_calls,
            firmware_returns: self.firmware_returns,
            nodes: self.nodes.iter().map(NodeSummary::of).collect(),
        }
    }

    /// Acceleration, velocity and position, each as a pass over all nodes.
    fn update_physics(&mut self, now: SimTime) {
        for node in &mut self.nodes {
            if self.integrator.update_acceleration(&mut node.kinematics, &mut self.rng) {
                let a = node.kinematics.acceleration;
                tracing::trace!("{} x/y acceleration now {:.9},{:.9}", node.id, a.x, a.y);
            }
        }

        for node in &mut self.nodes {
            if self.integrator.update_velocity(&mut node.kinematics) == VelocityUpdate::ReachedTerminal {
                tracing::debug!(
                    "{} reached terminal velocity {:.4} at {}s",
                    node.id,
                    node.kinematics.terminal_velocity,
                    now
                );
                self.tracer
                    .log_kinematics(node.id, now, "reached terminal velocity");
            }
        }

        for node in &mut self.nodes {
            if self.integrator.update_position(&mut node.kinematics) {
                tracing::info!("{} landed at {}s", node.id, now);
                self.tracer.log_kinematics(node.id, now, "landed");
                metrics::counter!(metric_defs::PHYSICS_LANDINGS.name).increment(1);
            }
        }
    }

    fn record_firmware(&mut self, summary: &EngineTick) {
        self.transmissions += summary.transmissions as u64;
        self.firmware_calls += summary.calls as u64;
        self.firmware_returns += summary.returns as u64;
        metrics::counter!(metric_defs::FIRMWARE_CALLS.name).increment(summary.calls as u64);
        metrics::counter!(metric_defs::FIRMWARE_RETURNS.name).increment(summary.returns as u64);
        metrics::counter!(metric_defs::RADIO_TRANSMISSIONS.name)
            .increment(summary.transmissions as u64);

        if summary.halted == 0 {
            return;
        }
        for (node, seen) in self.nodes.iter().zip(self.halted_seen.iter_mut()) {
            if let (Some(outcome), false) = (node.mcu.outcome, *seen) {
                *seen = true;
                tracing::info!("{} finished: {}", node.id, outcome);
                metrics::counter!(metric_defs::FIRMWARE_HALTED.name, "outcome" => outcome.kind())
                    .increment(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_settings() -> Settings {
        Settings {
            node_count: 3,
            start_z: 5.0,
            time_resolution: 0.01,
            random_seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_rejects_invalid_settings() {
        let settings = Settings { node_count: 0, ..Default::default() };
        let result = Simulation::new(settings, NodeTracer::disabled());
        assert!(matches!(result, Err(RunnerError::Config(ConfigError::NoNodes))));
    }

    #[test]
    fn test_bad_yaml_is_a_config_error() {
        let err = RunnerError::from(Settings::from_yaml_str("node_count: [").unwrap_err());
        assert!(matches!(err, RunnerError::Config(ConfigError::Yaml(_))));
        assert!(err.to_string().starts_with("Configuration error: "));
    }

    #[test]
    fn test_initial_state() {
        let sim = Simulation::new(small_settings(), NodeTracer::disabled()).unwrap();
        assert_eq!(sim.seed(), 7);
        assert_eq!(sim.moving_nodes(), 3);
        for node in sim.nodes() {
            let k = &node.kinematics;
            assert_eq!(k.position, Vec3::new(0.0, 0.0, 5.0));
            assert_eq!(k.velocity, Vec3::ZERO);
            assert!((k.terminal_velocity - 8.0).abs() <= 8.0 * 0.05 + 1e-12);
            assert_eq!(node.radio.received_signal, vec![0.0; 3]);
        }
    }

    #[test]
    fn test_run_lands_everyone() {
        let mut sim = Simulation::new(small_settings(), NodeTracer::disabled()).unwrap();
        let stats = sim.run(None, Some(100_000)).unwrap();
        assert_eq!(stats.landed_nodes, 3);
        assert_eq!(stats.ticks, sim.ticks());
        assert_eq!(stats.final_time_us, stats.ticks * 10_000);
        assert!(sim.nodes().iter().all(|n| n.kinematics.position.z == 0.0));
    }

    #[test]
    fn test_tick_limit() {
        let settings = Settings { gravity: 0.0, ..small_settings() };
        let mut sim = Simulation::new(settings, NodeTracer::disabled()).unwrap();
        let err = sim.run(None, Some(50)).unwrap_err();
        assert!(matches!(err, RunnerError::TickLimit { ticks: 50, moving: 3, .. }));
    }

    #[test]
    fn test_start_on_ground_finishes_immediately() {
        let settings = Settings { start_z: 0.0, ..small_settings() };
        let mut sim = Simulation::new(settings, NodeTracer::disabled()).unwrap();
        let stats = sim.run(None, None).unwrap();
        assert_eq!(stats.ticks, 0);
        assert_eq!(stats.landed_nodes, 3);
    }
}
