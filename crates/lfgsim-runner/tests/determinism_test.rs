//! Determinism tests for the LFGSim simulator
//!
//! Running the same settings with the same seed must produce bit-identical
//! node trajectories and identical firmware function sequences, tick by tick.
//! Different seeds must produce different runs, proving the seed is actually
//! used.

use lfgsim_firmware::{Busy, FirmwareFunction, NodeTracer};
use lfgsim_runner::{Settings, Simulation};

// ============================================================================
// Per-tick Snapshots
// ============================================================================

/// Everything about a node that must repeat exactly for a given seed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeSnapshot {
    position: [u64; 3],
    velocity: [u64; 3],
    acceleration: [u64; 3],
    function: FirmwareFunction,
    busy: Busy,
    channel: u8,
    transmitting: bool,
}

fn bits(v: &lfgsim_common::Vec3) -> [u64; 3] {
    [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()]
}

fn settings(seed: u64) -> Settings {
    Settings {
        node_count: 10,
        start_z: 20.0,
        spread_factor: 50.0,
        random_seed: Some(seed),
        ..Default::default()
    }
}

/// Run to completion and return a snapshot of every node after every tick.
fn record_run(seed: u64) -> Vec<Vec<NodeSnapshot>> {
    let mut sim = Simulation::new(settings(seed), NodeTracer::disabled()).unwrap();
    let mut history = Vec::new();
    while !sim.is_finished() {
        sim.tick().unwrap();
        history.push(
            sim.nodes()
                .iter()
                .map(|n| NodeSnapshot {
                    position: bits(&n.kinematics.position),
                    velocity: bits(&n.kinematics.velocity),
                    acceleration: bits(&n.kinematics.acceleration),
                    function: n.mcu.current_function,
                    busy: n.mcu.busy,
                    channel: n.radio.active_channel,
                    transmitting: n.radio.transmit_active,
                })
                .collect(),
        );
        assert!(history.len() < 100_000, "run did not finish");
    }
    history
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_same_seed_is_bit_identical() {
    let first = record_run(12345);
    let second = record_run(12345);
    assert_eq!(first.len(), second.len());
    for (tick, (a, b)) in first.iter().zip(&second).enumerate() {
        assert_eq!(a, b, "runs diverged at tick {}", tick + 1);
    }
}

#[test]
fn test_repeated_runs_match_stats() {
    let runs: Vec<_> = (0..3)
        .map(|_| {
            let mut sim = Simulation::new(settings(99), NodeTracer::disabled()).unwrap();
            let stats = sim.run(None, None).unwrap();
            (
                stats.ticks,
                stats.transmissions,
                stats.firmware_calls,
                stats.firmware_returns,
                serde_json::to_string(&stats.nodes).unwrap(),
            )
        })
        .collect();
    assert_eq!(runs[0], runs[1]);
    assert_eq!(runs[1], runs[2]);
}

#[test]
fn test_different_seeds_differ() {
    let a = record_run(1);
    let b = record_run(2);
    let last_a = a.last().unwrap();
    let last_b = b.last().unwrap();
    assert_ne!(
        last_a.iter().map(|n| n.position).collect::<Vec<_>>(),
        last_b.iter().map(|n| n.position).collect::<Vec<_>>()
    );
}
