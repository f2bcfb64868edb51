//! Invariant sweeps: properties that must hold for every node after every
//! tick, across seeds and channel layouts.

use lfgsim_firmware::NodeTracer;
use lfgsim_runner::{Settings, Simulation};

/// Deepest nesting the firmware program reaches: main -> broadcast_lfg ->
/// find_clear_channel -> check_channel_busy.
const MAX_CALL_DEPTH: usize = 3;

fn check_run(settings: Settings) {
    let channel_count = settings.channel_count;
    let mut sim = Simulation::new(settings, NodeTracer::disabled()).unwrap();
    let count = sim.nodes().len();
    let mut landed = vec![false; count];
    let mut last_channel: Vec<u8> = sim.nodes().iter().map(|n| n.radio.active_channel).collect();

    while !sim.is_finished() {
        sim.tick().unwrap();
        assert!(sim.ticks() < 200_000, "run did not finish");

        for (i, node) in sim.nodes().iter().enumerate() {
            let k = &node.kinematics;
            let tick = sim.ticks();

            assert!(k.position.z >= 0.0, "node {} below ground at tick {}", i, tick);
            if landed[i] {
                assert_eq!(k.position.z, 0.0, "node {} left the ground at tick {}", i, tick);
            }
            landed[i] = k.position.z == 0.0;

            assert!(
                k.velocity.z <= k.terminal_velocity,
                "node {} exceeded terminal velocity at tick {}",
                i,
                tick
            );

            let channel = node.radio.active_channel;
            assert!((channel as usize) < channel_count);
            assert!(
                channel >= last_channel[i] || channel == 0,
                "node {} channel went {} -> {} at tick {}",
                i,
                last_channel[i],
                channel,
                tick
            );
            last_channel[i] = channel;

            let mcu = &node.mcu;
            assert!(mcu.call_stack.depth() <= MAX_CALL_DEPTH);
            assert!(mcu.return_stack.depth() <= 1);
            if mcu.is_halted() {
                assert!(mcu.call_stack.is_empty());
                assert!(mcu.return_stack.is_empty());
            }
        }
    }
}

#[test]
fn test_invariants_default_layout() {
    for seed in [1, 2, 3] {
        check_run(Settings {
            node_count: 10,
            start_z: 30.0,
            spread_factor: 100.0,
            random_seed: Some(seed),
            ..Default::default()
        });
    }
}

#[test]
fn test_invariants_crowded_small_channel_space() {
    check_run(Settings {
        node_count: 20,
        start_z: 30.0,
        channel_count: 4,
        group_max: 2,
        broadcast_count: 8,
        random_seed: Some(77),
        ..Default::default()
    });
}

#[test]
fn test_invariants_coarse_ticks() {
    // Ticks longer than a channel probe.
    check_run(Settings {
        node_count: 6,
        start_z: 100.0,
        time_resolution: 0.2,
        random_seed: Some(8),
        ..Default::default()
    });
}
