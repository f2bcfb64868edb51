//! Scenario tests: hand-computed runs checked end to end.

use approx::assert_relative_eq;
use lfgsim_common::{Kinematics, NodeId, SimTime, Vec3};
use lfgsim_firmware::{
    Busy, FirmwareEngine, FirmwareFunction, LfgOutcome, McuState, Node, NodeTracer,
};
use lfgsim_radio::ChannelPlan;
use lfgsim_runner::{Settings, Simulation};

// ============================================================================
// Physics
// ============================================================================

#[test]
fn test_free_fall_landing_tick() {
    let settings = Settings {
        node_count: 1,
        start_z: 10.0,
        gravity: 9.8,
        time_resolution: 0.1,
        terminal_velocity: 1000.0,
        random_seed: Some(3),
        ..Default::default()
    };
    let mut sim = Simulation::new(settings, NodeTracer::disabled()).unwrap();
    let stats = sim.run(None, Some(1_000)).unwrap();

    // After n ticks the node has dropped 0.098 * n(n+1)/2 meters: 91 cm
    // short of the ground after 13 ticks, landed after 14.
    assert_eq!(stats.ticks, 14);
    let analytic_ticks = (2.0f64 * 10.0 / 9.8).sqrt() / 0.1;
    assert!((stats.ticks as f64 - analytic_ticks).abs() <= 1.0);

    let node = &sim.nodes()[0];
    assert_eq!(node.kinematics.position.z, 0.0);
    assert_relative_eq!(node.kinematics.velocity.z, 14.0 * 0.98, epsilon = 1e-9);
}

#[test]
fn test_landed_node_keeps_drifting_sideways() {
    let settings = Settings {
        node_count: 1,
        start_z: 1.0,
        spread_factor: 100.0,
        random_seed: Some(11),
        ..Default::default()
    };
    let mut sim = Simulation::new(settings, NodeTracer::disabled()).unwrap();
    sim.run(None, Some(100_000)).unwrap();
    let before = sim.nodes()[0].kinematics.clone();

    for _ in 0..100 {
        sim.tick().unwrap();
    }
    let after = &sim.nodes()[0].kinematics;
    assert_eq!(after.position.z, 0.0);
    assert_eq!(after.velocity.z, before.velocity.z);
    assert_ne!(after.position.x, before.position.x);
}

// ============================================================================
// Intra-tick Ordering
// ============================================================================

fn node(id: usize, count: usize) -> Node {
    let k = Kinematics::at_rest(Vec3::new(0.0, 0.0, 100.0), 9.8, 8.0);
    Node::new(NodeId(id), k, 400.0, count, 1)
}

/// Put `node` at the point where `transmit_message_begin` runs this tick.
fn arm_transmit(node: &mut Node) {
    node.mcu = McuState::new(1);
    node.mcu.current_function = FirmwareFunction::TransmitMessageBegin;
    node.mcu.call_stack.push(FirmwareFunction::BroadcastLfg, 1);
}

/// Put `node` at the point where its channel probe completes this tick.
fn arm_probe(node: &mut Node) {
    node.mcu = McuState::new(1);
    node.mcu.current_function = FirmwareFunction::CheckChannelBusy;
    node.mcu.busy = Busy::Remaining(SimTime::ZERO);
    node.mcu.call_stack.push(FirmwareFunction::ScanLfg, 0);
}

fn engine() -> FirmwareEngine {
    FirmwareEngine::new(
        ChannelPlan::new(16, 1),
        0,
        SimTime::from_millis(1),
        NodeTracer::disabled(),
    )
}

#[test]
fn test_higher_id_sees_lower_id_transmit_same_tick() {
    let engine = engine();
    let mut nodes = vec![node(0, 2), node(1, 2)];
    arm_transmit(&mut nodes[0]);
    arm_probe(&mut nodes[1]);

    engine.tick_all(&mut nodes, SimTime::from_millis(1)).unwrap();

    assert!(nodes[0].radio.transmit_active);
    assert_eq!(nodes[1].mcu.return_value, 1);
}

#[test]
fn test_lower_id_sees_higher_id_transmit_next_tick() {
    let engine = engine();
    let mut nodes = vec![node(0, 2), node(1, 2)];
    arm_probe(&mut nodes[0]);
    arm_transmit(&mut nodes[1]);

    engine.tick_all(&mut nodes, SimTime::from_millis(1)).unwrap();
    assert!(nodes[1].radio.transmit_active);
    assert_eq!(nodes[0].mcu.return_value, 0, "node 1 keys up after node 0 probed");

    arm_probe(&mut nodes[0]);
    engine.tick_all(&mut nodes, SimTime::from_millis(2)).unwrap();
    assert_eq!(nodes[0].mcu.return_value, 1);
}

// ============================================================================
// Channel Exhaustion
// ============================================================================

#[test]
fn test_find_clear_channel_exhausts_occupied_space() {
    // (broadcaster id, group_max): node 0 starts on channel 0, node 1 on
    // channel 3 and has to wrap to reach channels 0..=2.
    for (broadcaster, group_max) in [(0usize, 1usize), (1, 5)] {
        let settings = Settings {
            node_count: broadcaster + 17,
            start_z: 1000.0,
            group_max,
            broadcast_count: broadcaster + 1,
            random_seed: Some(5),
            ..Default::default()
        };
        let mut sim = Simulation::new(settings, NodeTracer::disabled()).unwrap();

        for idle in &mut sim.nodes_mut()[..broadcaster] {
            idle.mcu.outcome = Some(LfgOutcome::NoClearChannel);
        }
        // The 16 nodes after the broadcaster hold every channel and are done
        // running firmware.
        for (channel, jammer) in sim.nodes_mut()[broadcaster + 1..].iter_mut().enumerate() {
            let channel = channel as u8;
            jammer.radio.active_channel = channel;
            jammer.radio.transmit_active = true;
            jammer.mcu.outcome = Some(LfgOutcome::Broadcast { channel });
        }

        let mut probed = Vec::new();
        while !sim.nodes()[broadcaster].mcu.is_halted() {
            sim.tick().unwrap();
            let node = &sim.nodes()[broadcaster];
            if node.mcu.current_function == FirmwareFunction::CheckChannelBusy
                && probed.last() != Some(&node.radio.active_channel)
            {
                probed.push(node.radio.active_channel);
            }
            assert!(sim.ticks() < 10_000, "broadcaster never finished");
        }

        let start = ChannelPlan::new(16, group_max as u8).initial_channel(NodeId(broadcaster));
        let expected: Vec<u8> = (0..16).map(|i| (start + i) % 16).collect();
        assert_eq!(probed, expected, "broadcaster {}", broadcaster);

        let node = &sim.nodes()[broadcaster];
        assert_eq!(node.mcu.outcome, Some(LfgOutcome::NoClearChannel));
        assert_eq!(node.mcu.busy_accumulated, SimTime::from_millis(16 * 50));
        assert_eq!(node.radio.active_channel, 0);
        assert!(!node.radio.transmit_active);
        assert!(node.mcu.send_packet.is_empty());
        assert!(node.mcu.call_stack.is_empty());
        assert!(node.mcu.return_stack.is_empty());
    }
}

// ============================================================================
// Full Run
// ============================================================================

#[test]
fn test_default_swarm_forms_groups() {
    let settings = Settings {
        start_z: 50.0,
        random_seed: Some(2024),
        ..Default::default()
    };
    let mut sim = Simulation::new(settings, NodeTracer::disabled()).unwrap();
    let stats = sim.run(None, Some(1_000_000)).unwrap();

    let outcomes: Vec<_> = stats.nodes.iter().map(|n| n.outcome).collect();
    assert_eq!(
        outcomes[..5],
        [
            Some(LfgOutcome::Broadcast { channel: 0 }),
            Some(LfgOutcome::Broadcast { channel: 3 }),
            Some(LfgOutcome::Broadcast { channel: 6 }),
            Some(LfgOutcome::Broadcast { channel: 9 }),
            Some(LfgOutcome::Broadcast { channel: 12 }),
        ]
    );
    // Every scan starts at channel 0. Channel 0 is probed before node 0 keys
    // up, so each scanner hears nodes 1..=4 on channels 3, 6, 9 and 12.
    assert!(outcomes[5..]
        .iter()
        .all(|o| *o == Some(LfgOutcome::Joined { peer: 1 })));
    for scanner in &stats.nodes[5..] {
        assert_eq!(scanner.group, vec![1, 2, 3, 4], "node {}", scanner.id);
    }
    assert_eq!(stats.transmissions, 5);
    assert_eq!(stats.firmware_calls, stats.firmware_returns);
    assert_eq!(stats.landed_nodes, 10);
    assert!(stats.nodes.iter().all(|n| !n.transmit_active));
}
