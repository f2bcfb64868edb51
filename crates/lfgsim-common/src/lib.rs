//! # lfgsim-common
//!
//! Common types for the LFGSim falling-swarm simulation.
//!
//! This crate provides core simulation primitives including:
//! - Time representation ([`SimTime`])
//! - Node identification ([`NodeId`])
//! - Kinematic and radio node state ([`Kinematics`], [`RadioState`])
//! - Run configuration ([`Settings`]) and its validation errors ([`ConfigError`])
//! - Per-node tracing ([`node_tracer`])

pub mod error;
pub mod node_tracer;
pub mod settings;

use serde::{Deserialize, Serialize};

pub use error::ConfigError;
pub use settings::Settings;

// ============================================================================
// Time Types
// ============================================================================

/// Simulation time in microseconds since simulation start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SimTime(u64);

impl SimTime {
    /// Zero time.
    pub const ZERO: SimTime = SimTime(0);

    /// Create from microseconds.
    pub const fn from_micros(us: u64) -> Self {
        SimTime(us)
    }

    /// Create from milliseconds.
    pub const fn from_millis(ms: u64) -> Self {
        SimTime(ms * 1000)
    }

    /// Create from seconds (float), rounded to the nearest microsecond.
    pub fn from_secs(s: f64) -> Self {
        SimTime((s * 1_000_000.0).round() as u64)
    }

    /// Get as microseconds.
    pub fn as_micros(&self) -> u64 {
        self.0
    }

    /// Get as milliseconds.
    pub fn as_millis(&self) -> u64 {
        self.0 / 1000
    }

    /// Get as seconds (float).
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Check for the zero duration.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Add duration to time.
    pub fn add(&self, duration: SimTime) -> Option<SimTime> {
        self.0.checked_add(duration.0).map(SimTime)
    }

    /// Subtract duration, clamping at zero.
    pub fn saturating_sub(&self, duration: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(duration.0))
    }

    /// Remainder of this time modulo `interval` (zero interval yields zero).
    pub fn rem(&self, interval: SimTime) -> SimTime {
        if interval.0 == 0 {
            return SimTime::ZERO;
        }
        SimTime(self.0 % interval.0)
    }
}

impl std::ops::Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Self) -> Self::Output {
        SimTime(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for SimTime {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: Self) -> Self::Output {
        SimTime(self.0.saturating_sub(rhs.0))
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}", self.as_secs_f64())
    }
}

// ============================================================================
// Node Identification
// ============================================================================

/// Identifier of a simulated node.
///
/// Doubles as the node's index in the registry; protocol logic derives
/// channel and role assignment from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Create a new node ID.
    pub fn new(id: usize) -> Self {
        NodeId(id)
    }

    /// Registry index of this node.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node {}", self.0)
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Cartesian vector in meters (or m/s, m/s² depending on use).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    /// Create a new vector.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

// ============================================================================
// Node State
// ============================================================================

/// Kinematic state of a falling node.
///
/// `velocity.z` is the downward speed: it grows with `acceleration.z`
/// (gravity) and lowers `position.z`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    /// Maximum downward speed for this node (m/s).
    pub terminal_velocity: f64,
}

impl Kinematics {
    /// A node at rest at `position`, pulled down by `gravity`.
    pub fn at_rest(position: Vec3, gravity: f64, terminal_velocity: f64) -> Self {
        Kinematics {
            position,
            velocity: Vec3::ZERO,
            acceleration: Vec3::new(0.0, 0.0, gravity),
            terminal_velocity,
        }
    }

    /// Whether the node has reached the ground.
    pub fn is_landed(&self) -> bool {
        self.position.z <= 0.0
    }
}

/// Radio-facing state of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioState {
    pub power_output: f64,
    pub transmit_active: bool,
    pub active_channel: u8,
    /// Signal strength last computed from each node, indexed by node id.
    pub received_signal: Vec<f64>,
}

impl RadioState {
    /// Idle radio on channel 0 with room for `node_count` signal readings.
    pub fn new(power_output: f64, node_count: usize) -> Self {
        RadioState {
            power_output,
            transmit_active: false,
            active_channel: 0,
            received_signal: vec![0.0; node_count],
        }
    }
}
