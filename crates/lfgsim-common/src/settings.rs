//! Run configuration.
//!
//! [`Settings`] is resolved once before the run (defaults, then an optional
//! YAML file, then command-line overrides), validated, and then shared
//! read-only by every component.
//!
//! ## Example YAML
//!
//! ```yaml
//! node_count: 20
//! start_z: 500.0
//! time_resolution: 0.001
//! random_seed: 42
//! channel_count: 16
//! ```

use crate::{ConfigError, SimTime, Vec3};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest channel space the radio supports.
pub const MAX_CHANNELS: usize = 64;

/// Immutable configuration for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Number of nodes in the swarm.
    pub node_count: usize,
    /// Gravitational acceleration (m/s²).
    pub gravity: f64,
    /// Seconds of simulated time per tick.
    pub time_resolution: f64,
    /// Starting x coordinate (m).
    pub start_x: f64,
    /// Starting y coordinate (m).
    pub start_y: f64,
    /// Starting height (m).
    pub start_z: f64,
    /// Base terminal velocity before per-node variance (m/s).
    pub terminal_velocity: f64,
    /// Percent chance per tick that a node's x/y acceleration changes.
    pub spread_factor: f64,
    /// Transmit power assigned to every node.
    pub default_power_output: f64,
    /// Seconds of simulated time between output records.
    pub write_interval: f64,
    /// Number of groups the swarm is partitioned into.
    pub group_max: usize,
    /// The first `broadcast_count` nodes broadcast LFG; the rest scan for it.
    pub broadcast_count: usize,
    /// Size of the channel space.
    pub channel_count: usize,
    /// Seed for all simulation randomness. `None` draws one at startup.
    pub random_seed: Option<u64>,
    /// Write per-node and transmit-history files.
    pub output: bool,
    /// Parent directory for timestamped run directories.
    pub output_root: PathBuf,
    /// Debug verbosity (0 = off, 3 = everything).
    pub debug: u8,
    /// Echo configuration and progress.
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            node_count: 10,
            gravity: 9.80665,
            time_resolution: 0.001,
            start_x: 0.0,
            start_y: 0.0,
            start_z: 30000.0,
            terminal_velocity: 8.0,
            spread_factor: 20.0,
            default_power_output: 400.0,
            write_interval: 1.0,
            group_max: 5,
            broadcast_count: 5,
            channel_count: 16,
            random_seed: None,
            output: false,
            output_root: PathBuf::from("output/run"),
            debug: 0,
            verbose: true,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file. Missing keys take their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parse settings from a YAML string. Missing keys take their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Reject settings the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_count == 0 {
            return Err(ConfigError::NoNodes);
        }
        if !self.time_resolution.is_finite() || self.time_resolution < 1e-6 {
            return Err(ConfigError::OutOfRange {
                name: "time_resolution",
                value: self.time_resolution,
                reason: "must be at least one microsecond",
            });
        }
        if !self.write_interval.is_finite() || self.write_interval <= 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "write_interval",
                value: self.write_interval,
                reason: "must be positive",
            });
        }
        for (name, value) in [("gravity", self.gravity), ("start_z", self.start_z)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange {
                    name,
                    value,
                    reason: "must be finite and non-negative",
                });
            }
        }
        for (name, value) in [
            ("start_x", self.start_x),
            ("start_y", self.start_y),
            ("default_power_output", self.default_power_output),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::OutOfRange {
                    name,
                    value,
                    reason: "must be finite",
                });
            }
        }
        if !self.terminal_velocity.is_finite() || self.terminal_velocity <= 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "terminal_velocity",
                value: self.terminal_velocity,
                reason: "must be positive",
            });
        }
        if !(0.0..=100.0).contains(&self.spread_factor) {
            return Err(ConfigError::OutOfRange {
                name: "spread_factor",
                value: self.spread_factor,
                reason: "must be a percentage between 0 and 100",
            });
        }
        if self.channel_count == 0 || self.channel_count > MAX_CHANNELS {
            return Err(ConfigError::ChannelCount {
                count: self.channel_count,
                max: MAX_CHANNELS,
            });
        }
        if self.group_max == 0 || self.group_max > self.channel_count {
            return Err(ConfigError::GroupMax {
                group_max: self.group_max,
                channel_count: self.channel_count,
            });
        }
        Ok(())
    }

    /// Tick length as simulation time.
    pub fn tick(&self) -> SimTime {
        SimTime::from_secs(self.time_resolution)
    }

    /// Output interval as simulation time.
    pub fn write_every(&self) -> SimTime {
        SimTime::from_secs(self.write_interval)
    }

    /// Common starting point of every node.
    pub fn start_position(&self) -> Vec3 {
        Vec3::new(self.start_x, self.start_y, self.start_z)
    }
}
