//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating [`crate::Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid YAML for [`crate::Settings`].
    #[error("Invalid settings file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The swarm must contain at least one node.
    #[error("Node count must be at least 1")]
    NoNodes,

    /// A numeric option is outside its allowed range.
    #[error("Invalid value for {name}: {value} ({reason})")]
    OutOfRange {
        /// Option name.
        name: &'static str,
        /// Offending value.
        value: f64,
        /// Allowed range.
        reason: &'static str,
    },

    /// Channel space is empty or larger than the radio supports.
    #[error("Channel count must be between 1 and {max}, got {count}")]
    ChannelCount {
        /// Requested channel count.
        count: usize,
        /// Largest supported channel count.
        max: usize,
    },

    /// Group count must be non-zero and fit into the channel space.
    #[error("Group max must be between 1 and the channel count ({channel_count}), got {group_max}")]
    GroupMax {
        /// Requested group count.
        group_max: usize,
        /// Configured channel count.
        channel_count: usize,
    },
}
