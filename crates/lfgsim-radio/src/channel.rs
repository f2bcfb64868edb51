//! Channel plan: the channel space nodes sweep and the initial group channels.

use lfgsim_common::{NodeId, Settings};
use thiserror::Error;

/// Channel index outside the configured channel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Channel {channel} outside channel space of {channel_count}")]
pub struct ChannelError {
    /// Offending channel.
    pub channel: u8,
    /// Configured channel count.
    pub channel_count: u8,
}

/// Result of advancing a sweep by one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStep {
    /// Moved to the next channel.
    Next(u8),
    /// Every channel has been probed; the sweep wraps to channel 0.
    Wrapped,
}

/// Channel space and group layout shared by every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPlan {
    channel_count: u8,
    group_max: u8,
}

impl ChannelPlan {
    /// Create a plan. `channel_count` and `group_max` must be non-zero with
    /// `group_max <= channel_count` (enforced by [`Settings::validate`]).
    pub fn new(channel_count: u8, group_max: u8) -> Self {
        ChannelPlan {
            channel_count: channel_count.max(1),
            group_max: group_max.clamp(1, channel_count.max(1)),
        }
    }

    /// Plan for validated settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.channel_count as u8, settings.group_max as u8)
    }

    /// Number of channels.
    pub fn channel_count(&self) -> u8 {
        self.channel_count
    }

    /// Number of groups.
    pub fn group_max(&self) -> u8 {
        self.group_max
    }

    /// Check that `channel` is inside the channel space.
    pub fn check(&self, channel: u8) -> Result<u8, ChannelError> {
        if channel < self.channel_count {
            Ok(channel)
        } else {
            Err(ChannelError {
                channel,
                channel_count: self.channel_count,
            })
        }
    }

    /// Advance a sweep from `channel` after `probed` channels have been
    /// probed. The sweep moves up modulo the channel count and is exhausted
    /// once every channel has been probed.
    pub fn advance(&self, channel: u8, probed: u8) -> ChannelStep {
        if probed >= self.channel_count {
            ChannelStep::Wrapped
        } else {
            ChannelStep::Next((channel % self.channel_count + 1) % self.channel_count)
        }
    }

    /// Channel a node starts on: groups are spread evenly over the channel
    /// space by `id % group_max`.
    pub fn initial_channel(&self, id: NodeId) -> u8 {
        let spacing = self.channel_count / self.group_max;
        (id.index() % self.group_max as usize) as u8 * spacing
    }
}
