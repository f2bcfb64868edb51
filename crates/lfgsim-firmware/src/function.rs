//! The firmware function table.

use crate::FirmwareError;
use lfgsim_common::SimTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Listen time for a single channel probe.
pub const CHANNEL_PROBE_TIME: SimTime = SimTime::from_millis(50);

/// How long an LFG broadcast stays on the air.
pub const BROADCAST_TIME: SimTime = SimTime::from_millis(2_000);

/// The routines of the node firmware, numbered as the firmware numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FirmwareFunction {
    /// Entry point: picks a channel and a role, then runs it.
    Main = 0,
    /// Sweep the channels listening for LFG broadcasts.
    ScanLfg = 1,
    /// Find a clear channel and broadcast LFG on it.
    BroadcastLfg = 2,
    /// Sweep the channels for one nobody is transmitting on.
    FindClearChannel = 3,
    /// Listen on the current channel for another transmitter.
    CheckChannelBusy = 4,
    /// Key the transmitter with the pending packet.
    TransmitMessageBegin = 5,
    /// Wait out the transmission and unkey.
    TransmitMessageComplete = 6,
}

impl FirmwareFunction {
    /// Every function, in id order.
    pub const ALL: [FirmwareFunction; 7] = [
        FirmwareFunction::Main,
        FirmwareFunction::ScanLfg,
        FirmwareFunction::BroadcastLfg,
        FirmwareFunction::FindClearChannel,
        FirmwareFunction::CheckChannelBusy,
        FirmwareFunction::TransmitMessageBegin,
        FirmwareFunction::TransmitMessageComplete,
    ];

    /// Numeric function id.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Function name as used in logs.
    pub fn name(self) -> &'static str {
        match self {
            FirmwareFunction::Main => "main",
            FirmwareFunction::ScanLfg => "scan_lfg",
            FirmwareFunction::BroadcastLfg => "broadcast_lfg",
            FirmwareFunction::FindClearChannel => "find_clear_channel",
            FirmwareFunction::CheckChannelBusy => "check_channel_busy",
            FirmwareFunction::TransmitMessageBegin => "transmit_message_begin",
            FirmwareFunction::TransmitMessageComplete => "transmit_message_complete",
        }
    }

    /// Time the function is committed for when freshly entered, before its
    /// body runs. Zero means the body runs on the tick it is entered.
    pub fn entry_busy(self) -> SimTime {
        match self {
            FirmwareFunction::CheckChannelBusy => CHANNEL_PROBE_TIME,
            FirmwareFunction::TransmitMessageComplete => BROADCAST_TIME,
            _ => SimTime::ZERO,
        }
    }
}

impl TryFrom<u8> for FirmwareFunction {
    type Error = FirmwareError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        FirmwareFunction::ALL
            .get(id as usize)
            .copied()
            .ok_or(FirmwareError::UnknownFunction(id))
    }
}

impl fmt::Display for FirmwareFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip_through_table() {
        for function in FirmwareFunction::ALL {
            assert_eq!(FirmwareFunction::try_from(function.id()).unwrap(), function);
        }
    }

    #[test]
    fn test_unknown_id_is_rejected() {
        assert!(matches!(
            FirmwareFunction::try_from(7),
            Err(FirmwareError::UnknownFunction(7))
        ));
        assert!(FirmwareFunction::try_from(255).is_err());
    }

    #[test]
    fn test_entry_busy_times() {
        assert_eq!(FirmwareFunction::CheckChannelBusy.entry_busy(), SimTime::from_millis(50));
        assert_eq!(FirmwareFunction::TransmitMessageComplete.entry_busy(), SimTime::from_millis(2000));
        assert!(FirmwareFunction::Main.entry_busy().is_zero());
        assert!(FirmwareFunction::TransmitMessageBegin.entry_busy().is_zero());
    }
}
