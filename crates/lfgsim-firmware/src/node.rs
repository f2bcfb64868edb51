//! Per-node state: kinematics, radio, and the emulated MCU.

use crate::stack::{CallFrameStack, ReturnFrameStack};
use crate::FirmwareFunction;
use lfgsim_common::{Kinematics, NodeId, RadioState, SimTime};
use serde::Serialize;
use std::fmt;

/// Payload of an LFG broadcast.
pub const LFG_PAYLOAD: &str = "LFG";

// ============================================================================
// Busy Timer
// ============================================================================

/// Busy timer of the current function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Busy {
    /// Freshly entered; the entry cost has not been charged yet.
    #[default]
    NotStarted,
    /// Time left before the function body may run. Never negative.
    Remaining(SimTime),
}

impl Busy {
    /// Whether the function body may run now.
    pub fn is_elapsed(&self) -> bool {
        matches!(self, Busy::Remaining(t) if t.is_zero())
    }
}

// ============================================================================
// Group List
// ============================================================================

/// Fixed-capacity list of peers heard during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupList {
    slots: Vec<Option<NodeId>>,
}

impl GroupList {
    /// An empty list with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        GroupList {
            slots: vec![None; capacity],
        }
    }

    /// Record `peer` in the first free slot.
    ///
    /// Returns `false` when the peer is already listed or the list is full.
    pub fn insert(&mut self, peer: NodeId) -> bool {
        if self.contains(peer) {
            return false;
        }
        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(peer);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, peer: NodeId) -> bool {
        self.slots.contains(&Some(peer))
    }

    /// First recorded peer.
    pub fn first(&self) -> Option<NodeId> {
        self.slots.iter().flatten().next().copied()
    }

    /// Recorded peers in slot order.
    pub fn peers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().flatten().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slots as the firmware stores them, `-1` marking an empty slot.
    pub fn raw(&self) -> Vec<i64> {
        self.slots
            .iter()
            .map(|slot| slot.map_or(-1, |id| id.index() as i64))
            .collect()
    }
}

// ============================================================================
// Program Outcome
// ============================================================================

/// How a node's firmware program ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LfgOutcome {
    /// Swept every channel without hearing anyone.
    ScanExhausted,
    /// Heard a transmitting peer during the sweep.
    Joined { peer: usize },
    /// Broadcast LFG on a clear channel.
    Broadcast { channel: u8 },
    /// Every channel was occupied; nothing was sent.
    NoClearChannel,
}

impl LfgOutcome {
    /// Short label for metrics and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            LfgOutcome::ScanExhausted => "scan_exhausted",
            LfgOutcome::Joined { .. } => "joined",
            LfgOutcome::Broadcast { .. } => "broadcast",
            LfgOutcome::NoClearChannel => "no_clear_channel",
        }
    }
}

impl fmt::Display for LfgOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LfgOutcome::ScanExhausted => write!(f, "scan exhausted"),
            LfgOutcome::Joined { peer } => write!(f, "joined node {}", peer),
            LfgOutcome::Broadcast { channel } => write!(f, "broadcast on channel {}", channel),
            LfgOutcome::NoClearChannel => write!(f, "no clear channel"),
        }
    }
}

// ============================================================================
// MCU State
// ============================================================================

/// Emulated microcontroller state of one node.
#[derive(Debug, Clone)]
pub struct McuState {
    pub current_function: FirmwareFunction,
    pub busy: Busy,
    pub call_stack: CallFrameStack,
    pub return_stack: ReturnFrameStack,
    /// Last value handed back by a returning function.
    pub return_value: i32,
    /// A callee has returned and the current function has not consumed its
    /// return frame yet.
    pub pending_resume: bool,
    /// Total busy time committed so far.
    pub busy_accumulated: SimTime,
    /// Channels probed by the sweep in progress.
    pub sweep_probes: u8,
    pub group_list: GroupList,
    pub send_packet: String,
    /// Set once `main` has consumed its callee's result.
    pub outcome: Option<LfgOutcome>,
}

impl McuState {
    /// Fresh MCU about to enter `main`.
    pub fn new(group_max: usize) -> Self {
        McuState {
            current_function: FirmwareFunction::Main,
            busy: Busy::NotStarted,
            call_stack: CallFrameStack::new(),
            return_stack: ReturnFrameStack::new(),
            return_value: 0,
            pending_resume: false,
            busy_accumulated: SimTime::ZERO,
            sweep_probes: 0,
            group_list: GroupList::new(group_max),
            send_packet: String::new(),
            outcome: None,
        }
    }

    /// Whether the program has finished.
    pub fn is_halted(&self) -> bool {
        self.outcome.is_some()
    }
}

// ============================================================================
// Node
// ============================================================================

/// A simulated falling node.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kinematics: Kinematics,
    pub radio: RadioState,
    pub mcu: McuState,
}

impl Node {
    /// Create a node with an idle radio and a fresh MCU.
    pub fn new(id: NodeId, kinematics: Kinematics, power_output: f64, node_count: usize, group_max: usize) -> Self {
        Node {
            id,
            kinematics,
            radio: RadioState::new(power_output, node_count),
            mcu: McuState::new(group_max),
        }
    }

    /// Whether the dispatcher still runs this node.
    pub fn is_active(&self) -> bool {
        !self.kinematics.is_landed() && !self.mcu.is_halted()
    }
}
