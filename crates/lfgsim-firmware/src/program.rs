//! The node firmware program.
//!
//! Each routine runs one step of its function body and reports what the
//! dispatcher should do next as a [`Transition`]. A routine that needs another
//! function's result asks for a [`Transition::Call`] and is re-entered with
//! [`Entry::Resume`] once the callee has returned, branching on the return
//! label to tell its call sites apart.

use crate::node::{LfgOutcome, Node, LFG_PAYLOAD};
use crate::stack::ReturnFrame;
use crate::{FirmwareError, FirmwareFunction};
use lfgsim_radio::{received_signal, ChannelPlan, ChannelStep};

/// Value returned by a sweep that probed every channel without success.
pub const NOT_FOUND: i32 = -1;

/// Value `check_channel_busy` returns for an occupied channel.
pub const CHANNEL_BUSY: i32 = 1;

/// Value `check_channel_busy` returns for a clear channel.
pub const CHANNEL_CLEAR: i32 = 0;

/// What the dispatcher does after a routine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Suspend the current function and enter `callee`.
    Call { callee: FirmwareFunction, return_label: u8 },
    /// Hand `value` back to the suspended caller.
    Return(i32),
    /// The program is finished.
    Halt(LfgOutcome),
}

/// How the current function is being entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// First step of the function body.
    Fresh,
    /// A callee returned; this is its return frame.
    Resume(ReturnFrame),
}

/// Read-only view of every node except the one being dispatched.
///
/// Nodes before the dispatched one have already run this tick; nodes after it
/// still show last tick's state.
#[derive(Debug, Clone, Copy)]
pub struct Peers<'a> {
    before: &'a [Node],
    after: &'a [Node],
}

impl<'a> Peers<'a> {
    pub fn new(before: &'a [Node], after: &'a [Node]) -> Self {
        Peers { before, after }
    }

    /// No other nodes.
    pub fn none() -> Self {
        Peers { before: &[], after: &[] }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Node> + 'a {
        self.before.iter().chain(self.after.iter())
    }

    /// Peers currently transmitting on `channel`.
    pub fn transmitting_on(&self, channel: u8) -> impl Iterator<Item = &'a Node> + 'a {
        self.iter()
            .filter(move |peer| peer.radio.transmit_active && peer.radio.active_channel == channel)
    }
}

/// Everything a routine may read besides its own node.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub plan: &'a ChannelPlan,
    /// Nodes with an id below this broadcast; the rest scan.
    pub broadcast_count: usize,
    pub peers: Peers<'a>,
}

/// Run one step of `function` on `node`.
pub fn step(
    function: FirmwareFunction,
    node: &mut Node,
    entry: Entry,
    ctx: &Context<'_>,
) -> Result<Transition, FirmwareError> {
    match function {
        FirmwareFunction::Main => main(node, entry, ctx),
        FirmwareFunction::ScanLfg => scan_lfg(node, entry, ctx),
        FirmwareFunction::BroadcastLfg => broadcast_lfg(node, entry),
        FirmwareFunction::FindClearChannel => find_clear_channel(node, entry, ctx),
        FirmwareFunction::CheckChannelBusy => Ok(check_channel_busy(node, ctx)),
        FirmwareFunction::TransmitMessageBegin => Ok(transmit_message_begin(node)),
        FirmwareFunction::TransmitMessageComplete => Ok(transmit_message_complete(node)),
    }
}

fn unexpected(node: &Node, function: FirmwareFunction, frame: &ReturnFrame) -> FirmwareError {
    FirmwareError::UnexpectedReturn {
        node: node.id,
        function,
        from: frame.from,
        label: frame.return_label,
    }
}

fn call(callee: FirmwareFunction, return_label: u8) -> Transition {
    Transition::Call { callee, return_label }
}

// ============================================================================
// Routines
// ============================================================================

fn main(node: &mut Node, entry: Entry, ctx: &Context<'_>) -> Result<Transition, FirmwareError> {
    match entry {
        Entry::Fresh => {
            node.radio.active_channel = ctx.plan.initial_channel(node.id);
            if node.id.index() < ctx.broadcast_count {
                Ok(call(FirmwareFunction::BroadcastLfg, 1))
            } else {
                Ok(call(FirmwareFunction::ScanLfg, 0))
            }
        }
        Entry::Resume(ReturnFrame {
            from: FirmwareFunction::ScanLfg,
            return_label: 0,
            ..
        }) => {
            let outcome = match node.mcu.group_list.first() {
                Some(peer) => LfgOutcome::Joined { peer: peer.index() },
                None => LfgOutcome::ScanExhausted,
            };
            Ok(Transition::Halt(outcome))
        }
        Entry::Resume(ReturnFrame {
            from: FirmwareFunction::BroadcastLfg,
            return_label: 1,
            value,
        }) => {
            let outcome = match u8::try_from(value) {
                Ok(channel) => LfgOutcome::Broadcast { channel },
                Err(_) => LfgOutcome::NoClearChannel,
            };
            Ok(Transition::Halt(outcome))
        }
        Entry::Resume(frame) => Err(unexpected(node, FirmwareFunction::Main, &frame)),
    }
}

fn scan_lfg(node: &mut Node, entry: Entry, ctx: &Context<'_>) -> Result<Transition, FirmwareError> {
    match entry {
        Entry::Fresh => {
            node.radio.active_channel = 0;
            node.mcu.sweep_probes = 0;
            Ok(call(FirmwareFunction::CheckChannelBusy, 0))
        }
        Entry::Resume(ReturnFrame {
            from: FirmwareFunction::CheckChannelBusy,
            return_label: 0,
            value,
        }) => {
            if value == CHANNEL_BUSY {
                listen_for_lfg(node, ctx);
            }
            Ok(sweep(node, ctx.plan))
        }
        Entry::Resume(frame) => Err(unexpected(node, FirmwareFunction::ScanLfg, &frame)),
    }
}

fn broadcast_lfg(node: &mut Node, entry: Entry) -> Result<Transition, FirmwareError> {
    match entry {
        Entry::Fresh => Ok(call(FirmwareFunction::FindClearChannel, 0)),
        Entry::Resume(frame) => match (frame.from, frame.return_label) {
            (FirmwareFunction::FindClearChannel, 0) if frame.value >= 0 => {
                node.mcu.send_packet = LFG_PAYLOAD.to_string();
                Ok(call(FirmwareFunction::TransmitMessageBegin, 1))
            }
            (FirmwareFunction::FindClearChannel, 0) => Ok(Transition::Return(NOT_FOUND)),
            (FirmwareFunction::TransmitMessageBegin, 1) => {
                Ok(call(FirmwareFunction::TransmitMessageComplete, 2))
            }
            (FirmwareFunction::TransmitMessageComplete, 2) => {
                Ok(Transition::Return(node.radio.active_channel as i32))
            }
            _ => Err(unexpected(node, FirmwareFunction::BroadcastLfg, &frame)),
        },
    }
}

fn find_clear_channel(node: &mut Node, entry: Entry, ctx: &Context<'_>) -> Result<Transition, FirmwareError> {
    match entry {
        Entry::Fresh => {
            node.mcu.sweep_probes = 0;
            Ok(call(FirmwareFunction::CheckChannelBusy, 0))
        }
        Entry::Resume(ReturnFrame {
            from: FirmwareFunction::CheckChannelBusy,
            return_label: 0,
            value,
        }) => {
            if value == CHANNEL_BUSY {
                Ok(sweep(node, ctx.plan))
            } else {
                Ok(Transition::Return(node.radio.active_channel as i32))
            }
        }
        Entry::Resume(frame) => Err(unexpected(node, FirmwareFunction::FindClearChannel, &frame)),
    }
}

fn check_channel_busy(node: &Node, ctx: &Context<'_>) -> Transition {
    let busy = ctx
        .peers
        .transmitting_on(node.radio.active_channel)
        .next()
        .is_some();
    Transition::Return(if busy { CHANNEL_BUSY } else { CHANNEL_CLEAR })
}

fn transmit_message_begin(node: &mut Node) -> Transition {
    node.radio.transmit_active = true;
    Transition::Return(1)
}

fn transmit_message_complete(node: &mut Node) -> Transition {
    node.radio.transmit_active = false;
    Transition::Return(1)
}

// ============================================================================
// Helpers
// ============================================================================

/// Count the probe that just finished, then move the sweep to the next channel
/// and probe it, or give up once every channel has been probed.
fn sweep(node: &mut Node, plan: &ChannelPlan) -> Transition {
    node.mcu.sweep_probes = node.mcu.sweep_probes.saturating_add(1);
    match plan.advance(node.radio.active_channel, node.mcu.sweep_probes) {
        ChannelStep::Next(channel) => {
            node.radio.active_channel = channel;
            call(FirmwareFunction::CheckChannelBusy, 0)
        }
        ChannelStep::Wrapped => {
            node.radio.active_channel = 0;
            Transition::Return(NOT_FOUND)
        }
    }
}

/// Measure every peer transmitting on our channel and note it as a
/// prospective group member. The payload itself is not decoded.
fn listen_for_lfg(node: &mut Node, ctx: &Context<'_>) {
    let channel = node.radio.active_channel;
    for peer in ctx.peers.transmitting_on(channel) {
        let signal = received_signal(
            &node.kinematics.position,
            &peer.kinematics.position,
            peer.radio.power_output,
        );
        if let Some(slot) = node.radio.received_signal.get_mut(peer.id.index()) {
            *slot = signal;
        }
        if node.mcu.group_list.insert(peer.id) {
            log::debug!("{} heard {} on channel {} ({:.2})", node.id, peer.id, channel, signal);
        }
    }
}
