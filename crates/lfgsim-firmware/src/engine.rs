//! The per-node cooperative dispatcher.
//!
//! Once per tick every active node gets one dispatch slot, in ascending id
//! order. A slot first settles the busy timer of the current function; only
//! when the timer has run out does the function body run, and whatever
//! [`Transition`] it asks for is applied to the node's frame stacks before the
//! next node is dispatched. Nodes dispatched later in a tick therefore see the
//! radio state earlier nodes left behind in the same tick.

use crate::node::{Busy, Node};
use crate::program::{self, Context, Entry, Peers, Transition};
use crate::tracer::NodeTracer;
use crate::{FirmwareError, FirmwareFunction};
use lfgsim_common::{SimTime, Settings};
use lfgsim_radio::ChannelPlan;

/// Result of one node's dispatch slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStep {
    /// Landed or halted; nothing ran.
    Idle,
    /// The current function is still busy.
    Blocked,
    /// The function body ran and produced this transition.
    Ran(Transition),
}

/// Aggregate of one engine tick over all nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineTick {
    /// Nodes whose function body ran.
    pub dispatched: usize,
    /// Nodes waiting out a busy timer.
    pub blocked: usize,
    pub calls: usize,
    pub returns: usize,
    /// Transmitters keyed this tick.
    pub transmissions: usize,
    /// Programs that finished this tick.
    pub halted: usize,
}

/// Emulated MCU scheduler shared by all nodes.
#[derive(Clone)]
pub struct FirmwareEngine {
    plan: ChannelPlan,
    broadcast_count: usize,
    tick: SimTime,
    tracer: NodeTracer,
}

impl FirmwareEngine {
    /// Create an engine that advances busy timers by `tick` per dispatch.
    pub fn new(plan: ChannelPlan, broadcast_count: usize, tick: SimTime, tracer: NodeTracer) -> Self {
        FirmwareEngine {
            plan,
            broadcast_count,
            tick,
            tracer,
        }
    }

    /// Engine for validated settings.
    pub fn from_settings(settings: &Settings, tracer: NodeTracer) -> Self {
        Self::new(
            ChannelPlan::from_settings(settings),
            settings.broadcast_count,
            settings.tick(),
            tracer,
        )
    }

    pub fn plan(&self) -> &ChannelPlan {
        &self.plan
    }

    /// Dispatch every node once, in ascending id order.
    pub fn tick_all(&self, nodes: &mut [Node], now: SimTime) -> Result<EngineTick, FirmwareError> {
        let mut summary = EngineTick::default();
        for index in 0..nodes.len() {
            let was_transmitting = nodes[index].radio.transmit_active;
            match self.tick_node(nodes, index, now)? {
                NodeStep::Idle => {}
                NodeStep::Blocked => summary.blocked += 1,
                NodeStep::Ran(transition) => {
                    summary.dispatched += 1;
                    match transition {
                        Transition::Call { .. } => summary.calls += 1,
                        Transition::Return(_) => summary.returns += 1,
                        Transition::Halt(_) => summary.halted += 1,
                    }
                }
            }
            if !was_transmitting && nodes[index].radio.transmit_active {
                summary.transmissions += 1;
            }
        }
        Ok(summary)
    }

    /// Run the dispatch slot of `nodes[index]`. An index past the end of the
    /// registry is idle.
    pub fn tick_node(&self, nodes: &mut [Node], index: usize, now: SimTime) -> Result<NodeStep, FirmwareError> {
        if index >= nodes.len() {
            return Ok(NodeStep::Idle);
        }
        let (before, rest) = nodes.split_at_mut(index);
        let Some((node, after)) = rest.split_first_mut() else {
            return Ok(NodeStep::Idle);
        };

        if !node.is_active() {
            return Ok(NodeStep::Idle);
        }
        if !self.settle_busy(node, now) {
            return Ok(NodeStep::Blocked);
        }

        let function = node.mcu.current_function;
        let entry = self.entry(node)?;
        let ctx = Context {
            plan: &self.plan,
            broadcast_count: self.broadcast_count,
            peers: Peers::new(before, after),
        };
        let was_transmitting = node.radio.transmit_active;
        let transition = program::step(function, node, entry, &ctx)?;

        if was_transmitting != node.radio.transmit_active {
            self.tracer
                .log_radio(node.id, now, node.radio.transmit_active, node.radio.active_channel);
        }
        self.apply(node, function, transition, now)?;

        let channel = node.radio.active_channel;
        self.plan
            .check(channel)
            .map_err(|source| FirmwareError::ChannelOutOfRange { node: node.id, source })?;

        Ok(NodeStep::Ran(transition))
    }

    /// Charge or count down the busy timer. Returns `true` when the function
    /// body may run this tick.
    fn settle_busy(&self, node: &mut Node, now: SimTime) -> bool {
        match node.mcu.busy {
            Busy::NotStarted => {
                let function = node.mcu.current_function;
                let cost = function.entry_busy();
                node.mcu.busy = Busy::Remaining(cost);
                if cost.is_zero() {
                    return true;
                }
                node.mcu.busy_accumulated += cost;
                self.tracer.log_busy(node.id, now, function, cost);
                false
            }
            Busy::Remaining(left) if left.is_zero() => true,
            Busy::Remaining(left) => {
                let left = left.saturating_sub(self.tick);
                node.mcu.busy = Busy::Remaining(left);
                left.is_zero()
            }
        }
    }

    /// Decide how the current function is entered, consuming a pending
    /// return frame.
    fn entry(&self, node: &mut Node) -> Result<Entry, FirmwareError> {
        if !node.mcu.pending_resume {
            return Ok(Entry::Fresh);
        }
        node.mcu.pending_resume = false;
        node.mcu
            .return_stack
            .pop()
            .map(Entry::Resume)
            .ok_or(FirmwareError::ReturnStackUnderflow { node: node.id })
    }

    fn apply(
        &self,
        node: &mut Node,
        function: FirmwareFunction,
        transition: Transition,
        now: SimTime,
    ) -> Result<(), FirmwareError> {
        match transition {
            Transition::Call { callee, return_label } => {
                node.mcu.call_stack.push(function, return_label);
                node.mcu.current_function = callee;
                node.mcu.busy = Busy::NotStarted;
                self.tracer.log_call(node.id, now, function, callee, return_label);
                log::trace!("{} call {} -> {} [label {}]", node.id, function, callee, return_label);
            }
            Transition::Return(value) => {
                let frame = node
                    .mcu
                    .call_stack
                    .pop()
                    .ok_or(FirmwareError::CallStackUnderflow { node: node.id })?;
                node.mcu.return_stack.push(function, frame.return_label, value);
                node.mcu.return_value = value;
                node.mcu.current_function = frame.caller;
                node.mcu.busy = Busy::Remaining(SimTime::ZERO);
                node.mcu.pending_resume = true;
                self.tracer
                    .log_return(node.id, now, function, frame.caller, frame.return_label, value);
                log::trace!("{} return {} -> {} = {}", node.id, function, frame.caller, value);
            }
            Transition::Halt(outcome) => {
                node.mcu.outcome = Some(outcome);
                self.tracer
                    .log_state_change(node.id, now, format!("halted: {}", outcome));
                log::debug!("{} halted at {}s: {}", node.id, now, outcome);
            }
        }
        Ok(())
    }
}
