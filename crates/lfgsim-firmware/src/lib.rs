//! # lfgsim-firmware
//!
//! Emulated node microcontroller for LFGSim.
//!
//! Every node runs the same fixed firmware program of seven functions. The
//! MCU is cooperative: instead of native call frames each node keeps an
//! explicit call-frame stack and return-frame stack, so a function can stay
//! busy for simulated milliseconds and resume on a later tick without
//! blocking the simulation loop.
//!
//! ## Usage
//!
//! ```
//! use lfgsim_common::{Kinematics, NodeId, SimTime, Vec3};
//! use lfgsim_firmware::{FirmwareEngine, Node, NodeTracer};
//! use lfgsim_radio::ChannelPlan;
//!
//! let engine = FirmwareEngine::new(
//!     ChannelPlan::new(16, 5),
//!     1,
//!     SimTime::from_millis(1),
//!     NodeTracer::disabled(),
//! );
//! let kinematics = Kinematics::at_rest(Vec3::new(0.0, 0.0, 100.0), 9.80665, 8.0);
//! let mut nodes = vec![Node::new(NodeId(0), kinematics, 400.0, 1, 5)];
//! let summary = engine.tick_all(&mut nodes, SimTime::from_millis(1))?;
//! assert_eq!(summary.calls, 1);
//! # Ok::<(), lfgsim_firmware::FirmwareError>(())
//! ```

pub mod engine;
pub mod function;
pub mod node;
pub mod program;
pub mod stack;
pub mod tracer;

pub use engine::{EngineTick, FirmwareEngine, NodeStep};
pub use function::{FirmwareFunction, BROADCAST_TIME, CHANNEL_PROBE_TIME};
pub use node::{Busy, GroupList, LfgOutcome, McuState, Node, LFG_PAYLOAD};
pub use program::Transition;
pub use stack::{CallFrame, CallFrameStack, ReturnFrame, ReturnFrameStack};
pub use tracer::NodeTracer;

use lfgsim_common::NodeId;
use lfgsim_radio::ChannelError;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Firmware invariant violations. Any of these stops the run.
#[derive(Debug, Error)]
pub enum FirmwareError {
    /// A function returned with no suspended caller.
    #[error("{node}: call stack underflow")]
    CallStackUnderflow { node: NodeId },

    /// A function was resumed with no return frame to consume.
    #[error("{node}: return stack underflow")]
    ReturnStackUnderflow { node: NodeId },

    /// A function was resumed from a call site it never made.
    #[error("{node}: {function} resumed from {from} with unexpected label {label}")]
    UnexpectedReturn {
        node: NodeId,
        function: FirmwareFunction,
        from: FirmwareFunction,
        label: u8,
    },

    /// Function id outside the firmware table.
    #[error("Unknown firmware function id {0}")]
    UnknownFunction(u8),

    /// A node left the channel space.
    #[error("{node}: {source}")]
    ChannelOutOfRange {
        node: NodeId,
        #[source]
        source: ChannelError,
    },
}
