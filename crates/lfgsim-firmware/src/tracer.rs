//! Firmware tracing support using the common node tracer.
//!
//! The engine reports calls, returns, busy periods, transmitter changes and
//! program completion through these types.

pub use lfgsim_common::node_tracer::{
    NodeTracer, NodeTracerConfig, TraceCategory, TraceEvent,
};
