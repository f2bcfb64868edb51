//! Node-level trace logging for simulation debugging.
//!
//! This module provides selective tracing of individual nodes: firmware calls
//! and returns, busy periods, transmitter changes and landing. Tracing is
//! configured with a spec string and is a no-op for nodes that are not
//! selected.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lfgsim_common::node_tracer::{NodeTracer, NodeTracerConfig};
//!
//! // Trace nodes 0 and 3
//! let tracer = NodeTracer::new(NodeTracerConfig::from_spec("0,node:3"));
//!
//! if tracer.should_trace(NodeId(3)) {
//!     tracer.log_state_change(NodeId(3), sim_time, "channel 4");
//! }
//! ```

use crate::{NodeId, SimTime};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Trace Event Types
// ============================================================================

/// Categories of trace events for filtering and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceCategory {
    /// Firmware routine invoked another routine.
    Call,
    /// Firmware routine handed a value back to its caller.
    Return,
    /// Firmware committed to a busy period.
    Busy,
    /// State change within the node.
    StateChange,
    /// Transmitter switched on or off.
    Radio,
    /// Kinematic milestone (terminal velocity, landing).
    Kinematics,
}

impl fmt::Display for TraceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceCategory::Call => write!(f, "CALL"),
            TraceCategory::Return => write!(f, "RETURN"),
            TraceCategory::Busy => write!(f, "BUSY"),
            TraceCategory::StateChange => write!(f, "STATE"),
            TraceCategory::Radio => write!(f, "RADIO"),
            TraceCategory::Kinematics => write!(f, "KINEMATICS"),
        }
    }
}

/// A trace event record.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    /// Node the event belongs to.
    pub node: NodeId,
    /// Simulation time when the event occurred.
    pub sim_time: SimTime,
    /// Category of the trace event.
    pub category: TraceCategory,
    /// Human-readable description of the event.
    pub description: String,
    /// Optional additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl TraceEvent {
    /// Create a new trace event.
    pub fn new(
        node: NodeId,
        sim_time: SimTime,
        category: TraceCategory,
        description: impl Into<String>,
    ) -> Self {
        TraceEvent {
            node,
            sim_time,
            category,
            description: description.into(),
            details: Vec::new(),
        }
    }

    /// Add a detail to this event.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Render the event as a single trace line.
    pub fn render(&self) -> String {
        let time_ms = self.sim_time.as_micros() as f64 / 1000.0;

        let details_str = if self.details.is_empty() {
            String::new()
        } else {
            let detail_parts: Vec<String> = self
                .details
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            format!(" [{}]", detail_parts.join(", "))
        };

        format!(
            "[TRACE] {} @ {:.3}ms: {} {}{}",
            self.node, time_ms, self.category, self.description, details_str
        )
    }
}

// ============================================================================
// Tracer Configuration
// ============================================================================

/// Configuration for node tracing.
#[derive(Debug, Clone, Default)]
pub struct NodeTracerConfig {
    /// Trace every node.
    pub trace_all: bool,
    /// Node IDs to trace.
    pub traced_ids: HashSet<usize>,
    /// Categories to trace. If empty, all categories are traced.
    pub traced_categories: HashSet<TraceCategory>,
}

impl NodeTracerConfig {
    /// Create a new empty config (no tracing).
    pub fn none() -> Self {
        Self::default()
    }

    /// Create a tracer config from a specification string.
    ///
    /// The spec format is a comma-separated list of:
    /// - Node IDs, bare or prefixed with "node:" (e.g., "3", "node:3")
    /// - "*" to trace all nodes
    ///
    /// Unparseable parts are ignored.
    pub fn from_spec(spec: &str) -> Self {
        let mut config = Self::none();

        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if part == "*" {
                config.trace_all = true;
                continue;
            }
            let id_str = part.strip_prefix("node:").unwrap_or(part);
            if let Ok(id) = id_str.parse::<usize>() {
                config.traced_ids.insert(id);
            }
        }

        config
    }

    /// Check if tracing is enabled at all.
    pub fn is_enabled(&self) -> bool {
        self.trace_all || !self.traced_ids.is_empty()
    }

    /// Check if a specific node should be traced.
    pub fn should_trace(&self, node: NodeId) -> bool {
        self.trace_all || self.traced_ids.contains(&node.0)
    }

    /// Check if a category should be traced.
    pub fn should_trace_category(&self, category: TraceCategory) -> bool {
        self.traced_categories.is_empty() || self.traced_categories.contains(&category)
    }

    /// Add a category filter.
    pub fn with_category(mut self, category: TraceCategory) -> Self {
        self.traced_categories.insert(category);
        self
    }
}

// ============================================================================
// Node Tracer
// ============================================================================

/// Shared, cheaply cloneable tracer.
#[derive(Clone, Default)]
pub struct NodeTracer {
    config: Arc<NodeTracerConfig>,
}

impl NodeTracer {
    /// Create a new node tracer with the given configuration.
    pub fn new(config: NodeTracerConfig) -> Self {
        NodeTracer {
            config: Arc::new(config),
        }
    }

    /// Create a tracer that does no tracing.
    pub fn disabled() -> Self {
        NodeTracer::new(NodeTracerConfig::none())
    }

    /// Check if tracing is enabled at all.
    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Check if a specific node should be traced.
    pub fn should_trace(&self, node: NodeId) -> bool {
        self.config.should_trace(node)
    }

    /// Get the tracer configuration.
    pub fn config(&self) -> &NodeTracerConfig {
        &self.config
    }

    /// Log a trace event.
    pub fn log(&self, event: TraceEvent) {
        if !self.config.should_trace(event.node) {
            return;
        }
        if !self.config.should_trace_category(event.category) {
            return;
        }
        eprintln!("{}", event.render());
    }

    /// Log a firmware call.
    pub fn log_call(
        &self,
        node: NodeId,
        sim_time: SimTime,
        caller: impl fmt::Display,
        callee: impl fmt::Display,
        return_label: u8,
    ) {
        if !self.should_trace(node) {
            return;
        }
        self.log(
            TraceEvent::new(node, sim_time, TraceCategory::Call, format!("{} -> {}", caller, callee))
                .with_detail("label", return_label.to_string()),
        );
    }

    /// Log a firmware return.
    pub fn log_return(
        &self,
        node: NodeId,
        sim_time: SimTime,
        callee: impl fmt::Display,
        caller: impl fmt::Display,
        return_label: u8,
        value: i32,
    ) {
        if !self.should_trace(node) {
            return;
        }
        self.log(
            TraceEvent::new(node, sim_time, TraceCategory::Return, format!("{} -> {}", callee, caller))
                .with_detail("label", return_label.to_string())
                .with_detail("value", value.to_string()),
        );
    }

    /// Log the start of a busy period.
    pub fn log_busy(&self, node: NodeId, sim_time: SimTime, function: impl fmt::Display, duration: SimTime) {
        if !self.should_trace(node) {
            return;
        }
        self.log(
            TraceEvent::new(node, sim_time, TraceCategory::Busy, function.to_string())
                .with_detail("duration_us", duration.as_micros().to_string()),
        );
    }

    /// Log a state change.
    pub fn log_state_change(&self, node: NodeId, sim_time: SimTime, description: impl Into<String>) {
        if !self.should_trace(node) {
            return;
        }
        self.log(TraceEvent::new(node, sim_time, TraceCategory::StateChange, description));
    }

    /// Log a transmitter change.
    pub fn log_radio(&self, node: NodeId, sim_time: SimTime, transmitting: bool, channel: u8) {
        if !self.should_trace(node) {
            return;
        }
        let description = if transmitting { "transmit on" } else { "transmit off" };
        self.log(
            TraceEvent::new(node, sim_time, TraceCategory::Radio, description)
                .with_detail("channel", channel.to_string()),
        );
    }

    /// Log a kinematic milestone.
    pub fn log_kinematics(&self, node: NodeId, sim_time: SimTime, description: impl Into<String>) {
        if !self.should_trace(node) {
            return;
        }
        self.log(TraceEvent::new(node, sim_time, TraceCategory::Kinematics, description));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_spec_empty() {
        let config = NodeTracerConfig::from_spec("");
        assert!(!config.is_enabled());
        assert!(!config.should_trace(NodeId(0)));
    }

    #[test]
    fn test_config_from_spec_ids() {
        let config = NodeTracerConfig::from_spec("1, node:4,bogus");
        assert!(config.is_enabled());
        assert!(config.should_trace(NodeId(1)));
        assert!(config.should_trace(NodeId(4)));
        assert!(!config.should_trace(NodeId(2)));
        assert_eq!(config.traced_ids.len(), 2);
    }

    #[test]
    fn test_config_from_spec_all() {
        let config = NodeTracerConfig::from_spec("*");
        assert!(config.trace_all);
        assert!(config.should_trace(NodeId(999)));
    }

    #[test]
    fn test_category_filter() {
        let config = NodeTracerConfig::from_spec("*").with_category(TraceCategory::Radio);
        assert!(config.should_trace_category(TraceCategory::Radio));
        assert!(!config.should_trace_category(TraceCategory::Call));
    }

    #[test]
    fn test_render() {
        let event = TraceEvent::new(NodeId(2), SimTime::from_micros(1_500), TraceCategory::Call, "main -> scan_lfg")
            .with_detail("label", "0");
        assert_eq!(
            event.render(),
            "[TRACE] node 2 @ 1.500ms: CALL main -> scan_lfg [label=0]"
        );
    }
}
