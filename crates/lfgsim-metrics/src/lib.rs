//! Metrics infrastructure for LFGSim.
//!
//! This crate declares every metric the simulator emits as a structured
//! [`Metric`] constant and re-exports the `metrics` facade. Without an
//! installed recorder all emissions are no-ops.
//!
//! # Example
//!
//! ```rust
//! use lfgsim_metrics::{metric_defs, describe_metrics};
//!
//! describe_metrics();
//! metrics::counter!(metric_defs::CLOCK_TICKS.name).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use lfgsim_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const PROBES: Metric = Metric::counter("lfgsim.example.probes")
///     .with_description("Channel probes started")
///     .with_unit(Unit::Count);
///
/// assert_eq!(PROBES.name, "lfgsim.example.probes");
/// assert_eq!(PROBES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "lfgsim.clock.ticks").
    pub name: &'static str,
    pub kind: MetricKind,
    pub description: &'static str,
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => describe_counter!(self.name, unit, self.description),
            (MetricKind::Counter, None) => describe_counter!(self.name, self.description),
            (MetricKind::Gauge, Some(unit)) => describe_gauge!(self.name, unit, self.description),
            (MetricKind::Gauge, None) => describe_gauge!(self.name, self.description),
            (MetricKind::Histogram, Some(unit)) => describe_histogram!(self.name, unit, self.description),
            (MetricKind::Histogram, None) => describe_histogram!(self.name, self.description),
        }
    }
}

/// All metric definitions for the simulator.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Clock
    // ========================================================================

    /// Simulation ticks executed.
    pub const CLOCK_TICKS: Metric = Metric::counter("lfgsim.clock.ticks")
        .with_description("Simulation ticks executed")
        .with_unit(Unit::Count);

    /// Nodes still above ground.
    pub const CLOCK_MOVING_NODES: Metric = Metric::gauge("lfgsim.clock.moving_nodes")
        .with_description("Nodes still above ground")
        .with_unit(Unit::Count);

    /// Wall-clock time spent in one simulation tick.
    pub const CLOCK_STEP_TIME: Metric = Metric::histogram("lfgsim.clock.step_time_us")
        .with_description("Wall-clock time per simulation tick in microseconds")
        .with_unit(Unit::Microseconds);

    // ========================================================================
    // Firmware
    // ========================================================================

    /// Firmware calls pushed onto call-frame stacks.
    pub const FIRMWARE_CALLS: Metric = Metric::counter("lfgsim.firmware.calls")
        .with_description("Firmware function calls")
        .with_unit(Unit::Count);

    /// Firmware returns pushed onto return-frame stacks.
    pub const FIRMWARE_RETURNS: Metric = Metric::counter("lfgsim.firmware.returns")
        .with_description("Firmware function returns")
        .with_unit(Unit::Count);

    /// Firmware programs that ran to completion.
    ///
    /// Labels: outcome
    pub const FIRMWARE_HALTED: Metric = Metric::counter("lfgsim.firmware.halted")
        .with_description("Firmware programs finished")
        .with_unit(Unit::Count)
        .with_labels(&["outcome"]);

    // ========================================================================
    // Radio / Physics
    // ========================================================================

    /// Transmitters keyed.
    pub const RADIO_TRANSMISSIONS: Metric = Metric::counter("lfgsim.radio.transmissions")
        .with_description("LFG transmissions started")
        .with_unit(Unit::Count);

    /// Nodes that reached the ground.
    pub const PHYSICS_LANDINGS: Metric = Metric::counter("lfgsim.physics.landings")
        .with_description("Nodes that reached the ground")
        .with_unit(Unit::Count);

    /// Every metric, for [`describe_metrics`](super::describe_metrics).
    pub const ALL: &[&Metric] = &[
        &CLOCK_TICKS,
        &CLOCK_MOVING_NODES,
        &CLOCK_STEP_TIME,
        &FIRMWARE_CALLS,
        &FIRMWARE_RETURNS,
        &FIRMWARE_HALTED,
        &RADIO_TRANSMISSIONS,
        &PHYSICS_LANDINGS,
    ];
}

/// Describes all metrics used in the simulator.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}
