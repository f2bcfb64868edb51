//! Free-space signal propagation.
//!
//! Received signal strength is the transmitter's power minus a log-distance
//! path loss:
//!
//! ```text
//! loss = 20·ln(d) + 20·ln(2400) + 32.44
//! ```
//!
//! There is no noise floor and no fading. The model is symmetric in distance
//! but not in power: what A hears from B depends on B's power only.

use lfgsim_common::Vec3;
use serde::Serialize;

/// Carrier frequency baked into the path-loss formula (MHz).
pub const CARRIER_FREQUENCY_MHZ: f64 = 2400.0;

/// Constant term of the path-loss formula (dB).
pub const FSPL_CONSTANT_DB: f64 = 32.44;

/// Minimum path distance in meters for the free-space model.
///
/// Shorter paths (including co-located nodes, which is how every run starts)
/// are evaluated at this distance, giving the strongest signal the model can
/// produce instead of an undefined `ln(0)`.
pub const FSPL_MIN_DISTANCE_M: f64 = 1.0;

/// Which branch of the model produced a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PropagationMethod {
    /// Nodes closer than [`FSPL_MIN_DISTANCE_M`]; loss pinned at the floor.
    NearField,
    /// Regular free-space path loss.
    FreeSpace,
}

/// A single observer/target signal evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalReading {
    /// Euclidean distance between the nodes (m).
    pub distance_m: f64,
    /// Path loss applied (dB).
    pub path_loss_db: f64,
    /// Transmit power minus path loss.
    pub received: f64,
    /// Model branch used.
    pub method: PropagationMethod,
}

impl SignalReading {
    /// Evaluate the signal `observer` receives from a transmitter at `target`.
    pub fn evaluate(observer: &Vec3, target: &Vec3, target_power: f64) -> Self {
        let distance_m = observer.distance_to(target);
        let method = if distance_m < FSPL_MIN_DISTANCE_M {
            PropagationMethod::NearField
        } else {
            PropagationMethod::FreeSpace
        };
        let path_loss_db = free_space_path_loss_db(distance_m);
        SignalReading {
            distance_m,
            path_loss_db,
            received: target_power - path_loss_db,
            method,
        }
    }
}

/// Path loss in dB over `distance_m`, clamped at [`FSPL_MIN_DISTANCE_M`].
pub fn free_space_path_loss_db(distance_m: f64) -> f64 {
    let d = distance_m.max(FSPL_MIN_DISTANCE_M);
    20.0 * d.ln() + 20.0 * CARRIER_FREQUENCY_MHZ.ln() + FSPL_CONSTANT_DB
}

/// Signal strength an observer at `observer` receives from a transmitter at
/// `target` with output power `target_power`.
pub fn received_signal(observer: &Vec3, target: &Vec3, target_power: f64) -> f64 {
    SignalReading::evaluate(observer, target, target_power).received
}
