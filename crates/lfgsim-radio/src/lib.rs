//! # lfgsim-radio
//!
//! Radio model for LFGSim.
//!
//! This crate provides:
//! - **Signal model**: free-space path loss between two nodes at 2.4 GHz,
//!   with a near-field floor for co-located nodes
//! - **Channel plan**: channel-space size, sweep order, wrap-around and the
//!   initial group channel of each node

mod channel;
mod signal;

pub use channel::{ChannelError, ChannelPlan, ChannelStep};
pub use signal::{
    free_space_path_loss_db, received_signal, PropagationMethod, SignalReading,
    CARRIER_FREQUENCY_MHZ, FSPL_CONSTANT_DB, FSPL_MIN_DISTANCE_M,
};
