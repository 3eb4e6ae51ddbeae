//! Gauge reward APY pipeline
//!
//! enumerate → classify → collect → price → APR → write

mod apr;
mod kind;
mod pipeline;
mod registry;
mod snapshot;

use crate::networks::{ARBITRUM, OPTIMISM};

/// Chains hosting child gauges
pub const CHILD_CHAINS: [u64; 2] = [OPTIMISM, ARBITRUM];

pub use pipeline::run_gauge_apy;
