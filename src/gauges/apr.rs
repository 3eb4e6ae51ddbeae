//! Gauge reward APR
//!
//! ```text
//! relative = inflation_rate * capped_weight
//! reward   = relative * SECONDS_PER_YEAR * reward_price * discount
//! upper    = reward / (working_supply * asset_price)
//! lower    = upper * tokenless_production / 100
//! ```
//!
//! Both bounds are returned as percentages. Without emissions both are 0.

use serde::Serialize;

pub const SECONDS_PER_YEAR: f64 = 86_400.0 * 365.0;

/// Working supply assumed for a gauge nobody boosts in
pub const WORKING_SUPPLY_FLOOR: f64 = 1e18;

/// Normalised inputs of one gauge
#[derive(Debug, Clone, Copy)]
pub struct AprInputs {
    /// Reward tokens per second (already / 1e18)
    pub inflation_rate: f64,
    /// Share of emissions for this period (already / 1e18)
    pub capped_weight: f64,
    /// Percent of rewards paid without boost, 0..=100
    pub tokenless_production: f64,
    /// Boost-adjusted staked amount in asset units
    pub working_supply: f64,
    pub asset_price_usd: f64,
    pub reward_price_usd: f64,
    pub reward_discount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GaugeApr {
    #[serde(rename = "lowerAPR")]
    pub lower: f64,
    #[serde(rename = "upperAPR")]
    pub upper: f64,
}

impl GaugeApr {
    pub const ZERO: GaugeApr = GaugeApr { lower: 0.0, upper: 0.0 };
}

pub fn compute_apr(inputs: &AprInputs) -> GaugeApr {
    let relative_inflation = inputs.inflation_rate * inputs.capped_weight;
    if relative_inflation <= 0.0 {
        return GaugeApr::ZERO;
    }

    let annual_reward_usd = relative_inflation
        * SECONDS_PER_YEAR
        * (inputs.reward_price_usd * inputs.reward_discount);

    let working_supply = if inputs.working_supply > 0.0 {
        inputs.working_supply
    } else {
        WORKING_SUPPLY_FLOOR
    };
    let working_supply_usd = working_supply * inputs.asset_price_usd;

    let upper = annual_reward_usd / working_supply_usd;
    let tokenless = inputs.tokenless_production.clamp(0.0, 100.0);
    let lower = upper * tokenless / 100.0;

    GaugeApr {
        lower: lower * 100.0,
        upper: upper * 100.0,
    }
}
