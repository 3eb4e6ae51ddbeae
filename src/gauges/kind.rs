//! Root / child gauge classification
//!
//! The controller tags every gauge with a numeric type. Root gauges live
//! entirely on the root chain; a child gauge's emission parameters stay on
//! the root chain while staking happens on its child chain, under the same
//! address.

use alloy_primitives::Address;
use eyre::{eyre, Result};
use tracing::debug;

use crate::config::Config;
use crate::networks::{ARBITRUM, OPTIMISM};
use crate::onchain::abi::IGaugeController;
use crate::onchain::ChainClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeKind {
    Root,
    Child { chain_id: u64 },
}

impl GaugeKind {
    pub fn from_type_code(code: i128) -> Result<Self> {
        match code {
            0..=2 => Ok(GaugeKind::Root),
            3 => Ok(GaugeKind::Child { chain_id: OPTIMISM }),
            4 => Ok(GaugeKind::Child { chain_id: ARBITRUM }),
            other => Err(eyre!("Unknown gauge type code {}", other)),
        }
    }

    /// Chain users stake on (and where the linked vault lives)
    pub fn stake_chain(&self, root_chain: u64) -> u64 {
        self.source_chain(GaugeField::Staking, root_chain)
    }

    /// Chain a group of fields is read from
    pub fn source_chain(&self, field: GaugeField, root_chain: u64) -> u64 {
        match (self, field) {
            (GaugeKind::Root, _) | (GaugeKind::Child { .. }, GaugeField::Emission) => root_chain,
            (GaugeKind::Child { chain_id }, GaugeField::Staking) => *chain_id,
        }
    }
}

/// Field groups read per gauge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeField {
    /// inflation rate, capped relative weight
    Emission,
    /// tokenless production, lp token, working supply
    Staking,
}

/// Type codes for every gauge, in one batch
pub async fn classify_gauges(
    client: &ChainClient,
    config: &Config,
    gauges: &[Address],
) -> Result<Vec<(Address, GaugeKind)>> {
    let codes = client
        .read_all(gauges.iter().map(|gauge| {
            (
                config.gauge_controller,
                IGaugeController::gauge_typesCall { gauge: *gauge },
            )
        }))
        .await?;

    gauges
        .iter()
        .zip(codes)
        .map(|(gauge, code)| {
            let kind = GaugeKind::from_type_code(code)
                .map_err(|e| eyre!("Gauge {}: {}", gauge, e))?;
            debug!("{} → {:?}", gauge, kind);
            Ok((*gauge, kind))
        })
        .collect()
}
