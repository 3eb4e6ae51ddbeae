//! Gauge enumeration from the controller

use alloy_primitives::{Address, U256};
use eyre::{eyre, Result};
use tracing::{debug, info};

use crate::config::Config;
use crate::onchain::abi::{IGauge, IGaugeController};
use crate::onchain::ChainClient;

/// Live gauges registered on the controller, in registry order
///
/// Hidden gauges are dropped before `is_killed` is read: some of them are
/// not gauges at all and would fail the batch.
pub async fn enumerate_gauges(client: &ChainClient, config: &Config) -> Result<Vec<Address>> {
    let controller = config.gauge_controller;

    let count = client
        .call(controller, IGaugeController::n_gaugesCall {})
        .await?;
    let count: u64 = count
        .try_into()
        .map_err(|_| eyre!("Gauge count {} out of range", count))?;
    debug!("Controller reports {} gauges", count);

    let registered = client
        .read_all((0..count).map(|i| {
            (controller, IGaugeController::gaugesCall { index: U256::from(i) })
        }))
        .await?;

    let visible = strip_hidden(registered, &config.hidden_gauges);

    let killed = client
        .read_all(visible.iter().map(|gauge| (*gauge, IGauge::is_killedCall {})))
        .await?;

    let live = keep_live(visible, &killed)?;
    info!("🔍 {} live gauges ({} registered)", live.len(), count);
    Ok(live)
}

pub(crate) fn strip_hidden(gauges: Vec<Address>, hidden: &[Address]) -> Vec<Address> {
    gauges.into_iter().filter(|g| !hidden.contains(g)).collect()
}

pub(crate) fn keep_live(gauges: Vec<Address>, killed: &[bool]) -> Result<Vec<Address>> {
    if gauges.len() != killed.len() {
        return Err(eyre!(
            "{} kill flags for {} gauges",
            killed.len(),
            gauges.len()
        ));
    }
    Ok(gauges
        .into_iter()
        .zip(killed)
        .filter_map(|(gauge, killed)| (!killed).then_some(gauge))
        .collect())
}
