//! Gauge APY feed
//!
//! Produces `gauge-apy-data.json`. The previous file is archived before any
//! request goes out; the new one is written only once every gauge has been
//! evaluated.

use alloy_primitives::Address;
use chrono::Utc;
use eyre::{Result, WrapErr};
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use super::apr::{compute_apr, AprInputs, GaugeApr};
use super::kind::{classify_gauges, GaugeKind};
use super::registry::enumerate_gauges;
use super::snapshot::{collect_snapshot, current_period, GaugeSnapshot};
use crate::config::Config;
use crate::dataset::{archive_date, checksum, AddressMap, Dataset};
use crate::onchain::abi::IVault;
use crate::onchain::ChainClients;
use crate::prices::{PriceOracle, RewardPrice};

pub const OUTPUT_FILE: &str = "gauge-apy-data.json";
pub const ARCHIVE_DIR: &str = "archive/gauge-apy";

/// One row of the output file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeApyEntry {
    pub address: String,
    pub vault: String,
    #[serde(rename = "lowerAPR")]
    pub lower_apr: f64,
    #[serde(rename = "upperAPR")]
    pub upper_apr: f64,
}

/// Evaluated gauge, before assembly
#[derive(Debug, Clone, Copy)]
struct GaugeResult {
    snapshot: GaugeSnapshot,
    apr: GaugeApr,
}

/// Run the whole feed; returns the number of gauges written
pub async fn run_gauge_apy(
    config: &Config,
    clients: &ChainClients,
    oracle: &PriceOracle,
    dataset: &Dataset,
) -> Result<usize> {
    let start = Instant::now();
    let now = Utc::now();

    dataset
        .archive(OUTPUT_FILE, ARCHIVE_DIR, archive_date(now))
        .await?;

    let root = clients.get(config.root_chain_id)?;
    let gauges = enumerate_gauges(root, config).await?;
    let classified = classify_gauges(root, config, &gauges).await?;

    let reward = oracle.reward_token_price(config).await;
    let period = current_period(u64::try_from(now.timestamp())?);
    info!("📅 Reward period starts at {}", period);

    let progress = ProgressBar::new(classified.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} gauges [{bar:30}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let results: Vec<GaugeResult> = stream::iter(classified)
        .map(|(gauge, kind)| evaluate_gauge(config, clients, oracle, reward, gauge, kind, period))
        .buffered(config.max_concurrent_gauges)
        .inspect(|_| progress.inc(1))
        .try_collect()
        .await?;
    progress.finish_and_clear();

    let output = assemble(&results);
    dataset.write_json(OUTPUT_FILE, &output).await?;

    info!(
        "✅ Gauge APY: {} gauges in {:.1}s (reward ${:.6} via {})",
        output.len(),
        start.elapsed().as_secs_f64(),
        reward.price_usd,
        reward.source
    );
    Ok(output.len())
}

async fn evaluate_gauge(
    config: &Config,
    clients: &ChainClients,
    oracle: &PriceOracle,
    reward: RewardPrice,
    gauge: Address,
    kind: GaugeKind,
    period: u64,
) -> Result<GaugeResult> {
    let snapshot = collect_snapshot(clients, gauge, kind, period, config.root_chain_id).await?;

    let stake_chain = snapshot.kind.stake_chain(config.root_chain_id);
    let asset = clients
        .get(stake_chain)?
        .call(snapshot.vault, IVault::assetCall {})
        .await
        .wrap_err_with(|| format!("Failed to read asset of vault {}", snapshot.vault))?;
    let asset_price_usd = oracle
        .token_price(stake_chain, asset)
        .await
        .wrap_err_with(|| format!("No price for asset of gauge {}", gauge))?;

    let apr = compute_apr(&AprInputs {
        inflation_rate: snapshot.inflation_rate,
        capped_weight: snapshot.capped_weight,
        tokenless_production: snapshot.tokenless_production,
        working_supply: snapshot.working_supply,
        asset_price_usd,
        reward_price_usd: reward.price_usd,
        reward_discount: config.reward_discount,
    });

    Ok(GaugeResult { snapshot, apr })
}

fn assemble(results: &[GaugeResult]) -> AddressMap<GaugeApyEntry> {
    results
        .iter()
        .map(|r| {
            let address = checksum(&r.snapshot.gauge);
            let entry = GaugeApyEntry {
                address: address.clone(),
                vault: checksum(&r.snapshot.vault),
                lower_apr: r.apr.lower,
                upper_apr: r.apr.upper,
            };
            (address, entry)
        })
        .collect()
}
