//! Per-gauge on-chain reads
//!
//! One root-chain batch for a root gauge. A child gauge needs three round
//! trips: emission parameters on the root chain, staking data on the child
//! chain, then the linked vault's share accounting on the child chain.

use alloy_primitives::{Address, U256};
use eyre::{eyre, Result, WrapErr};
use tracing::debug;

use super::kind::{GaugeField, GaugeKind};
use crate::onchain::abi::{IGauge, IVault};
use crate::onchain::{CallBatch, ChainClients};
use crate::vault::{u256_to_f64, VaultSupply, VaultSupplySlots};

/// Reward periods are whole weeks
pub const WEEK: u64 = 604_800;

/// Emission rates and weights are 18-decimal fixed point
const WAD: f64 = 1e18;

/// Start of the reward period containing `timestamp`
pub fn current_period(timestamp: u64) -> u64 {
    timestamp / WEEK * WEEK
}

/// Normalised state of one gauge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeSnapshot {
    pub gauge: Address,
    pub kind: GaugeKind,
    /// Vault staked into the gauge
    pub vault: Address,
    pub inflation_rate: f64,
    pub capped_weight: f64,
    pub tokenless_production: f64,
    pub working_supply: f64,
}

pub async fn collect_snapshot(
    clients: &ChainClients,
    gauge: Address,
    kind: GaugeKind,
    period: u64,
    root_chain: u64,
) -> Result<GaugeSnapshot> {
    let snapshot = match kind {
        GaugeKind::Root => collect_root(clients, gauge, period, root_chain).await,
        GaugeKind::Child { .. } => collect_child(clients, gauge, kind, period, root_chain).await,
    }
    .wrap_err_with(|| format!("Failed to read gauge {}", gauge))?;

    debug!(
        "📊 {} rate={:.6} weight={:.6} tokenless={} ws={:.4}",
        gauge,
        snapshot.inflation_rate,
        snapshot.capped_weight,
        snapshot.tokenless_production,
        snapshot.working_supply
    );
    Ok(snapshot)
}

async fn collect_root(
    clients: &ChainClients,
    gauge: Address,
    period: u64,
    root_chain: u64,
) -> Result<GaugeSnapshot> {
    let client = clients.get(root_chain)?;

    let mut batch = CallBatch::new();
    let rate = batch.add(gauge, IGauge::inflation_rateCall {});
    let weight = batch.add(
        gauge,
        IGauge::getCappedRelativeWeightCall { time: U256::from(period) },
    );
    let tokenless = batch.add(gauge, IGauge::tokenless_productionCall {});
    let decimals = batch.add(gauge, IGauge::decimalsCall {});
    let lp_token = batch.add(gauge, IGauge::lp_tokenCall {});
    let working_supply = batch.add(gauge, IGauge::working_supplyCall {});

    let returns = client.execute(batch).await?;
    let decimals = small_decimals(returns.get(decimals)?)?;

    Ok(GaugeSnapshot {
        gauge,
        kind: GaugeKind::Root,
        vault: returns.get(lp_token)?,
        inflation_rate: u256_to_f64(returns.get(rate)?) / WAD,
        capped_weight: u256_to_f64(returns.get(weight)?) / WAD,
        tokenless_production: u256_to_f64(returns.get(tokenless)?),
        working_supply: scale_down(returns.get(working_supply)?, decimals),
    })
}

async fn collect_child(
    clients: &ChainClients,
    gauge: Address,
    kind: GaugeKind,
    period: u64,
    root_chain: u64,
) -> Result<GaugeSnapshot> {
    // Emission side, root chain
    let root = clients.get(kind.source_chain(GaugeField::Emission, root_chain))?;
    let mut batch = CallBatch::new();
    let params = batch.add(gauge, IGauge::inflation_paramsCall {});
    let weight = batch.add(
        gauge,
        IGauge::getCappedRelativeWeightCall { time: U256::from(period) },
    );
    let returns = root.execute(batch).await?;
    let inflation_rate = u256_to_f64(returns.get(params)?.rate) / WAD;
    let capped_weight = u256_to_f64(returns.get(weight)?) / WAD;

    // Staking side, child chain
    let child = clients.get(kind.source_chain(GaugeField::Staking, root_chain))?;
    let mut batch = CallBatch::new();
    let tokenless = batch.add(gauge, IGauge::tokenless_productionCall {});
    let lp_token = batch.add(gauge, IGauge::lp_tokenCall {});
    let returns = child.execute(batch).await?;
    let tokenless_production = u256_to_f64(returns.get(tokenless)?);
    let vault = returns.get(lp_token)?;

    // Working supply from the gauge's vault shares
    let mut batch = CallBatch::new();
    let decimals = batch.add(vault, IVault::decimalsCall {});
    let balance = batch.add(vault, IVault::balanceOfCall { owner: gauge });
    let supply = VaultSupplySlots::add(&mut batch, vault);
    let returns = child.execute(batch).await?;

    let working_supply = child_working_supply(
        &supply.decode(&returns)?,
        returns.get(balance)?,
        returns.get(decimals)?,
    );

    Ok(GaugeSnapshot {
        gauge,
        kind,
        vault,
        inflation_rate,
        capped_weight,
        tokenless_production,
        working_supply,
    })
}

/// Staked vault shares converted to asset units
fn child_working_supply(supply: &VaultSupply, gauge_shares: U256, decimals: u8) -> f64 {
    supply.assets_per_share() * scale_down(gauge_shares, decimals)
}

fn scale_down(value: U256, decimals: u8) -> f64 {
    u256_to_f64(value) / 10f64.powi(decimals as i32)
}

/// Gauges report `decimals` as uint256
fn small_decimals(value: U256) -> Result<u8> {
    u8::try_from(value).map_err(|_| eyre!("Implausible token decimals {}", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::networks::{ARBITRUM, ETHEREUM, OPTIMISM};
    use crate::testing::serve_rpc;
    use alloy_primitives::address;
    use alloy_sol_types::{SolCall, SolValue};

    const GAUGE: Address = address!("1111111111111111111111111111111111111111");
    const VAULT: Address = address!("2222222222222222222222222222222222222222");

    fn wad(value: u64) -> U256 {
        U256::from(value) * U256::from(10u64).pow(U256::from(18))
    }

    fn is<C: SolCall>(data: &[u8]) -> bool {
        data.starts_with(&C::SELECTOR)
    }

    #[test]
    fn test_period_floor() {
        assert_eq!(current_period(0), 0);
        assert_eq!(current_period(WEEK - 1), 0);
        assert_eq!(current_period(WEEK), WEEK);
        // Thursday 2024-01-04 00:00 UTC starts a period
        assert_eq!(current_period(1_704_326_400), 1_704_326_400);
        assert_eq!(current_period(1_704_326_400 + 3 * 86_400), 1_704_326_400);
    }

    #[test]
    fn test_period_is_multiple_of_week() {
        for ts in [1u64, 1_700_000_000, 1_712_345_678] {
            let p = current_period(ts);
            assert_eq!(p % WEEK, 0);
            assert!(p <= ts && ts - p < WEEK);
        }
    }

    #[test]
    fn test_scale_down() {
        let raw = U256::from(10u64).pow(U256::from(18)) * U256::from(3u64);
        assert_eq!(scale_down(raw, 18), 3.0);
        assert_eq!(scale_down(U256::from(1_500_000u64), 6), 1.5);
        assert_eq!(scale_down(U256::from(7u64), 0), 7.0);
    }

    #[test]
    fn test_small_decimals() {
        assert_eq!(small_decimals(U256::from(18u64)).unwrap(), 18);
        assert!(small_decimals(U256::from(1_000u64)).is_err());
    }

    #[test]
    fn test_child_working_supply() {
        // 1:1 vault (ignoring the offset), gauge holds 250 shares of 18 decimals
        let unit = U256::from(10u64).pow(U256::from(18));
        let supply = VaultSupply {
            vault: Address::ZERO,
            total_assets: unit * U256::from(1_000_000u64),
            total_supply: unit * U256::from(1_000_000u64),
        };
        let ws = child_working_supply(&supply, unit * U256::from(250u64), 18);
        assert!((ws - 250.0).abs() < 1e-6);
    }

    #[test]
    fn test_child_working_supply_empty_vault() {
        let supply = VaultSupply {
            vault: Address::ZERO,
            total_assets: U256::ZERO,
            total_supply: U256::ZERO,
        };
        let ws = child_working_supply(&supply, U256::from(10u64).pow(U256::from(18)), 18);
        assert_eq!(ws, 1e-9);
    }

    #[tokio::test]
    async fn test_child_gauge_reads_each_side_on_its_chain() {
        let period = 1_704_326_400u64;

        // Root chain only knows the emission side
        let root = serve_rpc(move |target, data| {
            if target != GAUGE {
                return None;
            }
            if is::<IGauge::inflation_paramsCall>(data) {
                Some((U256::from(2u64) * wad(1), U256::from(period + WEEK)).abi_encode_params())
            } else if is::<IGauge::getCappedRelativeWeightCall>(data) {
                let call = <IGauge::getCappedRelativeWeightCall as SolCall>::abi_decode(data).ok()?;
                (call.time == U256::from(period)).then(|| (wad(1) / U256::from(4u64)).abi_encode())
            } else {
                None
            }
        })
        .await;

        // Child chain only knows staking and the vault
        let child = serve_rpc(|target, data| {
            if target == GAUGE && is::<IGauge::tokenless_productionCall>(data) {
                Some(U256::from(40u64).abi_encode())
            } else if target == GAUGE && is::<IGauge::lp_tokenCall>(data) {
                Some(VAULT.abi_encode())
            } else if target == VAULT && is::<IVault::decimalsCall>(data) {
                Some(<alloy_sol_types::sol_data::Uint<8> as alloy_sol_types::SolType>::abi_encode(&18u8))
            } else if target == VAULT && is::<IVault::balanceOfCall>(data) {
                let call = <IVault::balanceOfCall as SolCall>::abi_decode(data).ok()?;
                (call.owner == GAUGE).then(|| wad(250).abi_encode())
            } else if target == VAULT
                && (is::<IVault::totalAssetsCall>(data) || is::<IVault::totalSupplyCall>(data))
            {
                Some(wad(1_000_000).abi_encode())
            } else {
                None
            }
        })
        .await;

        let mut config = Config::default();
        for chain in config.rpc.iter_mut() {
            chain.rpc_url = match chain.chain_id {
                ETHEREUM => root.clone(),
                OPTIMISM => child.clone(),
                _ => "http://127.0.0.1:9".to_string(),
            };
        }
        let clients = ChainClients::from_config(&config);

        let kind = GaugeKind::from_type_code(3).unwrap();
        let snapshot = collect_snapshot(&clients, GAUGE, kind, period, ETHEREUM)
            .await
            .unwrap();

        assert_eq!(snapshot.kind, GaugeKind::Child { chain_id: OPTIMISM });
        assert_eq!(snapshot.vault, VAULT);
        assert_eq!(snapshot.inflation_rate, 2.0);
        assert_eq!(snapshot.capped_weight, 0.25);
        assert_eq!(snapshot.tokenless_production, 40.0);
        assert!((snapshot.working_supply - 250.0).abs() < 1e-6);

        // Same gauge read as a root gauge hits only the root node and fails
        let as_root = collect_snapshot(&clients, GAUGE, GaugeKind::Root, period, ETHEREUM).await;
        assert!(as_root.is_err());
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_error() {
        let mut config = Config::default();
        config.rpc.clear();
        let clients = ChainClients::from_config(&config);

        for kind in [GaugeKind::Root, GaugeKind::Child { chain_id: ARBITRUM }] {
            let result = collect_snapshot(&clients, Address::ZERO, kind, 0, ETHEREUM).await;
            assert!(result.is_err());
        }
    }
}
