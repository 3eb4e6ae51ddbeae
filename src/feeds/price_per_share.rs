//! Share price history → `archive/vaults/pricePerShare/{chain}.json`
//!
//! Every run prepends one observation per vault, so the newest value is
//! always first.

use chrono::Utc;
use eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{registered_vaults, FeedContext};
use crate::dataset::{checksum, AddressMap};
use crate::onchain::CallBatch;
use crate::vault::{u256_to_f64, VaultSupply, VaultSupplySlots};

pub fn history_file(chain_id: u64) -> String {
    format!("archive/vaults/pricePerShare/{}.json", chain_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Unix milliseconds
    pub date: i64,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareHistory {
    pub total_assets: Vec<Observation>,
    pub total_supply: Vec<Observation>,
    pub price_per_share: Vec<Observation>,
}

impl ShareHistory {
    pub fn record(&mut self, date: i64, supply: &VaultSupply) {
        let observe = |value| Observation { date, value };
        self.total_assets.insert(0, observe(u256_to_f64(supply.total_assets)));
        self.total_supply.insert(0, observe(u256_to_f64(supply.total_supply)));
        self.price_per_share.insert(0, observe(supply.assets_per_share()));
    }
}

pub async fn run(ctx: &FeedContext<'_>) -> Result<()> {
    // One timestamp for the whole run
    let date = Utc::now().timestamp_millis();

    for chain_id in &ctx.config.feed_chains {
        let client = ctx.clients.get(*chain_id)?;
        let path = history_file(*chain_id);

        let mut data: AddressMap<ShareHistory> = ctx.dataset.load_or_default(&path).await?;
        let vaults = registered_vaults(client).await?;

        let mut batch = CallBatch::new();
        let slots: Vec<VaultSupplySlots> = vaults
            .iter()
            .map(|vault| VaultSupplySlots::add(&mut batch, *vault))
            .collect();
        let returns = client.execute(batch).await?;

        for slot in &slots {
            let supply = slot.decode(&returns)?;
            data.entry(checksum(&supply.vault))
                .or_default()
                .record(date, &supply);
        }

        ctx.dataset.write_json(&path, &data).await?;
        info!("✅ Price per share {}: {} vaults observed", chain_id, slots.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};

    fn supply(assets: u64, shares: u64) -> VaultSupply {
        VaultSupply {
            vault: Address::ZERO,
            total_assets: U256::from(assets),
            total_supply: U256::from(shares),
        }
    }

    #[test]
    fn test_newest_first() {
        let mut history = ShareHistory::default();
        history.record(1_000, &supply(100, 50));
        history.record(2_000, &supply(200, 50));

        assert_eq!(history.total_assets[0], Observation { date: 2_000, value: 200.0 });
        assert_eq!(history.total_assets[1], Observation { date: 1_000, value: 100.0 });
        assert_eq!(history.total_supply.len(), 2);
        assert_eq!(history.price_per_share[0].value, 201.0 / (50.0 + 1e9));
    }

    #[test]
    fn test_empty_vault_price() {
        let mut history = ShareHistory::default();
        history.record(1, &supply(0, 0));
        assert_eq!(history.price_per_share[0].value, 1e-9);
    }

    #[test]
    fn test_existing_history_json() {
        let json = r#"{
            "totalAssets": [{"date": 1700000000000, "value": 5}],
            "totalSupply": [{"date": 1700000000000, "value": 5}],
            "pricePerShare": [{"date": 1700000000000, "value": 1e-9}]
        }"#;
        let mut history: ShareHistory = serde_json::from_str(json).unwrap();
        history.record(1_700_086_400_000, &supply(10, 10));

        assert_eq!(history.total_assets.len(), 2);
        assert_eq!(history.total_assets[0].date, 1_700_086_400_000);
        assert_eq!(history.total_assets[1].value, 5.0);
    }
}
