//! Vault registry feed → `archive/vaults/{chain}.json`

use alloy_primitives::Address;
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{registered_vaults, FeedContext};
use crate::dataset::{checksum, AddressMap};
use crate::networks::require_network;
use crate::onchain::abi::{IVault, IVaultRegistry};
use crate::onchain::{CallBatch, ChainClient};

pub const VAULT_TYPE: &str = "single-asset-vault-v1";

pub fn vaults_file(chain_id: u64) -> String {
    format!("archive/vaults/{}.json", chain_id)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultFees {
    pub deposit: u64,
    pub withdrawal: u64,
    pub management: u64,
    pub performance: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultEntry {
    pub address: String,
    pub asset_address: String,
    pub chain_id: u64,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub creator: String,
    #[serde(default)]
    pub strategies: Vec<String>,
    #[serde(default)]
    pub fees: VaultFees,
    #[serde(default)]
    pub fee_recipient: String,
    /// Hand-maintained fields are carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl VaultEntry {
    fn new(vault: Address, asset: Address, creator: Address, chain_id: u64) -> Self {
        Self {
            address: checksum(&vault),
            asset_address: checksum(&asset),
            chain_id,
            kind: VAULT_TYPE.to_string(),
            description: String::new(),
            creator: checksum(&creator),
            strategies: Vec::new(),
            fees: VaultFees::default(),
            fee_recipient: String::new(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Current configuration of a registered vault
#[derive(Debug, Clone, Copy)]
struct VaultSettings {
    strategy: Address,
    fees: VaultFees,
    fee_recipient: Address,
}

pub async fn run(ctx: &FeedContext<'_>) -> Result<()> {
    for chain_id in &ctx.config.feed_chains {
        let client = ctx.clients.get(*chain_id)?;
        let path = vaults_file(*chain_id);

        let mut data: AddressMap<VaultEntry> = ctx.dataset.load_or_default(&path).await?;
        let vaults = registered_vaults(client).await?;
        let added = update_chain(client, &mut data, &vaults).await?;

        ctx.dataset.write_json(&path, &data).await?;
        info!(
            "✅ Vaults {}: {} total, {} new",
            require_network(*chain_id)?.name,
            data.len(),
            added
        );
    }
    Ok(())
}

async fn update_chain(
    client: &ChainClient,
    data: &mut AddressMap<VaultEntry>,
    vaults: &[Address],
) -> Result<usize> {
    let new_vaults = unknown_vaults(data, vaults);
    if !new_vaults.is_empty() {
        let network = require_network(client.chain_id())?;
        let registry = network
            .vault_registry
            .ok_or_else(|| eyre!("No vault registry on {}", network.name))?;

        let mut batch = CallBatch::new();
        let slots: Vec<_> = new_vaults
            .iter()
            .map(|vault| {
                (
                    batch.add(*vault, IVault::assetCall {}),
                    batch.add(registry, IVaultRegistry::metadataCall { vault: *vault }),
                )
            })
            .collect();
        let returns = client.execute(batch).await?;

        for (vault, (asset, metadata)) in new_vaults.iter().zip(slots) {
            let asset = returns.get(asset)?;
            let creator = returns.get(metadata)?.creator;
            data.insert(
                checksum(vault),
                VaultEntry::new(*vault, asset, creator, client.chain_id()),
            );
        }
    }

    let mut batch = CallBatch::new();
    let slots: Vec<_> = vaults
        .iter()
        .map(|vault| {
            (
                batch.add(*vault, IVault::adapterCall {}),
                batch.add(*vault, IVault::feesCall {}),
                batch.add(*vault, IVault::feeRecipientCall {}),
            )
        })
        .collect();
    let returns = client.execute(batch).await?;

    for (vault, (adapter, fees, recipient)) in vaults.iter().zip(slots) {
        let fees = returns.get(fees)?;
        let settings = VaultSettings {
            strategy: returns.get(adapter)?,
            fees: VaultFees {
                deposit: fees.deposit,
                withdrawal: fees.withdrawal,
                management: fees.management,
                performance: fees.performance,
            },
            fee_recipient: returns.get(recipient)?,
        };
        apply_settings(data, vault, settings);
    }

    Ok(new_vaults.len())
}

/// Registered vaults missing from the file, registry order
fn unknown_vaults(data: &AddressMap<VaultEntry>, vaults: &[Address]) -> Vec<Address> {
    vaults
        .iter()
        .filter(|v| !data.contains_key(&checksum(v)))
        .copied()
        .collect()
}

fn apply_settings(data: &mut AddressMap<VaultEntry>, vault: &Address, settings: VaultSettings) {
    if let Some(entry) = data.get_mut(&checksum(vault)) {
        entry.strategies = vec![checksum(&settings.strategy)];
        entry.fees = settings.fees;
        entry.fee_recipient = checksum(&settings.fee_recipient);
    }
}
