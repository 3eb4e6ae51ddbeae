//! Vault share tokens → `archive/vaults/tokens/{chain}.json`

use alloy_primitives::Address;
use eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{registered_vaults, FeedContext};
use crate::dataset::{checksum, AddressMap};
use crate::onchain::abi::IERC20;
use crate::onchain::{CallBatch, ChainClient};

/// Every vault share token shows the protocol logo
pub const VAULT_TOKEN_LOGO: &str = "https://app.vaultcraft.io/images/tokens/vcx.svg";

pub fn tokens_file(chain_id: u64) -> String {
    format!("archive/vaults/tokens/{}.json", chain_id)
}

/// Token list entry, shared with the assets feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEntry {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(rename = "logoURI")]
    pub logo_uri: String,
    pub chain_id: u64,
}

pub async fn run(ctx: &FeedContext<'_>) -> Result<()> {
    for chain_id in &ctx.config.feed_chains {
        let client = ctx.clients.get(*chain_id)?;
        let path = tokens_file(*chain_id);

        let mut data: AddressMap<TokenEntry> = ctx.dataset.load_or_default(&path).await?;
        let vaults = registered_vaults(client).await?;
        let new_vaults: Vec<Address> = vaults
            .into_iter()
            .filter(|v| !data.contains_key(&checksum(v)))
            .collect();

        if new_vaults.is_empty() {
            info!("Vault tokens {}: nothing new", chain_id);
            continue;
        }

        for token in read_tokens(client, &new_vaults, VAULT_TOKEN_LOGO).await? {
            data.insert(token.address.clone(), token);
        }
        ctx.dataset.write_json(&path, &data).await?;
        info!("✅ Vault tokens {}: {} added", chain_id, new_vaults.len());
    }
    Ok(())
}

/// name / symbol / decimals of each token, one batch
pub(crate) async fn read_tokens(
    client: &ChainClient,
    tokens: &[Address],
    logo_uri: &str,
) -> Result<Vec<TokenEntry>> {
    let mut batch = CallBatch::new();
    let slots: Vec<_> = tokens
        .iter()
        .map(|token| {
            (
                batch.add(*token, IERC20::nameCall {}),
                batch.add(*token, IERC20::symbolCall {}),
                batch.add(*token, IERC20::decimalsCall {}),
            )
        })
        .collect();
    let returns = client.execute(batch).await?;

    tokens
        .iter()
        .zip(slots)
        .map(|(token, (name, symbol, decimals))| {
            Ok(TokenEntry {
                address: checksum(token),
                name: returns.get(name)?,
                symbol: returns.get(symbol)?,
                decimals: returns.get(decimals)?,
                logo_uri: logo_uri.to_string(),
                chain_id: client.chain_id(),
            })
        })
        .collect()
}
