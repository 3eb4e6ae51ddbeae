//! Registry-driven feeds
//!
//! Each feed walks the configured chains one after another, reads what is
//! new on-chain, merges it into the chain's JSON file and writes it back.

mod assets;
mod price_per_share;
mod strategies;
mod vault_tokens;
mod vaults;

use alloy_primitives::Address;
use clap::ValueEnum;
use eyre::{eyre, Result};
use tracing::info;

use crate::config::Config;
use crate::dataset::Dataset;
use crate::gauges::run_gauge_apy;
use crate::networks::require_network;
use crate::onchain::abi::IVaultRegistry;
use crate::onchain::{ChainClient, ChainClients};
use crate::prices::PriceOracle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Feed {
    GaugeApy,
    Vaults,
    VaultTokens,
    PricePerShare,
    Strategies,
    Assets,
    All,
}

impl Feed {
    /// Order used by `all`: strategies read the vaults file
    pub const ALL: [Feed; 6] = [
        Feed::Vaults,
        Feed::VaultTokens,
        Feed::PricePerShare,
        Feed::Strategies,
        Feed::Assets,
        Feed::GaugeApy,
    ];

    fn expand(self) -> Vec<Feed> {
        match self {
            Feed::All => Self::ALL.to_vec(),
            feed => vec![feed],
        }
    }
}

impl std::fmt::Display for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_possible_value() {
            Some(value) => write!(f, "{}", value.get_name()),
            None => write!(f, "{:?}", self),
        }
    }
}

/// Everything a feed needs, resolved once in `main`
pub struct FeedContext<'a> {
    pub config: &'a Config,
    pub clients: &'a ChainClients,
    pub oracle: &'a PriceOracle,
    pub dataset: &'a Dataset,
}

pub async fn run_feed(feed: Feed, ctx: &FeedContext<'_>) -> Result<()> {
    for feed in feed.expand() {
        info!("🚀 Running feed {}", feed);
        run_single(feed, ctx).await?;
    }
    Ok(())
}

async fn run_single(feed: Feed, ctx: &FeedContext<'_>) -> Result<()> {
    match feed {
        Feed::GaugeApy => {
            run_gauge_apy(ctx.config, ctx.clients, ctx.oracle, ctx.dataset).await?;
        }
        Feed::Vaults => vaults::run(ctx).await?,
        Feed::VaultTokens => vault_tokens::run(ctx).await?,
        Feed::PricePerShare => price_per_share::run(ctx).await?,
        Feed::Strategies => strategies::run(ctx).await?,
        Feed::Assets => assets::run(ctx).await?,
        Feed::All => return Err(eyre!("`all` must be expanded before running")),
    }
    Ok(())
}

/// Vaults registered on a chain
pub(crate) async fn registered_vaults(client: &ChainClient) -> Result<Vec<Address>> {
    let network = require_network(client.chain_id())?;
    let registry = network
        .vault_registry
        .ok_or_else(|| eyre!("No vault registry on {}", network.name))?;

    let vaults = client
        .call(registry, IVaultRegistry::getRegisteredAddressesCall {})
        .await?;
    info!("🏦 {}: {} registered vaults", network.name, vaults.len());
    Ok(vaults)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_expands_to_every_feed() {
        let feeds = Feed::All.expand();
        assert_eq!(feeds.len(), 6);
        assert!(!feeds.contains(&Feed::All));
        let vaults = feeds.iter().position(|f| *f == Feed::Vaults).unwrap();
        let strategies = feeds.iter().position(|f| *f == Feed::Strategies).unwrap();
        assert!(vaults < strategies);
    }

    #[test]
    fn test_single_feed() {
        assert_eq!(Feed::Assets.expand(), vec![Feed::Assets]);
    }

    #[test]
    fn test_feed_names() {
        assert_eq!(Feed::GaugeApy.to_string(), "gauge-apy");
        assert_eq!(Feed::PricePerShare.to_string(), "price-per-share");
        assert_eq!(Feed::from_str("vault-tokens", true).unwrap(), Feed::VaultTokens);
    }

    #[tokio::test]
    async fn test_chain_without_registry() {
        let client = ChainClient::new(crate::networks::BSC, "http://127.0.0.1:9");
        assert!(registered_vaults(&client).await.is_err());
    }
}
