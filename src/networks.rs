//! Network table for the feeds
//!
//! One row per supported EVM chain: the key the price APIs use for it,
//! RPC endpoint templates, and the vault registry deployed there.

use alloy_primitives::{address, Address};
use eyre::{eyre, Result};

pub const ETHEREUM: u64 = 1;
pub const OPTIMISM: u64 = 10;
pub const BSC: u64 = 56;
pub const POLYGON: u64 = 137;
pub const ARBITRUM: u64 = 42161;

/// Chains every registry-driven feed walks through, in order
pub const DEFAULT_FEED_CHAINS: &[u64] = &[ETHEREUM, POLYGON, OPTIMISM, ARBITRUM];

/// Static description of a chain
#[derive(Debug, Clone, Copy)]
pub struct Network {
    pub chain_id: u64,
    pub name: &'static str,
    /// Chain prefix used by the price APIs (`{key}:{address}`)
    pub price_key: &'static str,
    /// Alchemy host, when Alchemy serves the chain
    pub alchemy_host: Option<&'static str>,
    /// Keyless endpoint used when nothing else is configured
    pub public_rpc: &'static str,
    /// Vault registry, if the protocol is deployed on this chain
    pub vault_registry: Option<Address>,
    /// Placeholder logo for tokens without one
    pub empty_token_logo: &'static str,
}

impl Network {
    /// Default RPC endpoint, preferring Alchemy when a key is available
    pub fn default_rpc_url(&self, alchemy_key: Option<&str>) -> String {
        match (self.alchemy_host, alchemy_key) {
            (Some(host), Some(key)) if !key.is_empty() => format!("https://{}/v2/{}", host, key),
            _ => self.public_rpc.to_string(),
        }
    }
}

pub const NETWORKS: &[Network] = &[
    Network {
        chain_id: ETHEREUM,
        name: "Ethereum",
        price_key: "ethereum",
        alchemy_host: Some("eth-mainnet.alchemyapi.io"),
        public_rpc: "https://eth.llamarpc.com",
        vault_registry: Some(address!("007318Dc89B314b47609C684260CfbfbcD412864")),
        empty_token_logo: "https://etherscan.io/images/main/empty-token.png",
    },
    Network {
        chain_id: OPTIMISM,
        name: "Optimism",
        price_key: "optimism",
        alchemy_host: Some("opt-mainnet.g.alchemy.com"),
        public_rpc: "https://mainnet.optimism.io",
        vault_registry: Some(address!("dD0d135b5b52B7EDd90a83d4A4112C55a1A6D23A")),
        empty_token_logo: "/images/networks/empty-op.svg",
    },
    Network {
        chain_id: BSC,
        name: "BNB Chain",
        price_key: "bsc",
        alchemy_host: None,
        public_rpc: "https://bsc-dataseed1.binance.org",
        vault_registry: None,
        empty_token_logo: "/images/networks/empty-bsc.svg",
    },
    Network {
        chain_id: POLYGON,
        name: "Polygon",
        price_key: "polygon",
        alchemy_host: Some("polygon-mainnet.g.alchemy.com"),
        public_rpc: "https://polygon-rpc.com",
        vault_registry: Some(address!("2246c4c469735bCE95C120939b0C078EC37A08D0")),
        empty_token_logo: "https://polygonscan.com/images/main/empty-token.png",
    },
    Network {
        chain_id: ARBITRUM,
        name: "Arbitrum",
        price_key: "arbitrum",
        alchemy_host: Some("arb-mainnet.g.alchemy.com"),
        public_rpc: "https://arb1.arbitrum.io/rpc",
        vault_registry: Some(address!("B205e94D402742B919E851892f7d515592a7A6cC")),
        empty_token_logo: "https://arbiscan.io/images/main/empty-token.png",
    },
];

pub fn network(chain_id: u64) -> Option<&'static Network> {
    NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// Same as [`network`] but unknown chains are an error
pub fn require_network(chain_id: u64) -> Result<&'static Network> {
    network(chain_id).ok_or_else(|| eyre!("Unsupported chain id {}", chain_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_feed_chains_are_known() {
        for chain_id in DEFAULT_FEED_CHAINS {
            let net = require_network(*chain_id).unwrap();
            assert!(net.vault_registry.is_some(), "{} has no registry", net.name);
        }
    }

    #[test]
    fn test_default_rpc_url() {
        let eth = require_network(ETHEREUM).unwrap();
        assert_eq!(
            eth.default_rpc_url(Some("abc")),
            "https://eth-mainnet.alchemyapi.io/v2/abc"
        );
        assert_eq!(eth.default_rpc_url(None), "https://eth.llamarpc.com");

        // BSC has no Alchemy host, key is ignored
        let bsc = require_network(BSC).unwrap();
        assert_eq!(bsc.default_rpc_url(Some("abc")), "https://bsc-dataseed1.binance.org");
    }

    #[test]
    fn test_unknown_chain() {
        assert!(network(5).is_none());
        assert!(require_network(5).is_err());
    }
}
