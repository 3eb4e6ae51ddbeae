//! Asset lists → `archive/assets/addresses/{chain}.json`, `archive/assets/tokens/{chain}.json`
//!
//! Tokens come from two published lists (base tokens and DeFi position
//! tokens). Only addresses the database hasn't seen are added; existing
//! token entries are never overwritten.

use alloy_primitives::Address;
use eyre::{Result, WrapErr};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

use super::vault_tokens::TokenEntry;
use super::FeedContext;
use crate::dataset::{checksum, AddressMap};
use crate::networks::require_network;

pub fn addresses_file(chain_id: u64) -> String {
    format!("archive/assets/addresses/{}.json", chain_id)
}

pub fn tokens_file(chain_id: u64) -> String {
    format!("archive/assets/tokens/{}.json", chain_id)
}

// ============================================
// TOKEN LISTS
// ============================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BaseToken {
    address: Address,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
    decimals: u8,
    #[serde(rename = "logoURI")]
    logo_uri: Option<String>,
    chain_id: u64,
}

#[derive(Debug, Deserialize)]
struct DefiToken {
    token: DefiTokenInfo,
    protocol: Option<DefiProtocol>,
}

#[derive(Debug, Deserialize)]
struct DefiTokenInfo {
    address: Address,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
    decimals: u8,
    chain: u64,
}

#[derive(Debug, Deserialize)]
struct DefiProtocol {
    logo: Option<String>,
}

/// Token from either list, before it is assigned a logo
#[derive(Debug, Clone, PartialEq)]
struct ListedToken {
    address: Address,
    name: String,
    symbol: String,
    decimals: u8,
    logo_uri: Option<String>,
    chain_id: u64,
}

impl From<BaseToken> for ListedToken {
    fn from(t: BaseToken) -> Self {
        Self {
            address: t.address,
            name: t.name,
            symbol: t.symbol,
            decimals: t.decimals,
            logo_uri: t.logo_uri,
            chain_id: t.chain_id,
        }
    }
}

impl From<DefiToken> for ListedToken {
    fn from(t: DefiToken) -> Self {
        Self {
            address: t.token.address,
            name: t.token.name,
            symbol: t.token.symbol,
            decimals: t.token.decimals,
            logo_uri: t.protocol.and_then(|p| p.logo),
            chain_id: t.token.chain,
        }
    }
}

impl ListedToken {
    fn into_entry(self, empty_logo: &str) -> TokenEntry {
        TokenEntry {
            address: checksum(&self.address),
            name: self.name,
            symbol: self.symbol,
            decimals: self.decimals,
            logo_uri: self
                .logo_uri
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| empty_logo.to_string()),
            chain_id: self.chain_id,
        }
    }
}

async fn fetch_list<T: DeserializeOwned>(http: &Client, url: &str) -> Result<Vec<T>> {
    let list: Vec<T> = http
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .wrap_err_with(|| format!("Invalid token list at {}", url))?;
    Ok(list)
}

// ============================================
// FEED
// ============================================

pub async fn run(ctx: &FeedContext<'_>) -> Result<()> {
    let http = Client::builder()
        .timeout(Duration::from_secs(ctx.config.http_timeout_secs))
        .build()
        .wrap_err("Failed to create HTTP client")?;

    let base: Vec<BaseToken> = fetch_list(&http, &ctx.config.base_token_list_url).await?;
    let defi: Vec<DefiToken> = fetch_list(&http, &ctx.config.defi_token_list_url).await?;
    debug!("Token lists: {} base, {} defi", base.len(), defi.len());

    let listed: Vec<ListedToken> = base
        .into_iter()
        .map(ListedToken::from)
        .chain(defi.into_iter().map(ListedToken::from))
        .collect();

    for chain_id in &ctx.config.feed_chains {
        let network = require_network(*chain_id)?;

        let mut addresses: Vec<String> = ctx
            .dataset
            .load_or_default(addresses_file(*chain_id))
            .await?;
        let new_tokens: Vec<TokenEntry> = new_tokens_for_chain(&listed, *chain_id, &addresses)
            .into_iter()
            .map(|t| t.into_entry(network.empty_token_logo))
            .collect();

        // An address is recorded only once its token entry is on disk
        if !new_tokens.is_empty() {
            let mut tokens: AddressMap<TokenEntry> =
                ctx.dataset.load_or_default(tokens_file(*chain_id)).await?;
            merge_tokens(&mut tokens, new_tokens.iter().cloned());
            ctx.dataset.write_json(tokens_file(*chain_id), &tokens).await?;
        }

        addresses.extend(new_tokens.iter().map(|t| t.address.clone()));
        ctx.dataset
            .write_json(addresses_file(*chain_id), &addresses)
            .await?;

        info!(
            "✅ Assets {}: {} known, {} new",
            network.name,
            addresses.len(),
            new_tokens.len()
        );
    }
    Ok(())
}

/// Listed tokens on `chain_id` whose address isn't known yet, first listing wins
fn new_tokens_for_chain(listed: &[ListedToken], chain_id: u64, existing: &[String]) -> Vec<ListedToken> {
    let mut seen: HashSet<String> = existing
        .iter()
        .map(|a| a.to_ascii_lowercase())
        .collect();

    listed
        .iter()
        .filter(|t| t.chain_id == chain_id)
        .filter(|t| seen.insert(checksum(&t.address).to_ascii_lowercase()))
        .cloned()
        .collect()
}

/// Add entries for new keys only
fn merge_tokens(tokens: &mut AddressMap<TokenEntry>, new: impl IntoIterator<Item = TokenEntry>) {
    for token in new {
        tokens.entry(token.address.clone()).or_insert(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dataset::tests::scratch_dir;
    use crate::dataset::Dataset;
    use crate::networks::ETHEREUM;
    use crate::onchain::ChainClients;
    use crate::prices::PriceOracle;
    use crate::testing::serve_http;
    use alloy_primitives::address;

    const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
    const DAI: Address = address!("6B175474E89094C44Da98b954EedcdeCB5BE3830");

    fn listed(address: Address, chain_id: u64) -> ListedToken {
        ListedToken {
            address,
            name: "Token".to_string(),
            symbol: "TKN".to_string(),
            decimals: 18,
            logo_uri: None,
            chain_id,
        }
    }

    #[test]
    fn test_parse_lists() {
        let base = r#"[{"address":"0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48","name":"USD Coin",
            "symbol":"USDC","decimals":6,"logoURI":"https://logo/usdc.png","chainId":1}]"#;
        let base: Vec<BaseToken> = serde_json::from_str(base).unwrap();
        let token = ListedToken::from(base.into_iter().next().unwrap());
        assert_eq!(token.address, USDC);
        assert_eq!(token.decimals, 6);

        let defi = r#"[{"token":{"address":"0x6B175474E89094C44Da98b954EedcdeCB5BE3830","name":"Dai",
            "symbol":"DAI","decimals":18,"chain":1,"type":"defi"},
            "protocol":{"slug":"maker","logo":"https://logo/maker.png"}}]"#;
        let defi: Vec<DefiToken> = serde_json::from_str(defi).unwrap();
        let token = ListedToken::from(defi.into_iter().next().unwrap());
        assert_eq!(token.address, DAI);
        assert_eq!(token.logo_uri.as_deref(), Some("https://logo/maker.png"));
    }

    #[test]
    fn test_missing_logo_uses_chain_placeholder() {
        let entry = listed(USDC, 1).into_entry("https://etherscan.io/images/main/empty-token.png");
        assert_eq!(entry.logo_uri, "https://etherscan.io/images/main/empty-token.png");
        assert_eq!(entry.address, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
    }

    #[test]
    fn test_new_tokens_filtered() {
        let tokens = vec![listed(USDC, 1), listed(DAI, 1), listed(DAI, 10), listed(DAI, 1)];
        // Existing addresses may be stored in any case
        let existing = vec!["0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string()];

        let new = new_tokens_for_chain(&tokens, 1, &existing);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].address, DAI);

        // Idempotent once recorded
        let existing = vec![checksum(&USDC), checksum(&DAI)];
        assert!(new_tokens_for_chain(&tokens, 1, &existing).is_empty());
    }

    #[test]
    fn test_merge_keeps_existing() {
        let mut tokens = AddressMap::new();
        let mut curated = listed(USDC, 1).into_entry("");
        curated.name = "USD Coin (curated)".to_string();
        tokens.insert(curated.address.clone(), curated);

        merge_tokens(
            &mut tokens,
            vec![listed(USDC, 1).into_entry(""), listed(DAI, 1).into_entry("")],
        );

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[&checksum(&USDC)].name, "USD Coin (curated)");
        assert!(tokens.contains_key(&checksum(&DAI)));
    }

    #[tokio::test]
    async fn test_failed_token_write_keeps_address_unknown() {
        let lists = serve_http(|path, _| match path {
            "/base" => Some(
                r#"[{"address":"0x6B175474E89094C44Da98b954EedcdeCB5BE3830","name":"Dai",
                    "symbol":"DAI","decimals":18,"chainId":1}]"#
                    .to_string(),
            ),
            "/defi" => Some("[]".to_string()),
            _ => None,
        })
        .await;

        let root = scratch_dir("assets");
        std::fs::create_dir_all(root.join("archive/assets/addresses")).unwrap();
        std::fs::create_dir_all(root.join("archive/assets/tokens")).unwrap();
        let addresses_path = root.join(addresses_file(1));
        let tokens_path = root.join(tokens_file(1));
        std::fs::write(&addresses_path, "[]").unwrap();
        std::fs::write(&tokens_path, "{ not json").unwrap();

        let config = Config {
            base_token_list_url: format!("{}/base", lists),
            defi_token_list_url: format!("{}/defi", lists),
            feed_chains: vec![ETHEREUM],
            http_timeout_secs: 2,
            ..Config::default()
        };
        let clients = ChainClients::from_config(&config);
        let oracle = PriceOracle::new(&config).unwrap();
        let dataset = Dataset::new(&root);
        let ctx = FeedContext {
            config: &config,
            clients: &clients,
            oracle: &oracle,
            dataset: &dataset,
        };

        assert!(run(&ctx).await.is_err());
        assert_eq!(std::fs::read_to_string(&addresses_path).unwrap(), "[]");

        // Once the tokens file is readable again the token is still picked up
        std::fs::write(&tokens_path, "{}").unwrap();
        tokio_test::assert_ok!(run(&ctx).await);

        let tokens: AddressMap<TokenEntry> =
            serde_json::from_str(&std::fs::read_to_string(&tokens_path).unwrap()).unwrap();
        assert_eq!(tokens[&checksum(&DAI)].symbol, "DAI");
        let addresses: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(&addresses_path).unwrap()).unwrap();
        assert_eq!(addresses, vec![checksum(&DAI)]);

        std::fs::remove_dir_all(root).ok();
    }
}
