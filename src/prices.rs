//! Price Oracle - current-price API + DEX pair API
//!
//! Asset prices come from the current-price API
//! (`/prices/current/{chain}:{address}`) and are fatal when missing.
//! The reward token price prefers a DEX pair quote, then the price API,
//! and falls back to a configured constant when both fail: it only moves the APR figures and
//! must not stop the other gauges from being recorded.

use alloy_primitives::Address;
use eyre::{eyre, Result, WrapErr};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::networks::require_network;

// ============================================
// API RESPONSE TYPES
// ============================================

#[derive(Debug, Deserialize)]
struct CurrentPricesResponse {
    #[serde(default)]
    coins: HashMap<String, CoinQuote>,
}

#[derive(Debug, Deserialize)]
struct CoinQuote {
    price: Option<f64>,
    symbol: Option<String>,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DexPairsResponse {
    pairs: Option<Vec<DexPair>>,
    pair: Option<DexPair>,
}

#[derive(Debug, Deserialize)]
struct DexPair {
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
}

// ============================================
// REWARD PRICE
// ============================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceSource {
    PriceApi,
    DexPair,
    Fallback,
}

impl std::fmt::Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceSource::PriceApi => write!(f, "price API"),
            PriceSource::DexPair => write!(f, "DEX pair"),
            PriceSource::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RewardPrice {
    pub price_usd: f64,
    pub source: PriceSource,
}

// ============================================
// PRICE ORACLE
// ============================================

pub struct PriceOracle {
    http_client: Client,
    price_api_url: String,
    dex_pair_api_url: String,
}

impl PriceOracle {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .wrap_err("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            price_api_url: config.price_api_url.trim_end_matches('/').to_string(),
            dex_pair_api_url: config.dex_pair_api_url.trim_end_matches('/').to_string(),
        })
    }

    /// USD price of a token; a missing quote is an error
    pub async fn token_price(&self, chain_id: u64, token: Address) -> Result<f64> {
        let key = coin_key(require_network(chain_id)?.price_key, token);
        let url = format!("{}/prices/current/{}", self.price_api_url, key);

        let response: CurrentPricesResponse = self
            .http_client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .wrap_err_with(|| format!("Invalid price response for {}", key))?;

        let price = quote_from_response(&response, &key)?;
        debug!("💲 {} = ${:.6}", key, price);
        Ok(price)
    }

    /// Reward token price (DEX pair if configured, then price API, then fallback)
    pub async fn reward_token_price(&self, config: &Config) -> RewardPrice {
        let from_pair = match config.reward_pair {
            Some(pair) => match self.pair_price(config.root_chain_id, pair).await {
                Ok(price) => Some(price),
                Err(e) => {
                    warn!("DEX pair {} quote failed: {:#}; trying price API", pair, e);
                    None
                }
            },
            None => None,
        };

        let fetched = match from_pair {
            Some(price) => Ok((price, PriceSource::DexPair)),
            None => self
                .token_price(config.root_chain_id, config.reward_token)
                .await
                .map(|price| (price, PriceSource::PriceApi)),
        };

        match fetched {
            Ok((price_usd, source)) => {
                info!("💲 Reward token: ${:.6} ({})", price_usd, source);
                RewardPrice { price_usd, source }
            }
            Err(e) => {
                warn!(
                    "Reward token price fetch failed: {:#}; using fallback ${:.6}",
                    e, config.reward_fallback_price_usd
                );
                RewardPrice {
                    price_usd: config.reward_fallback_price_usd,
                    source: PriceSource::Fallback,
                }
            }
        }
    }

    /// USD price quoted by a DEX pair
    async fn pair_price(&self, chain_id: u64, pair: Address) -> Result<f64> {
        let url = format!(
            "{}/latest/dex/pairs/{}/{}",
            self.dex_pair_api_url,
            require_network(chain_id)?.price_key,
            pair
        );

        let response: DexPairsResponse = self
            .http_client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        pair_price_from_response(&response)
    }
}

// ============================================
// HELPERS
// ============================================

/// `{chain}:{checksummed address}`
fn coin_key(price_key: &str, token: Address) -> String {
    format!("{}:{}", price_key, token.to_checksum(None))
}

fn quote_from_response(response: &CurrentPricesResponse, key: &str) -> Result<f64> {
    // The API may echo the key in another case
    let quote = response.coins.get(key).or_else(|| {
        response
            .coins
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, q)| q)
    });

    let quote = quote.ok_or_else(|| eyre!("No price quote for {}", key))?;
    if let Some(confidence) = quote.confidence {
        if confidence < 0.5 {
            warn!(
                "Low confidence ({:.2}) price for {} ({})",
                confidence,
                key,
                quote.symbol.as_deref().unwrap_or("?")
            );
        }
    }

    let price = quote.price.ok_or_else(|| eyre!("Quote for {} has no price", key))?;
    validate_price(price, key)
}

fn pair_price_from_response(response: &DexPairsResponse) -> Result<f64> {
    let pair = response
        .pair
        .as_ref()
        .or_else(|| response.pairs.as_ref().and_then(|p| p.first()))
        .ok_or_else(|| eyre!("DEX pair not found"))?;

    let raw = pair
        .price_usd
        .as_deref()
        .ok_or_else(|| eyre!("DEX pair has no USD price"))?;
    let price: f64 = raw
        .parse()
        .map_err(|e| eyre!("Failed to parse pair price {:?}: {}", raw, e))?;

    validate_price(price, "DEX pair")
}

/// Prices must be finite and positive to enter the APR formula
fn validate_price(price: f64, what: &str) -> Result<f64> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(eyre!("Unusable price {} for {}", price, what))
    }
}

// ============================================
// TESTS
// ============================================
