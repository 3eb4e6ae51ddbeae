//! Configuration for the defi-db feeds
//!
//! Everything a run needs (RPC endpoints, API hosts, credentials, paths)
//! is resolved here once, at process start, and handed to the feeds by
//! reference. Nothing below reads the environment after that.

use alloy_primitives::{address, Address};
use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::networks::{self, DEFAULT_FEED_CHAINS, ETHEREUM, NETWORKS};

// ============================================
// DEFAULTS
// ============================================

/// Gauge controller on the root chain
pub const DEFAULT_GAUGE_CONTROLLER: Address = address!("D57d8EEC36F0Ba7D8Fd693B9D97e02D8353EB1F4");

/// VCX - gauge reward token (emitted as the discounted oVCX option)
pub const DEFAULT_REWARD_TOKEN: Address = address!("cE246eEa10988C495B4A90a905Ee9237a0f91543");

/// Deployment script ran out of gas and registered this address as a gauge
pub const DEFAULT_HIDDEN_GAUGES: &[Address] = &[address!("38098e3600665168eBE4d827D24D0416efC24799")];

/// Last-known reward token price, used when the price lookup fails
pub const DEFAULT_REWARD_FALLBACK_USD: f64 = 0.02;

/// oVCX trades at 25% of VCX
pub const DEFAULT_REWARD_DISCOUNT: f64 = 0.25;

const DEFAULT_PRICE_API_URL: &str = "https://coins.llama.fi";
const DEFAULT_DEX_PAIR_API_URL: &str = "https://api.dexscreener.com";
const DEFAULT_BASE_TOKEN_LIST_URL: &str =
    "https://enso-scrape.s3.us-east-2.amazonaws.com/output/backend/baseTokens.json";
const DEFAULT_DEFI_TOKEN_LIST_URL: &str =
    "https://enso-scrape.s3.us-east-2.amazonaws.com/output/backend/defiTokens.json";

// ============================================
// CHAIN ENDPOINTS
// ============================================

/// RPC endpoint for one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_url: String,
}

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // ========== Network Settings ==========
    /// Chains the registry feeds walk through
    pub feed_chains: Vec<u64>,

    /// Chain hosting the gauge controller and reward parameters
    pub root_chain_id: u64,

    // ========== Storage ==========
    /// Root of the JSON database
    pub data_dir: PathBuf,

    // ========== HTTP APIs ==========
    /// Current-price API (`/prices/current/{chain}:{address}`)
    pub price_api_url: String,

    /// DEX pair API (`/latest/dex/pairs/{chain}/{pair}`)
    pub dex_pair_api_url: String,

    /// Timeout for every HTTP request
    pub http_timeout_secs: u64,

    pub base_token_list_url: String,
    pub defi_token_list_url: String,

    // ========== Gauges ==========
    pub gauge_controller: Address,

    /// Gauges dropped before any per-gauge read
    pub hidden_gauges: Vec<Address>,

    /// Upper bound on gauges processed at the same time
    pub max_concurrent_gauges: usize,

    // ========== Reward Token ==========
    pub reward_token: Address,

    /// DEX pair quoting the reward token; the price API is used when unset
    pub reward_pair: Option<Address>,

    pub reward_fallback_price_usd: f64,

    /// Fraction of the reward token price the emitted option is worth
    pub reward_discount: f64,

    /// RPC endpoint per chain (kept last: TOML arrays of tables)
    pub rpc: Vec<ChainConfig>,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let alchemy_key = env::var("ALCHEMY_API_KEY").ok();
        let rpc = NETWORKS
            .iter()
            .map(|net| ChainConfig {
                chain_id: net.chain_id,
                rpc_url: env::var(format!("RPC_URL_{}", net.chain_id))
                    .unwrap_or_else(|_| net.default_rpc_url(alchemy_key.as_deref())),
            })
            .collect();

        let defaults = Self::default();

        Ok(Self {
            rpc,
            feed_chains: match env::var("FEED_CHAINS") {
                Ok(s) => parse_list::<u64>(&s).wrap_err("Invalid FEED_CHAINS")?,
                Err(_) => defaults.feed_chains,
            },
            root_chain_id: parse_var("ROOT_CHAIN_ID", env::var("ROOT_CHAIN_ID").ok(), ETHEREUM)?,

            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),

            price_api_url: env::var("PRICE_API_URL").unwrap_or(defaults.price_api_url),
            dex_pair_api_url: env::var("DEX_PAIR_API_URL").unwrap_or(defaults.dex_pair_api_url),
            http_timeout_secs: parse_var(
                "HTTP_TIMEOUT_SECS",
                env::var("HTTP_TIMEOUT_SECS").ok(),
                defaults.http_timeout_secs,
            )?,
            base_token_list_url: env::var("BASE_TOKEN_LIST_URL")
                .unwrap_or(defaults.base_token_list_url),
            defi_token_list_url: env::var("DEFI_TOKEN_LIST_URL")
                .unwrap_or(defaults.defi_token_list_url),

            gauge_controller: match env::var("GAUGE_CONTROLLER") {
                Ok(s) => Address::from_str(&s).wrap_err("Invalid GAUGE_CONTROLLER")?,
                Err(_) => defaults.gauge_controller,
            },
            hidden_gauges: match env::var("HIDDEN_GAUGES") {
                Ok(s) => parse_list::<Address>(&s).wrap_err("Invalid HIDDEN_GAUGES")?,
                Err(_) => defaults.hidden_gauges,
            },
            max_concurrent_gauges: parse_var(
                "MAX_CONCURRENT_GAUGES",
                env::var("MAX_CONCURRENT_GAUGES").ok(),
                defaults.max_concurrent_gauges,
            )?,

            reward_token: match env::var("REWARD_TOKEN") {
                Ok(s) => Address::from_str(&s).wrap_err("Invalid REWARD_TOKEN")?,
                Err(_) => defaults.reward_token,
            },
            reward_pair: env::var("REWARD_PAIR")
                .ok()
                .map(|s| Address::from_str(&s).wrap_err("Invalid REWARD_PAIR"))
                .transpose()?,
            reward_fallback_price_usd: parse_var(
                "REWARD_FALLBACK_PRICE_USD",
                env::var("REWARD_FALLBACK_PRICE_USD").ok(),
                DEFAULT_REWARD_FALLBACK_USD,
            )?,
            reward_discount: parse_var(
                "REWARD_DISCOUNT",
                env::var("REWARD_DISCOUNT").ok(),
                DEFAULT_REWARD_DISCOUNT,
            )?,
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// RPC endpoint for a chain
    pub fn rpc_url(&self, chain_id: u64) -> Result<&str> {
        self.rpc
            .iter()
            .find(|c| c.chain_id == chain_id)
            .map(|c| c.rpc_url.as_str())
            .ok_or_else(|| eyre!("No RPC endpoint configured for chain {}", chain_id))
    }

    /// Validate configuration before any request goes out
    pub fn validate(&self) -> Result<()> {
        // Every chain a feed can touch needs an endpoint
        let mut needed = self.feed_chains.clone();
        needed.push(self.root_chain_id);
        needed.extend(crate::gauges::CHILD_CHAINS);
        for chain_id in needed {
            networks::require_network(chain_id)?;
            let url = self.rpc_url(chain_id)?;
            if url.is_empty() || url.contains("YOUR_API_KEY") {
                return Err(eyre!("Invalid RPC_URL_{} - please set a valid endpoint", chain_id));
            }
        }

        if self.price_api_url.is_empty() || self.dex_pair_api_url.is_empty() {
            return Err(eyre!("PRICE_API_URL and DEX_PAIR_API_URL must not be empty"));
        }

        // Sanity checks
        if !(self.reward_discount > 0.0 && self.reward_discount <= 1.0) {
            return Err(eyre!(
                "REWARD_DISCOUNT must be in (0, 1] (currently {})",
                self.reward_discount
            ));
        }
        if !(self.reward_fallback_price_usd.is_finite() && self.reward_fallback_price_usd > 0.0) {
            return Err(eyre!(
                "REWARD_FALLBACK_PRICE_USD must be positive (currently {})",
                self.reward_fallback_price_usd
            ));
        }
        if self.max_concurrent_gauges == 0 {
            return Err(eyre!("MAX_CONCURRENT_GAUGES must be at least 1"));
        }

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║                 DEFI-DB - CONFIGURATION                    ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Data Dir:          {:<40} ║", self.data_dir.display());
        println!("║ Root Chain:        {:<40} ║", self.root_chain_id);
        println!("║ Feed Chains:       {:<40} ║", format!("{:?}", self.feed_chains));
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ RPC ENDPOINTS                                              ║");
        for chain in &self.rpc {
            println!("║ • {:<16} {:<40} ║", chain.chain_id, redact(&chain.rpc_url));
        }
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ GAUGES                                                     ║");
        println!("║ • Hidden:          {:<40} ║", self.hidden_gauges.len());
        println!("║ • Concurrency:     {:<40} ║", self.max_concurrent_gauges);
        println!("║ • Reward Pair:     {:<40} ║",
            if self.reward_pair.is_some() { "✓ Configured" } else { "✗ Using price API" }
        );
        println!("║ • Fallback Price:  ${:<39.4} ║", self.reward_fallback_price_usd);
        println!("║ • Discount:        {:<39.0}% ║", self.reward_discount * 100.0);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: NETWORKS
                .iter()
                .map(|net| ChainConfig {
                    chain_id: net.chain_id,
                    rpc_url: net.public_rpc.to_string(),
                })
                .collect(),
            feed_chains: DEFAULT_FEED_CHAINS.to_vec(),
            root_chain_id: ETHEREUM,
            data_dir: PathBuf::from("."),
            price_api_url: DEFAULT_PRICE_API_URL.to_string(),
            dex_pair_api_url: DEFAULT_DEX_PAIR_API_URL.to_string(),
            http_timeout_secs: 30,
            base_token_list_url: DEFAULT_BASE_TOKEN_LIST_URL.to_string(),
            defi_token_list_url: DEFAULT_DEFI_TOKEN_LIST_URL.to_string(),
            gauge_controller: DEFAULT_GAUGE_CONTROLLER,
            hidden_gauges: DEFAULT_HIDDEN_GAUGES.to_vec(),
            max_concurrent_gauges: 8,
            reward_token: DEFAULT_REWARD_TOKEN,
            reward_pair: None,
            reward_fallback_price_usd: DEFAULT_REWARD_FALLBACK_USD,
            reward_discount: DEFAULT_REWARD_DISCOUNT,
        }
    }
}

/// Parse a comma separated list, ignoring blanks
/// Parse an optional variable; unset keeps the default, garbage is an error
fn parse_var<T>(name: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(s) => s
            .trim()
            .parse::<T>()
            .map_err(|e| eyre!("Invalid {} {:?}: {}", name, s, e)),
        None => Ok(default),
    }
}

fn parse_list<T>(s: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse::<T>().map_err(|e| eyre!("{}: {}", item, e)))
        .collect()
}

/// Hide the credential part of an endpoint (`.../v2/<key>`)
fn redact(url: &str) -> String {
    match url.rfind("/v2/") {
        Some(idx) => format!("{}/v2/***", &url[..idx]),
        None => url.to_string(),
    }
}

// ============================================
// TESTS
// ============================================
