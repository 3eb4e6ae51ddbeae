//! Strategy descriptions → `archive/descriptions/strategies/{chain}.json`
//!
//! Strategy contracts are named `"<Protocol> <Family> ..."`. The second word
//! picks a family descriptor; a few strategies that don't follow the naming
//! scheme are described by address instead.

use alloy_primitives::{address, Address};
use eyre::{eyre, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{info, warn};

use super::vaults::{vaults_file, VaultEntry};
use super::FeedContext;
use crate::dataset::{checksum, AddressMap};
use crate::onchain::abi::IERC20;

pub fn descriptions_file(chain_id: u64) -> String {
    format!("archive/descriptions/strategies/{}.json", chain_id)
}

// ============================================
// DESCRIPTORS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDescription {
    pub address: String,
    pub name: String,
    pub description: String,
    pub resolver: String,
}

#[derive(Debug, Clone, Copy)]
enum Template {
    LpCompounding,
    Lending,
    AutomatedAssetStrategy,
    /// Senior or junior tranche, by the strategy name
    Tranche,
    /// OUSD or OETH, by the strategy name
    Origin,
}

#[derive(Debug, Clone, Copy)]
struct Family {
    display_name: &'static str,
    /// Protocol name as it appears in the description
    protocol: &'static str,
    template: Template,
    resolver: &'static str,
}

const fn family(
    display_name: &'static str,
    protocol: &'static str,
    template: Template,
    resolver: &'static str,
) -> Family {
    Family { display_name, protocol, template, resolver }
}

const OUSD_DESCRIPTION: &str = "OUSD integrates with Aave and Compound to automate yield on over-collateralized loans.
    ----
    The OUSD protocol also routes USDT, USDC, and DAI to highly-performing liquidity pools as determined by trading volume and rewards tokens (e.g. Curve rewards CRV tokens to liquidity providers). Yields are then passed on to OUSD holders.
    ---
    In addition to collecting interest from and fees from market making, the protocol automatically claims and converts bonus incentives that are being distributed by DeFi protocols.";

const OETH_DESCRIPTION: &str = "OETH integrates with various Liquid Staking Provider to optimize interest earned by staking Ether.
      ----
      The OETH protocol also utilizes Curve and Convex Finance to earn trading fees and additional rewards on ETH / OETH. It automatically claims and converts bonus incentives that are being distributed by these protocols.";

lazy_static! {
    static ref FAMILIES: HashMap<&'static str, Family> = {
        use Template::*;
        let mut m = HashMap::new();
        m.insert("Stargate", family("Stargate", "Stargate", LpCompounding, "stargate"));
        m.insert("Convex", family("Convex", "Convex", LpCompounding, "convex"));
        m.insert("AaveV2", family("Aave", "AaveV2", Lending, "aaveV2"));
        m.insert("AaveV3", family("Aave", "AaveV3", Lending, "aaveV3"));
        m.insert("Aura", family("Aura", "Aura", LpCompounding, "aura"));
        m.insert("CompoundV2", family("Compound", "CompoundV2", Lending, "compoundV2"));
        m.insert("CompoundV3", family("Compound", "CompoundV3", Lending, "compoundV3"));
        m.insert("Flux", family("Flux", "Flux", Lending, "flux"));
        m.insert("Beefy", family("Beefy", "Beefy", AutomatedAssetStrategy, "beefy"));
        m.insert("Yearn", family("Yearn", "Yearn", AutomatedAssetStrategy, "yearn"));
        m.insert("Idle", family("Idle", "Idle", Tranche, "idle"));
        m.insert("Origin", family("Origin", "Origin", Origin, "origin"));
        m.insert("Ousd", family("Origin", "Origin", Origin, "origin"));
        m.insert("Pirex", family("Pirex", "Pirex", AutomatedAssetStrategy, "pirex"));
        m.insert("Sommelier", family("Sommelier", "Sommelier", AutomatedAssetStrategy, "sommelier"));
        m
    };

    /// Described by address, checked before the name
    static ref EXCEPTIONS: HashMap<Address, (&'static str, &'static str, &'static str)> = {
        let mut m = HashMap::new();
        m.insert(
            address!("E3267A9Ff2d38B748B6aA202e006F7d94Ca22df3"),
            ("Sommelier Turbo", "Sommelier Turbo", "sommelier"),
        );
        m
    };
}

fn template_text(template: Template, protocol: &str, strategy_name: &str) -> (String, Option<&'static str>) {
    match template {
        Template::LpCompounding => (
            format!(
                "**{p} LP-Compounding** - The vault stakes the user's LP Token in a {p} gauge, earning the platform's governance token. Earned token is swapped for more LP Token. To complete the compounding cycle, the new LP Token is added to the farm, ready to go for the next earning event. The transaction cost required to do all this is socialized among the vault's users.",
                p = protocol
            ),
            None,
        ),
        Template::Lending => (
            format!("**Lending** - The vault supplies assets into {} to earn interest.", protocol),
            None,
        ),
        Template::AutomatedAssetStrategy => (
            format!(
                "**Automated Asset Strategy** - The vault supplies assets into {} to earn yield on their automated asset strategies.",
                protocol
            ),
            None,
        ),
        Template::Tranche if strategy_name.contains("Senior") => (
            format!(
                "**Senior Tranche** - The vault supplies assets into a senior tranche of {}. Senior tranches offer stable returns with built-in coverage but reduced upside.",
                protocol
            ),
            Some("idleSenior"),
        ),
        Template::Tranche => (
            format!(
                "**Junior Tranche** - The vault supplies assets into a junior tranche of {}. Junior tranches offer higher returns but with higher risk since they cover the losses of the corresponding senior tranche.",
                protocol
            ),
            Some("idleJunior"),
        ),
        Template::Origin if strategy_name.contains("Ether") => (OETH_DESCRIPTION.to_string(), None),
        Template::Origin => (OUSD_DESCRIPTION.to_string(), None),
    }
}

/// Descriptor for a strategy, from its address and on-chain name
pub fn describe_strategy(strategy: Address, name: &str) -> StrategyDescription {
    let address = checksum(&strategy);

    if let Some((display, description, resolver)) = EXCEPTIONS.get(&strategy) {
        return StrategyDescription {
            address,
            name: display.to_string(),
            description: description.to_string(),
            resolver: resolver.to_string(),
        };
    }

    let family = name.split(' ').nth(1).and_then(|key| FAMILIES.get(key));
    match family {
        Some(f) => {
            let (description, resolver) = template_text(f.template, f.protocol, name);
            StrategyDescription {
                address,
                name: f.display_name.to_string(),
                description,
                resolver: resolver.unwrap_or(f.resolver).to_string(),
            }
        }
        None => {
            warn!("No descriptor for strategy {} ({:?})", address, name);
            StrategyDescription {
                address,
                name: "Strategy".to_string(),
                description: "Not found".to_string(),
                resolver: "none".to_string(),
            }
        }
    }
}

// ============================================
// FEED
// ============================================

pub async fn run(ctx: &FeedContext<'_>) -> Result<()> {
    for chain_id in &ctx.config.feed_chains {
        let client = ctx.clients.get(*chain_id)?;
        let path = descriptions_file(*chain_id);

        let vaults: AddressMap<VaultEntry> = ctx.dataset.load_or_default(vaults_file(*chain_id)).await?;
        let mut data: AddressMap<StrategyDescription> = ctx.dataset.load_or_default(&path).await?;

        let pending = undescribed_strategies(&vaults, &data)?;
        if !pending.is_empty() {
            let names = client
                .read_all(pending.iter().map(|s| (*s, IERC20::nameCall {})))
                .await?;
            for (strategy, name) in pending.iter().zip(names) {
                let described = describe_strategy(*strategy, &name);
                data.insert(described.address.clone(), described);
            }
        }

        ctx.dataset.write_json(&path, &data).await?;
        info!("✅ Strategies {}: {} described, {} new", chain_id, data.len(), pending.len());
    }
    Ok(())
}

/// Strategies used by any vault and missing from the descriptions
fn undescribed_strategies(
    vaults: &AddressMap<VaultEntry>,
    described: &AddressMap<StrategyDescription>,
) -> Result<Vec<Address>> {
    let mut pending: Vec<Address> = Vec::new();
    for strategy in vaults.values().flat_map(|v| v.strategies.iter()) {
        let address = Address::from_str(strategy)
            .map_err(|e| eyre!("Invalid strategy address {:?}: {}", strategy, e))?;
        if !described.contains_key(&checksum(&address)) && !pending.contains(&address) {
            pending.push(address);
        }
    }
    Ok(pending)
}
