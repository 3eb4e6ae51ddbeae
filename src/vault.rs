//! ERC-4626 vault share accounting
//!
//! Assets-per-share carries a virtual offset: one wei of assets and 1e9
//! virtual shares. Freshly seeded vaults get a damped ratio instead of a
//! division by zero or an extreme value.

use alloy_primitives::{Address, U256};
use eyre::Result;

use crate::onchain::abi::IVault;
use crate::onchain::{BatchReturns, CallBatch, Slot};

/// Virtual shares added to the supply
pub const VIRTUAL_SHARES: f64 = 1e9;

/// Ratio reported for a vault without shares
pub const MIN_ASSETS_PER_SHARE: f64 = 1e-9;

/// Lossy conversion of an on-chain integer
pub fn u256_to_f64(value: U256) -> f64 {
    f64::from(value)
}

/// (totalAssets + 1) / (totalSupply + 1e9), or 1e-9 for an empty vault
pub fn assets_per_share(total_assets: f64, total_supply: f64) -> f64 {
    if total_supply > 0.0 {
        (total_assets + 1.0) / (total_supply + VIRTUAL_SHARES)
    } else {
        MIN_ASSETS_PER_SHARE
    }
}

/// Supply side of a vault at one point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VaultSupply {
    pub vault: Address,
    pub total_assets: U256,
    pub total_supply: U256,
}

impl VaultSupply {
    pub fn assets_per_share(&self) -> f64 {
        assets_per_share(u256_to_f64(self.total_assets), u256_to_f64(self.total_supply))
    }
}

/// The two reads behind a [`VaultSupply`], registered on a shared batch
#[derive(Debug, Clone, Copy)]
pub struct VaultSupplySlots {
    vault: Address,
    total_assets: Slot<IVault::totalAssetsCall>,
    total_supply: Slot<IVault::totalSupplyCall>,
}

impl VaultSupplySlots {
    pub fn add(batch: &mut CallBatch, vault: Address) -> Self {
        Self {
            vault,
            total_assets: batch.add(vault, IVault::totalAssetsCall {}),
            total_supply: batch.add(vault, IVault::totalSupplyCall {}),
        }
    }

    pub fn decode(&self, returns: &BatchReturns) -> Result<VaultSupply> {
        Ok(VaultSupply {
            vault: self.vault,
            total_assets: returns.get(self.total_assets)?,
            total_supply: returns.get(self.total_supply)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_vault_ratio() {
        assert_eq!(assets_per_share(0.0, 0.0), 1e-9);
        // Assets without shares still report the minimum
        assert_eq!(assets_per_share(5_000.0, 0.0), 1e-9);
    }

    #[test]
    fn test_offset_ratio() {
        let aps = assets_per_share(100.0, 50.0);
        assert_eq!(aps, 101.0 / (50.0 + 1e9));
        assert!((aps - 1.01e-7).abs() < 1e-12);
    }

    #[test]
    fn test_offset_vanishes_at_scale() {
        // 1M assets over 1M shares, 18 decimals
        let aps = assets_per_share(1e24, 1e24);
        assert!((aps - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_u256_to_f64() {
        assert_eq!(u256_to_f64(U256::ZERO), 0.0);
        assert_eq!(u256_to_f64(U256::from(10u64).pow(U256::from(18))), 1e18);
        assert!(u256_to_f64(U256::MAX) > 1e77);
        // Rounds to nearest above 2^53 instead of truncating
        assert_eq!(u256_to_f64(U256::from(u64::MAX)), 18_446_744_073_709_551_616.0);
        assert_eq!(u256_to_f64(U256::from(1_500_000u64)), 1_500_000.0);
    }

    #[test]
    fn test_vault_supply_ratio() {
        let supply = VaultSupply {
            vault: Address::ZERO,
            total_assets: U256::from(100u64),
            total_supply: U256::from(50u64),
        };
        assert_eq!(supply.assets_per_share(), assets_per_share(100.0, 50.0));
    }
}
