//! Contract interfaces read by the feeds
//!
//! View functions only. Gauge functions cover both the root-chain gauge
//! (`inflation_rate`) and the cross-chain root gauge (`inflation_params`).

use alloy_primitives::{address, Address};
use alloy_sol_types::sol;

/// Multicall3 (same on all chains)
pub const MULTICALL3: Address = address!("cA11bde05977b3631167028862bE2a173976CA11");

sol! {
    /// Multicall3 - deployed at same address on all EVM chains
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls)
            external payable returns (Result[] memory returnData);
    }
}

sol! {
    interface IGaugeController {
        function n_gauges() external view returns (uint256);
        function gauges(uint256 index) external view returns (address);
        function gauge_types(address gauge) external view returns (int128);
    }

    interface IGauge {
        function decimals() external view returns (uint256);
        function is_killed() external view returns (bool);
        function lp_token() external view returns (address);
        function inflation_rate() external view returns (uint256);
        function inflation_params() external view returns (uint256 rate, uint256 finish_time);
        function getCappedRelativeWeight(uint256 time) external view returns (uint256);
        function tokenless_production() external view returns (uint256);
        function working_supply() external view returns (uint256);
    }
}

sol! {
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }

    /// ERC-4626 vault with the protocol's adapter and fee extensions
    interface IVault {
        function asset() external view returns (address);
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
        function totalAssets() external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function adapter() external view returns (address);
        function fees() external view returns (uint64 deposit, uint64 withdrawal, uint64 management, uint64 performance);
        function feeRecipient() external view returns (address);
    }

    interface IVaultRegistry {
        struct VaultMetadata {
            address vault;
            address staking;
            address creator;
            string metadataCID;
            address[8] swapTokenAddresses;
            address swapAddress;
            uint256 exchange;
        }

        function getRegisteredAddresses() external view returns (address[] memory);
        function metadata(address vault) external view returns (VaultMetadata memory);
    }
}
