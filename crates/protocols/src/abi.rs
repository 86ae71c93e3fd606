//! Solidity interfaces of the contracts the stakers call.
#![allow(missing_docs)]

use alloy::sol;

/// ERC-4626 style vaults (Apriori).
pub mod vault {
    use super::sol;

    sol! {
        function deposit(uint256 assets, address receiver) external payable returns (uint256 shares);
        function maxRedeem(address owner) external view returns (uint256 maxShares);
    }
}

/// Kintsu's staked-MON contract. Same shape as a vault but amounts are `uint96`.
pub mod kintsu {
    use super::sol;

    sol! {
        function deposit(uint96 assets, address receiver) external payable returns (uint96 shares);
    }
}

/// Magma's MON staking contract, which mints gMON.
pub mod magma {
    use super::sol;

    sol! {
        function depositMon(uint256 referralId) external payable;
        function paused() external view returns (bool);
        function gMON() external view returns (address);
    }
}

/// The ERC-20 subset used for share balances.
pub mod erc20 {
    use super::sol;

    sol! {
        function balanceOf(address account) external view returns (uint256);
    }
}
