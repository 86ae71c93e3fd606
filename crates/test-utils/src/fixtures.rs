//! Shared constants for tests.

use alloy::primitives::{address, Address};

/// Chain id stubs report unless told otherwise (Monad testnet).
pub const TEST_CHAIN_ID: u64 = 10_143;

/// A contract address that is not one of the builtin protocols.
pub const TEST_CONTRACT: Address = address!("00000000000000000000000000000000000000c1");
