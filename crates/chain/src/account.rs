//! The single account every stake is sent from.

use std::fmt;

use alloy::{
    network::EthereumWallet, primitives::Address, signers::local::PrivateKeySigner,
};

use crate::errors::ChainError;

/// An address together with the key that signs for it.
///
/// Built once at startup and shared read-only afterwards. The [`fmt::Debug`] impl only shows the
/// address so the key never ends up in logs.
#[derive(Clone)]
pub struct Account {
    signer: PrivateKeySigner,
}

impl Account {
    /// Parses a hex-encoded secp256k1 private key, with or without the `0x` prefix.
    pub fn from_private_key(key: &str) -> Result<Self, ChainError> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let signer = key
            .parse::<PrivateKeySigner>()
            .map_err(|e| ChainError::InvalidKey(e.to_string()))?;

        Ok(Self { signer })
    }

    /// The address stakes are sent from and shares are credited to.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// A wallet that can be plugged into an alloy provider to sign transactions.
    pub fn wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known throwaway key, never funded anywhere.
    const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn parses_key_with_and_without_prefix() {
        let with = Account::from_private_key(TEST_KEY).expect("valid key");
        let without = Account::from_private_key(&TEST_KEY[2..]).expect("valid key");
        assert_eq!(with.address(), without.address());
    }

    #[test]
    fn rejects_garbage_key() {
        assert!(matches!(
            Account::from_private_key("not-a-key"),
            Err(ChainError::InvalidKey(_))
        ));
    }

    #[test]
    fn debug_does_not_leak_key() {
        let account = Account::from_private_key(TEST_KEY).expect("valid key");
        let dbg = format!("{account:?}");
        assert!(!dbg.contains(&TEST_KEY[2..]));
        assert!(dbg.contains("address"));
    }
}
