//! [`ChainClient`] over an alloy HTTP provider.

use std::{fmt, time::Duration};

use alloy::{
    eips::BlockNumberOrTag,
    network::{ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, U256},
    providers::{
        DynProvider, PendingTransactionBuilder, PendingTransactionError, Provider,
        ProviderBuilder, WatchTxError,
    },
    rpc::{client::RpcClient, types::TransactionRequest},
    transports::http::reqwest::Url,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    account::Account,
    client::ChainClient,
    errors::ChainError,
    types::{ContractCall, FeeData, TxOptions, TxReceipt},
};

/// Default upper bound on how long to wait for a receipt.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Default interval between two receipt lookups while waiting for confirmation.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How the client waits for a broadcast transaction to be included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ConfirmationConfig {
    /// Sets the confirmation timeout.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Sets the receipt polling interval.
    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..self
        }
    }

    /// Returns the confirmation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the receipt polling interval.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// JSON-RPC chain client that signs with a single [`Account`].
#[derive(Clone)]
pub struct RpcChainClient {
    provider: DynProvider,
    confirmation: ConfirmationConfig,
}

impl fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("confirmation", &self.confirmation)
            .finish_non_exhaustive()
    }
}

impl RpcChainClient {
    /// Builds a provider for `rpc_url` that signs transactions with `account`.
    ///
    /// No request is made here, the first network round trip happens on the first call.
    pub fn connect(
        rpc_url: &str,
        account: &Account,
        confirmation: ConfirmationConfig,
    ) -> Result<Self, ChainError> {
        let url = rpc_url
            .parse::<Url>()
            .map_err(|e| ChainError::InvalidUrl(format!("{rpc_url}: {e}")))?;

        let client = RpcClient::new_http(url).with_poll_interval(confirmation.poll_interval());
        let provider = ProviderBuilder::new()
            .wallet(account.wallet())
            .connect_client(client)
            .erased();

        debug!(%rpc_url, address = %account.address(), "chain client ready");

        Ok(Self::from_provider(provider, confirmation))
    }

    /// Wraps an already built provider.
    pub const fn from_provider(provider: DynProvider, confirmation: ConfirmationConfig) -> Self {
        Self {
            provider,
            confirmation,
        }
    }

    fn request(from: Option<Address>, call: &ContractCall) -> TransactionRequest {
        let tx = TransactionRequest::default()
            .with_to(call.to)
            .with_value(call.value)
            .with_input(call.input.clone());

        match from {
            Some(from) => tx.with_from(from),
            None => tx,
        }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn balance(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self.provider.get_balance(address).await?)
    }

    async fn fee_data(&self) -> Result<FeeData, ChainError> {
        // Not every node implements these methods, a failure means "not reported".
        let base_fee = match self
            .provider
            .get_fee_history(1, BlockNumberOrTag::Latest, &[])
            .await
        {
            Ok(history) => history.next_block_base_fee().filter(|fee| *fee > 0),
            Err(e) => {
                warn!(%e, "node did not report a base fee");
                None
            }
        };

        let priority_fee = match self.provider.get_max_priority_fee_per_gas().await {
            Ok(fee) => Some(fee),
            Err(e) => {
                warn!(%e, "node did not report a priority fee");
                None
            }
        };

        // Same derivation wallets use: leave room for the base fee to double.
        let max_fee = base_fee.map(|base| {
            base.saturating_mul(2)
                .saturating_add(priority_fee.unwrap_or_default())
        });

        trace!(?base_fee, ?priority_fee, ?max_fee, "fetched fee data");

        Ok(FeeData {
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: priority_fee,
        })
    }

    async fn call(&self, call: &ContractCall) -> Result<Bytes, ChainError> {
        trace!(%call, "eth_call");
        Ok(self.provider.call(Self::request(None, call)).await?)
    }

    async fn estimate_gas(&self, from: Address, call: &ContractCall) -> Result<u64, ChainError> {
        trace!(%call, %from, "eth_estimateGas");
        Ok(self
            .provider
            .estimate_gas(Self::request(Some(from), call))
            .await?)
    }

    async fn submit(
        &self,
        from: Address,
        call: &ContractCall,
        options: &TxOptions,
    ) -> Result<TxHash, ChainError> {
        let tx = Self::request(Some(from), call)
            .with_gas_limit(options.gas_limit)
            .with_max_fee_per_gas(options.max_fee_per_gas)
            .with_max_priority_fee_per_gas(options.max_priority_fee_per_gas);

        let pending = self.provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();
        debug!(%call, %tx_hash, "transaction broadcast");

        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ChainError> {
        let timeout = self.confirmation.timeout();
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_timeout(Some(timeout))
            .get_receipt()
            .await
            .map_err(|e| confirmation_error(tx_hash, timeout, e))?;

        Ok(TxReceipt {
            tx_hash,
            success: ReceiptResponse::status(&receipt),
            gas_used: ReceiptResponse::gas_used(&receipt),
            block_number: ReceiptResponse::block_number(&receipt),
            log_count: receipt.inner.logs().len(),
        })
    }
}

fn confirmation_error(
    tx_hash: TxHash,
    timeout: Duration,
    err: PendingTransactionError,
) -> ChainError {
    match err {
        PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
            ChainError::ConfirmationTimeout(tx_hash, timeout)
        }
        PendingTransactionError::TransportError(e) => e.into(),
        other => ChainError::Rpc(other.to_string()),
    }
}
