//! A scripted [`ChainClient`] for unit tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Mutex, MutexGuard},
};

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use async_trait::async_trait;
use staker_chain::{
    client::ChainClient,
    errors::ChainError,
    types::{ContractCall, FeeData, TxOptions, TxReceipt},
};

use crate::fixtures::TEST_CHAIN_ID;

/// Gas every estimate returns when nothing was scripted for the contract.
pub const DEFAULT_ESTIMATE: u64 = 100_000;

/// Gas every successful receipt reports.
pub const DEFAULT_GAS_USED: u64 = 90_000;

/// A transaction the stub accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// The sender.
    pub from: Address,

    /// The call that was submitted.
    pub call: ContractCall,

    /// The gas/fee parameters it was submitted with.
    pub options: TxOptions,

    /// The hash the stub handed back.
    pub tx_hash: TxHash,
}

#[derive(Debug)]
struct StubState {
    chain_id: u64,
    balance: Result<U256, ChainError>,
    fee_data: Result<FeeData, ChainError>,
    views: HashMap<(Address, [u8; 4]), Result<Bytes, ChainError>>,
    estimates: HashMap<Address, VecDeque<Result<u64, ChainError>>>,
    submit_failures: HashMap<Address, ChainError>,
    reverting: HashSet<Address>,
    unconfirmed: HashSet<Address>,
    submissions: Vec<Submission>,
    estimate_calls: Vec<Address>,
    view_calls: usize,
    receipts: HashMap<TxHash, Address>,
}

/// In-memory chain whose every answer is scripted by the test.
///
/// Unscripted view calls fail like a revert, unscripted estimates return [`DEFAULT_ESTIMATE`],
/// submissions succeed and confirm with [`DEFAULT_GAS_USED`].
#[derive(Debug)]
pub struct StubChain {
    state: Mutex<StubState>,
}

impl Default for StubChain {
    fn default() -> Self {
        Self::new()
    }
}

impl StubChain {
    /// Creates a stub on [`TEST_CHAIN_ID`] with a zero balance and no fee data.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StubState {
                chain_id: TEST_CHAIN_ID,
                balance: Ok(U256::ZERO),
                fee_data: Ok(FeeData::default()),
                views: HashMap::new(),
                estimates: HashMap::new(),
                submit_failures: HashMap::new(),
                reverting: HashSet::new(),
                unconfirmed: HashSet::new(),
                submissions: Vec::new(),
                estimate_calls: Vec::new(),
                view_calls: 0,
                receipts: HashMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, StubState> {
        self.state.lock().expect("stub state lock poisoned")
    }

    /// Makes the node report `chain_id`.
    pub fn set_chain_id(&self, chain_id: u64) {
        self.state().chain_id = chain_id;
    }

    /// Sets the native balance of every address.
    pub fn set_balance(&self, balance: U256) {
        self.state().balance = Ok(balance);
    }

    /// Makes balance lookups fail.
    pub fn fail_balance(&self, err: ChainError) {
        self.state().balance = Err(err);
    }

    /// Sets the fee data answer.
    pub fn set_fee_data(&self, fee_data: FeeData) {
        self.state().fee_data = Ok(fee_data);
    }

    /// Makes fee lookups fail.
    pub fn fail_fee_data(&self, err: ChainError) {
        self.state().fee_data = Err(err);
    }

    /// Scripts the return data of a view call, keyed by contract and selector.
    pub fn set_view(&self, contract: Address, selector: [u8; 4], data: Vec<u8>) {
        self.state()
            .views
            .insert((contract, selector), Ok(Bytes::from(data)));
    }

    /// Makes a view call fail.
    pub fn fail_view(&self, contract: Address, selector: [u8; 4], err: ChainError) {
        self.state().views.insert((contract, selector), Err(err));
    }

    /// Queues estimate answers for `contract`, consumed in order before falling back to
    /// [`DEFAULT_ESTIMATE`].
    pub fn script_estimates(
        &self,
        contract: Address,
        answers: impl IntoIterator<Item = Result<u64, ChainError>>,
    ) {
        self.state()
            .estimates
            .entry(contract)
            .or_default()
            .extend(answers);
    }

    /// Makes the next `attempts` estimates against `contract` fail with the same error.
    pub fn fail_estimates(&self, contract: Address, attempts: usize) {
        self.script_estimates(
            contract,
            (0..attempts).map(|_| Err(ChainError::Rpc("execution reverted".to_string()))),
        );
    }

    /// Makes submissions to `contract` fail before broadcast.
    pub fn fail_submit(&self, contract: Address, err: ChainError) {
        self.state().submit_failures.insert(contract, err);
    }

    /// Makes transactions to `contract` get included with a failed status.
    pub fn revert_on_chain(&self, contract: Address) {
        self.state().reverting.insert(contract);
    }

    /// Makes transactions to `contract` never confirm.
    pub fn never_confirm(&self, contract: Address) {
        self.state().unconfirmed.insert(contract);
    }

    /// Everything submitted so far, in order.
    pub fn submissions(&self) -> Vec<Submission> {
        self.state().submissions.clone()
    }

    /// Number of estimates made against `contract`.
    pub fn estimate_calls(&self, contract: Address) -> usize {
        self.state()
            .estimate_calls
            .iter()
            .filter(|c| **c == contract)
            .count()
    }

    /// Total number of view calls served.
    pub fn view_calls(&self) -> usize {
        self.state().view_calls
    }

    /// ABI word holding `value`.
    pub fn word_u256(value: U256) -> Vec<u8> {
        value.to_be_bytes::<32>().to_vec()
    }

    /// ABI word holding `value`.
    pub fn word_bool(value: bool) -> Vec<u8> {
        Self::word_u256(U256::from(value as u8))
    }

    /// ABI word holding `address`.
    pub fn word_address(address: Address) -> Vec<u8> {
        let mut word = vec![0u8; 12];
        word.extend_from_slice(address.as_slice());
        word
    }
}

#[async_trait]
impl ChainClient for StubChain {
    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.state().chain_id)
    }

    async fn balance(&self, _address: Address) -> Result<U256, ChainError> {
        self.state().balance.clone()
    }

    async fn fee_data(&self) -> Result<FeeData, ChainError> {
        self.state().fee_data.clone()
    }

    async fn call(&self, call: &ContractCall) -> Result<Bytes, ChainError> {
        let mut state = self.state();
        state.view_calls += 1;

        let selector: [u8; 4] = call
            .input
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .unwrap_or_default();

        state
            .views
            .get(&(call.to, selector))
            .cloned()
            .unwrap_or_else(|| {
                Err(ChainError::Rpc(format!(
                    "execution reverted: no stub for {call}"
                )))
            })
    }

    async fn estimate_gas(&self, _from: Address, call: &ContractCall) -> Result<u64, ChainError> {
        let mut state = self.state();
        state.estimate_calls.push(call.to);

        state
            .estimates
            .get_mut(&call.to)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(DEFAULT_ESTIMATE))
    }

    async fn submit(
        &self,
        from: Address,
        call: &ContractCall,
        options: &TxOptions,
    ) -> Result<TxHash, ChainError> {
        let mut state = self.state();
        if let Some(err) = state.submit_failures.get(&call.to) {
            return Err(err.clone());
        }

        let nonce = state.submissions.len() as u64 + 1;
        let tx_hash = B256::from(U256::from(nonce).to_be_bytes::<32>());
        state.receipts.insert(tx_hash, call.to);
        state.submissions.push(Submission {
            from,
            call: call.clone(),
            options: *options,
            tx_hash,
        });

        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ChainError> {
        let state = self.state();
        let contract = state
            .receipts
            .get(&tx_hash)
            .copied()
            .ok_or_else(|| ChainError::Rpc(format!("unknown transaction {tx_hash}")))?;

        if state.unconfirmed.contains(&contract) {
            return Err(ChainError::ConfirmationTimeout(
                tx_hash,
                std::time::Duration::from_secs(120),
            ));
        }

        let block_number = state.submissions.len() as u64;
        Ok(TxReceipt {
            tx_hash,
            success: !state.reverting.contains(&contract),
            gas_used: DEFAULT_GAS_USED,
            block_number: Some(block_number),
            log_count: 1,
        })
    }
}
