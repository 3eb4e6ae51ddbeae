//! Chain client - MULTICALL3 Edition
//!
//! Every batched read goes through one `aggregate3` call with
//! `allowFailure = false`, so a batch either returns every value or fails
//! as a whole. Calls are registered on a [`CallBatch`], which hands back a
//! typed [`Slot`] per call; results are read back through those slots
//! instead of by position.

use alloy_primitives::{Address, Bytes};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::SolCall;
use eyre::{eyre, Result};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::Instant;
use tracing::{debug, trace};

use super::abi::{IMulticall3, MULTICALL3};
use crate::config::Config;

/// Maximum calls per aggregate3 request (to stay under eth_call gas limits)
const MAX_CALLS_PER_BATCH: usize = 500;

// ============================================
// CALL BATCH
// ============================================

/// Handle to one call inside a [`CallBatch`]
pub struct Slot<C> {
    index: usize,
    _call: PhantomData<fn() -> C>,
}

impl<C> Clone for Slot<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Slot<C> {}

impl<C> std::fmt::Debug for Slot<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Slot({})", self.index)
    }
}

/// Calls collected for one all-or-nothing round trip
#[derive(Default)]
pub struct CallBatch {
    calls: Vec<IMulticall3::Call3>,
}

impl std::fmt::Debug for CallBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CallBatch({} calls)", self.calls.len())
    }
}

impl CallBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<C: SolCall>(&mut self, target: Address, call: C) -> Slot<C> {
        let index = self.calls.len();
        self.calls.push(IMulticall3::Call3 {
            target,
            allowFailure: false,
            callData: call.abi_encode().into(),
        });
        Slot { index, _call: PhantomData }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Raw return data of an executed batch
#[derive(Debug)]
pub struct BatchReturns {
    data: Vec<Bytes>,
}

impl BatchReturns {
    /// Decode the value returned for `slot`
    pub fn get<C: SolCall>(&self, slot: Slot<C>) -> Result<C::Return> {
        let data = self
            .data
            .get(slot.index)
            .ok_or_else(|| eyre!("No return data for {} (slot {})", C::SIGNATURE, slot.index))?;
        C::abi_decode_returns(data).map_err(|e| eyre!("Failed to decode {}: {}", C::SIGNATURE, e))
    }

    /// Decode every slot of a homogeneous batch
    pub fn get_all<C: SolCall>(&self, slots: &[Slot<C>]) -> Result<Vec<C::Return>> {
        slots.iter().map(|slot| self.get(*slot)).collect()
    }
}

/// Reject any failed entry; aggregate3 should already have reverted
fn collect_returns(results: Vec<IMulticall3::Result>, expected: usize) -> Result<Vec<Bytes>> {
    if results.len() != expected {
        return Err(eyre!(
            "Multicall3 returned {} results for {} calls",
            results.len(),
            expected
        ));
    }
    results
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            if r.success {
                Ok(r.returnData)
            } else {
                Err(eyre!("Call {} in batch failed", i))
            }
        })
        .collect()
}

// ============================================
// CHAIN CLIENT
// ============================================

/// Read-only access to one chain
#[derive(Debug, Clone)]
pub struct ChainClient {
    chain_id: u64,
    rpc_url: String,
}

impl ChainClient {
    pub fn new(chain_id: u64, rpc_url: impl Into<String>) -> Self {
        Self { chain_id, rpc_url: rpc_url.into() }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Single eth_call
    pub async fn call<C: SolCall>(&self, target: Address, call: C) -> Result<C::Return> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.parse()?);

        let tx = TransactionRequest::default()
            .to(target)
            .input(call.abi_encode().into());

        let output = provider
            .call(tx)
            .await
            .map_err(|e| eyre!("eth_call {} on chain {} failed: {}", C::SIGNATURE, self.chain_id, e))?;

        C::abi_decode_returns(&output).map_err(|e| eyre!("Failed to decode {}: {}", C::SIGNATURE, e))
    }

    /// Execute a Multicall3 batch
    async fn execute_multicall(&self, calls: Vec<IMulticall3::Call3>) -> Result<Vec<IMulticall3::Result>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let provider = ProviderBuilder::new().connect_http(self.rpc_url.parse()?);

        let calldata = IMulticall3::aggregate3Call { calls }.abi_encode();

        let tx = TransactionRequest::default()
            .to(MULTICALL3)
            .input(calldata.into());

        let result = provider
            .call(tx)
            .await
            .map_err(|e| eyre!("Multicall3 on chain {} failed: {}", self.chain_id, e))?;

        let decoded = IMulticall3::aggregate3Call::abi_decode_returns(&result)
            .map_err(|e| eyre!("Failed to decode multicall result: {}", e))?;

        Ok(decoded)
    }

    /// Run a batch; any failed call fails the whole batch
    pub async fn execute(&self, batch: CallBatch) -> Result<BatchReturns> {
        if batch.is_empty() {
            return Ok(BatchReturns { data: Vec::new() });
        }

        let start = Instant::now();
        let total = batch.len();
        let mut data = Vec::with_capacity(total);

        let mut calls = batch.calls;
        while !calls.is_empty() {
            let rest = calls.split_off(calls.len().min(MAX_CALLS_PER_BATCH));
            let expected = calls.len();
            let results = self.execute_multicall(calls).await?;
            data.extend(collect_returns(results, expected)?);
            calls = rest;
        }

        debug!(
            "⚡ Multicall3: {} calls on chain {} in {:?}",
            total,
            self.chain_id,
            start.elapsed()
        );

        Ok(BatchReturns { data })
    }

    /// Same call shape against many targets in one batch
    pub async fn read_all<C, I>(&self, calls: I) -> Result<Vec<C::Return>>
    where
        C: SolCall,
        I: IntoIterator<Item = (Address, C)>,
    {
        let mut batch = CallBatch::new();
        let slots: Vec<Slot<C>> = calls
            .into_iter()
            .map(|(target, call)| batch.add(target, call))
            .collect();
        trace!("Batching {} x {}", slots.len(), C::SIGNATURE);
        let returns = self.execute(batch).await?;
        returns.get_all(&slots)
    }
}

/// One client per configured chain
#[derive(Debug, Clone)]
pub struct ChainClients {
    clients: HashMap<u64, ChainClient>,
}

impl ChainClients {
    pub fn from_config(config: &Config) -> Self {
        let clients = config
            .rpc
            .iter()
            .map(|c| (c.chain_id, ChainClient::new(c.chain_id, c.rpc_url.clone())))
            .collect();
        Self { clients }
    }

    pub fn get(&self, chain_id: u64) -> Result<&ChainClient> {
        self.clients
            .get(&chain_id)
            .ok_or_else(|| eyre!("No RPC endpoint configured for chain {}", chain_id))
    }
}

// ============================================
// TESTS
// ============================================
