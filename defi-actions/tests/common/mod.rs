//! Recording in-memory wallet for driving the action providers without a node.
//!
//! Reads are answered from canned ABI-encoded returns keyed by target address
//! and selector; a return registered for `Address::ZERO` answers that selector
//! on any target. Every read, send, transfer and receipt wait is recorded in
//! order.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use defi_actions::contracts::IPool;
use defi_actions::error::{ActionError, Result};
use defi_actions::networks::Network;
use defi_actions::wallet::{TxReceipt, TxRequest, WalletProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Read { to: Address, selector: [u8; 4] },
    Send(TxRequest),
    NativeTransfer { to: Address, value: U256 },
    Wait(B256),
}

pub struct MockWallet {
    address: Address,
    network: Network,
    reads: Mutex<HashMap<(Address, [u8; 4]), Bytes>>,
    reverting: Mutex<HashSet<Address>>,
    outcomes: Mutex<HashMap<B256, bool>>,
    log: Mutex<Vec<Recorded>>,
}

impl MockWallet {
    pub fn new(chain_id: u64) -> Self {
        Self {
            address: Address::repeat_byte(0xAA),
            network: Network::from_chain_id(chain_id),
            reads: Mutex::new(HashMap::new()),
            reverting: Mutex::new(HashSet::new()),
            outcomes: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Answer `C` calls to `to` with `encoded` (use `Address::ZERO` for any target).
    pub fn on_read<C: SolCall>(&self, to: Address, encoded: Vec<u8>) {
        self.reads
            .lock()
            .unwrap()
            .insert((to, C::SELECTOR), Bytes::from(encoded));
    }

    pub fn on_read_value<C: SolCall, V: SolValue>(&self, to: Address, value: V) {
        self.on_read::<C>(to, value.abi_encode());
    }

    /// Transactions sent to `to` are mined with a failed status.
    pub fn revert_sends_to(&self, to: Address) {
        self.reverting.lock().unwrap().insert(to);
    }

    pub fn log(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<TxRequest> {
        self.log()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Send(tx) => Some(tx),
                _ => None,
            })
            .collect()
    }

    pub fn native_transfers(&self) -> Vec<(Address, U256)> {
        self.log()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::NativeTransfer { to, value } => Some((to, value)),
                _ => None,
            })
            .collect()
    }

    pub fn read_count(&self) -> usize {
        self.log()
            .iter()
            .filter(|r| matches!(r, Recorded::Read { .. }))
            .count()
    }

    fn next_hash(&self, to: Address) -> B256 {
        let mut outcomes = self.outcomes.lock().unwrap();
        let hash = B256::with_last_byte(outcomes.len() as u8 + 1);
        let success = !self.reverting.lock().unwrap().contains(&to);
        outcomes.insert(hash, success);
        hash
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn address(&self) -> Address {
        self.address
    }

    fn network(&self) -> Network {
        self.network.clone()
    }

    async fn read_contract(&self, to: Address, calldata: Bytes) -> Result<Bytes> {
        let selector: [u8; 4] = calldata
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| ActionError::Rpc("calldata shorter than a selector".into()))?;
        self.log.lock().unwrap().push(Recorded::Read { to, selector });

        let reads = self.reads.lock().unwrap();
        reads
            .get(&(to, selector))
            .or_else(|| reads.get(&(Address::ZERO, selector)))
            .cloned()
            .ok_or_else(|| {
                ActionError::Rpc(format!("no mock for selector 0x{} on {to}", hex::encode(selector)))
            })
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<B256> {
        let hash = self.next_hash(tx.to);
        self.log.lock().unwrap().push(Recorded::Send(tx));
        Ok(hash)
    }

    async fn wait_for_transaction_receipt(&self, tx_hash: B256) -> Result<TxReceipt> {
        self.log.lock().unwrap().push(Recorded::Wait(tx_hash));
        let success = self
            .outcomes
            .lock()
            .unwrap()
            .get(&tx_hash)
            .copied()
            .ok_or_else(|| ActionError::Rpc(format!("unknown transaction {tx_hash}")))?;
        Ok(TxReceipt {
            tx_hash,
            success,
            block_number: Some(1),
            gas_used: Some(21_000),
        })
    }

    async fn native_transfer(&self, to: Address, value: U256) -> Result<B256> {
        let hash = self.next_hash(to);
        self.log
            .lock()
            .unwrap()
            .push(Recorded::NativeTransfer { to, value });
        Ok(hash)
    }
}

pub fn selector(tx: &TxRequest) -> [u8; 4] {
    tx.data[..4].try_into().unwrap()
}

/// `getUserAccountData` return: collateral and debt in USD (8 decimals),
/// ltv in bps, health factor in WAD.
pub fn account_data(collateral_usd: u64, debt_usd: u64, ltv_bps: u64, health_factor_wad: U256) -> Vec<u8> {
    let usd = |v: u64| U256::from(v) * U256::from(100_000_000u64);
    (
        usd(collateral_usd),
        usd(debt_usd),
        U256::ZERO,
        U256::from(8_250u64),
        U256::from(ltv_bps),
        health_factor_wad,
    )
        .abi_encode_params()
}

pub fn wad(hundredths: u64) -> U256 {
    U256::from(hundredths) * U256::from(10_000_000_000_000_000u64)
}

pub fn reserve_data(a_token: Address, stable_debt: Address, variable_debt: Address) -> Vec<u8> {
    let reserve = IPool::ReserveData {
        configuration: IPool::ReserveConfigurationMap { data: U256::ZERO },
        liquidityIndex: 0,
        currentLiquidityRate: 0,
        variableBorrowIndex: 0,
        currentVariableBorrowRate: 0,
        currentStableBorrowRate: 0,
        lastUpdateTimestamp: alloy::primitives::aliases::U40::ZERO,
        id: 0,
        aTokenAddress: a_token,
        stableDebtTokenAddress: stable_debt,
        variableDebtTokenAddress: variable_debt,
        interestRateStrategyAddress: Address::ZERO,
        accruedToTreasury: 0,
        unbacked: 0,
        isolationModeTotalDebt: 0,
    };
    reserve.abi_encode()
}
