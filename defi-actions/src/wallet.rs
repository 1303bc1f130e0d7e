//! Wallet abstraction the action providers run against, plus an alloy-backed
//! implementation using an HTTP provider and a local private-key signer.
//!
//! Providers never sign anything themselves; they ask the wallet to read,
//! send and wait.

use std::time::Duration;

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{ActionError, Result};
use crate::networks::Network;

/// A transaction the wallet is asked to sign and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl TxRequest {
    /// A zero-value contract call.
    pub fn call<C: SolCall>(to: Address, call: &C) -> Self {
        Self {
            to,
            data: Bytes::from(call.abi_encode()),
            value: U256::ZERO,
        }
    }
}

/// The parts of a mined receipt the providers care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn address(&self) -> Address;

    fn network(&self) -> Network;

    /// `eth_call` against `to` with raw ABI-encoded calldata.
    async fn read_contract(&self, to: Address, calldata: Bytes) -> Result<Bytes>;

    async fn send_transaction(&self, tx: TxRequest) -> Result<B256>;

    /// Block until the transaction is mined (or the wallet gives up).
    async fn wait_for_transaction_receipt(&self, tx_hash: B256) -> Result<TxReceipt>;

    async fn native_transfer(&self, to: Address, value: U256) -> Result<B256>;
}

/// Typed read: encode `call`, run it through the wallet, decode the return.
pub async fn read_call<C: SolCall>(
    wallet: &dyn WalletProvider,
    to: Address,
    call: C,
) -> Result<C::Return> {
    let calldata = Bytes::from(call.abi_encode());
    let output = wallet.read_contract(to, calldata).await?;
    C::abi_decode_returns(&output).map_err(|e| {
        ActionError::Rpc(format!(
            "Failed to decode {} result from {to}: {e}",
            C::SIGNATURE
        ))
    })
}

/// Send `tx` and wait for it to be mined successfully.
pub async fn submit_and_confirm(
    wallet: &dyn WalletProvider,
    tx: TxRequest,
    label: &str,
) -> Result<B256> {
    let tx_hash = wallet
        .send_transaction(tx)
        .await
        .map_err(|e| ActionError::TransactionFailed(format!("{label} submission failed: {e}")))?;
    debug!(%tx_hash, label, "transaction submitted");

    let receipt = wallet
        .wait_for_transaction_receipt(tx_hash)
        .await
        .map_err(|e| ActionError::TransactionFailed(format!("{label} {tx_hash}: {e}")))?;

    if !receipt.success {
        return Err(ActionError::TransactionFailed(format!(
            "{label} transaction {tx_hash} reverted"
        )));
    }
    info!(%tx_hash, label, block = ?receipt.block_number, "transaction confirmed");
    Ok(tx_hash)
}

/// Connection settings for [`EvmWalletProvider`].
#[derive(Debug, Clone)]
pub struct EvmWalletConfig {
    pub rpc_url: String,
    /// Hex private key, with or without `0x`.
    pub private_key: String,
    pub chain_id: u64,
    pub receipt_timeout: Duration,
    pub poll_interval: Duration,
}

impl EvmWalletConfig {
    pub fn new(rpc_url: impl Into<String>, private_key: impl Into<String>, chain_id: u64) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            private_key: private_key.into(),
            chain_id,
            receipt_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// A [`WalletProvider`] over an alloy HTTP provider that fills nonce, gas and
/// chain id and signs with a local key.
pub struct EvmWalletProvider {
    provider: DynProvider,
    address: Address,
    network: Network,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl EvmWalletProvider {
    pub fn new(config: &EvmWalletConfig) -> Result<Self> {
        let signer: PrivateKeySigner = config
            .private_key
            .parse()
            .map_err(|e| ActionError::Config(format!("Invalid private key: {e}")))?;
        let address = signer.address();

        let url: url::Url = config
            .rpc_url
            .parse()
            .map_err(|e| ActionError::Config(format!("Invalid RPC URL: {e}")))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        Ok(Self {
            provider,
            address,
            network: Network::from_chain_id(config.chain_id),
            receipt_timeout: config.receipt_timeout,
            poll_interval: config.poll_interval,
        })
    }

    /// Check that the RPC endpoint serves the configured chain.
    pub async fn verify_chain(&self) -> Result<()> {
        let remote = self
            .provider
            .get_chain_id()
            .await
            .map_err(|e| ActionError::Rpc(format!("Failed to fetch chain id: {e}")))?;
        match self.network.chain_id {
            Some(expected) if expected != remote => Err(ActionError::Config(format!(
                "RPC endpoint serves chain {remote}, expected {expected}"
            ))),
            _ => Ok(()),
        }
    }

    async fn send(&self, request: TransactionRequest) -> Result<B256> {
        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| ActionError::Rpc(format!("Transaction send failed: {e}")))?;
        Ok(*pending.tx_hash())
    }
}

#[async_trait]
impl WalletProvider for EvmWalletProvider {
    fn address(&self) -> Address {
        self.address
    }

    fn network(&self) -> Network {
        self.network.clone()
    }

    async fn read_contract(&self, to: Address, calldata: Bytes) -> Result<Bytes> {
        let request = TransactionRequest::default()
            .from(self.address)
            .to(to)
            .input(calldata.into());
        self.provider
            .call(request)
            .await
            .map_err(|e| ActionError::Rpc(format!("eth_call to {to} failed: {e}")))
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<B256> {
        let request = TransactionRequest::default()
            .from(self.address)
            .to(tx.to)
            .input(tx.data.into())
            .value(tx.value);
        self.send(request).await
    }

    async fn wait_for_transaction_receipt(&self, tx_hash: B256) -> Result<TxReceipt> {
        let deadline = tokio::time::Instant::now() + self.receipt_timeout;
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| ActionError::Rpc(format!("Receipt fetch failed: {e}")))?;

            match receipt {
                Some(receipt) => {
                    return Ok(TxReceipt {
                        tx_hash,
                        success: receipt.status(),
                        block_number: receipt.block_number(),
                        gas_used: Some(receipt.gas_used()),
                    });
                }
                None if tokio::time::Instant::now() >= deadline => {
                    return Err(ActionError::TransactionFailed(format!(
                        "timed out after {}s waiting for receipt of {tx_hash}",
                        self.receipt_timeout.as_secs()
                    )));
                }
                None => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }

    async fn native_transfer(&self, to: Address, value: U256) -> Result<B256> {
        let request = TransactionRequest::default()
            .from(self.address)
            .to(to)
            .value(value);
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hardhat account #0
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_creation() {
        let config = EvmWalletConfig::new("http://localhost:8545", TEST_KEY, 8453);
        let wallet = EvmWalletProvider::new(&config).unwrap();
        assert_eq!(
            wallet.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );
        assert_eq!(wallet.network().network_id.as_deref(), Some("base-mainnet"));
    }

    #[test]
    fn test_invalid_private_key() {
        let config = EvmWalletConfig::new("http://localhost:8545", "not-a-key", 1);
        assert!(matches!(
            EvmWalletProvider::new(&config),
            Err(ActionError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_rpc_url() {
        let config = EvmWalletConfig::new("not a url", TEST_KEY, 1);
        assert!(matches!(
            EvmWalletProvider::new(&config),
            Err(ActionError::Config(_))
        ));
    }

    #[test]
    fn test_tx_request_call_encodes_selector() {
        let to = Address::repeat_byte(0x11);
        let call = crate::contracts::IERC20::approveCall {
            spender: Address::repeat_byte(0x22),
            amount: U256::from(5u64),
        };
        let tx = TxRequest::call(to, &call);
        assert_eq!(tx.to, to);
        assert_eq!(tx.value, U256::ZERO);
        assert_eq!(&tx.data[..4], crate::contracts::IERC20::approveCall::SELECTOR.as_slice());
    }
}
