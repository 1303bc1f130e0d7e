//! vaults.fyi yield-vault actions.
//!
//! Listing and portfolio actions reshape the upstream JSON through
//! [`normalize`]. Deposit, redeem and claim ask the planning API for a
//! transaction sequence and run it with [`plan::PlanExecutor`].

pub mod args;
pub mod client;
pub mod normalize;
pub mod plan;

use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

pub use args::{ClaimArgs, TransferArgs, VaultDetailsArgs, VaultsArgs, VaultsFyiAction};
pub use client::{VaultFilter, VaultsFyiClient};
pub use normalize::{
    IdleAssetSummary, PositionSummary, SortKey, VaultListing, VaultSummary, build_listing,
};
pub use plan::{ExecutionPlan, Intent, PlanExecutor, PlanRequest, PlanState, Planner, TransactionStep};

use crate::actions::{ActionDefinition, ActionProvider, ParamSpec, parse_address};
use crate::amount::{AmountSpec, check_amount, to_base_units};
use crate::error::{ActionError, Result};
use crate::networks::{Network, vaultsfyi_network, vaultsfyi_network_name};
use crate::token;
use crate::wallet::WalletProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.vaults.fyi/v1";

#[derive(Debug, Clone)]
pub struct VaultsFyiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for VaultsFyiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl VaultsFyiConfig {
    /// Read `VAULTSFYI_API_URL`, `VAULTSFYI_API_KEY` and
    /// `VAULTSFYI_TIMEOUT_SECS`, keeping defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("VAULTSFYI_API_URL") {
            config.base_url = url;
        }
        config.api_key = std::env::var("VAULTSFYI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        if let Ok(secs) = std::env::var("VAULTSFYI_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|e| {
                ActionError::Config(format!("VAULTSFYI_TIMEOUT_SECS '{secs}' is not a number: {e}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

const VAULT_ADDRESS: ParamSpec = ParamSpec {
    name: "vault_address",
    required: true,
    description: "Vault contract address",
};

const ASSET_ADDRESS: ParamSpec = ParamSpec {
    name: "asset_address",
    required: true,
    description: "Underlying asset address of the vault",
};

static ACTIONS: &[ActionDefinition] = &[
    ActionDefinition {
        name: "vaultsfyi_vaults",
        description: "List yield vaults from vaults.fyi with optional filters, sorting and a result limit.",
        params: &[
            ParamSpec {
                name: "protocol",
                required: false,
                description: "Protocol filter, e.g. aave or morpho",
            },
            ParamSpec {
                name: "token",
                required: false,
                description: "Underlying token symbol filter",
            },
            ParamSpec {
                name: "network",
                required: false,
                description: "Network filter, e.g. base or base-mainnet",
            },
            ParamSpec {
                name: "min_tvl",
                required: false,
                description: "Minimum TVL in USD",
            },
            ParamSpec {
                name: "sort",
                required: false,
                description: "name (default), tvl or apy",
            },
            ParamSpec {
                name: "take",
                required: false,
                description: "Maximum number of results",
            },
        ],
    },
    ActionDefinition {
        name: "vaultsfyi_vault_details",
        description: "Show details of one vault.",
        params: &[
            VAULT_ADDRESS,
            ParamSpec {
                name: "network",
                required: false,
                description: "Vault network, defaults to the wallet's network",
            },
        ],
    },
    ActionDefinition {
        name: "vaultsfyi_deposit",
        description: "Deposit into a vault. Runs every transaction the planner returns, in order.",
        params: &[
            VAULT_ADDRESS,
            ASSET_ADDRESS,
            ParamSpec {
                name: "amount",
                required: true,
                description: "Asset amount in whole units, or \"max\" for the full wallet balance",
            },
        ],
    },
    ActionDefinition {
        name: "vaultsfyi_redeem",
        description: "Redeem vault shares for the underlying asset.",
        params: &[
            VAULT_ADDRESS,
            ASSET_ADDRESS,
            ParamSpec {
                name: "amount",
                required: true,
                description: "Share amount in whole units, or \"max\" for every share held",
            },
        ],
    },
    ActionDefinition {
        name: "vaultsfyi_claim",
        description: "Claim accrued vault rewards.",
        params: &[VAULT_ADDRESS, ASSET_ADDRESS],
    },
    ActionDefinition {
        name: "vaultsfyi_positions",
        description: "List the wallet's vault positions on its network.",
        params: &[],
    },
    ActionDefinition {
        name: "vaultsfyi_idle_assets",
        description: "List wallet balances that are not earning yield.",
        params: &[],
    },
];

pub struct VaultsFyiActionProvider {
    client: VaultsFyiClient,
}

impl VaultsFyiActionProvider {
    pub fn new(config: &VaultsFyiConfig) -> Result<Self> {
        Ok(Self {
            client: VaultsFyiClient::new(config)?,
        })
    }

    pub fn client(&self) -> &VaultsFyiClient {
        &self.client
    }

    async fn vaults(&self, args: VaultsArgs) -> Result<String> {
        let filter = VaultFilter {
            network: args
                .network
                .as_deref()
                .map(|n| vaultsfyi_network_name(n).map_or_else(|| n.to_string(), str::to_string)),
            token: args.token,
            protocol: args.protocol,
            min_tvl: args.min_tvl,
        };
        let vaults = self.client.list_vaults(&filter).await?;
        to_json(&build_listing(vaults, args.sort, args.take))
    }

    async fn vault_details(&self, wallet: &dyn WalletProvider, args: VaultDetailsArgs) -> Result<String> {
        let vault = parse_address("vault_address", &args.vault_address)?;
        let network = match args.network.as_deref() {
            Some(n) => vaultsfyi_network_name(n).map_or_else(|| n.to_string(), str::to_string),
            None => vaultsfyi_network(&wallet.network())?.to_string(),
        };
        let detail = self.client.vault(&network, vault).await?;
        to_json(&VaultSummary::detailed(detail))
    }

    async fn transfer(
        &self,
        wallet: &dyn WalletProvider,
        intent: Intent,
        args: TransferArgs,
    ) -> Result<String> {
        let network = vaultsfyi_network(&wallet.network())?;
        let vault = parse_address("vault_address", &args.vault_address)?;
        let asset = parse_address("asset_address", &args.asset_address)?;
        let sender = wallet.address();

        // Deposits spend the asset, redemptions spend vault shares.
        let token = match intent {
            Intent::Redeem => vault,
            _ => asset,
        };
        let amount = resolve_amount(wallet, &args.amount, token, sender, intent).await?;
        info!(%intent, %vault, %amount, network, "vaults.fyi transfer");

        let request = PlanRequest {
            intent,
            sender,
            network: network.to_string(),
            vault_address: vault,
            asset_address: asset,
            amount: Some(amount),
        };
        PlanExecutor::new(&self.client, wallet).run(&request).await
    }

    async fn claim(&self, wallet: &dyn WalletProvider, args: ClaimArgs) -> Result<String> {
        let network = vaultsfyi_network(&wallet.network())?;
        let request = PlanRequest {
            intent: Intent::Claim,
            sender: wallet.address(),
            network: network.to_string(),
            vault_address: parse_address("vault_address", &args.vault_address)?,
            asset_address: parse_address("asset_address", &args.asset_address)?,
            amount: None,
        };
        PlanExecutor::new(&self.client, wallet).run(&request).await
    }

    async fn positions(&self, wallet: &dyn WalletProvider) -> Result<String> {
        let network = vaultsfyi_network(&wallet.network())?;
        let positions = self.client.positions(wallet.address(), Some(network)).await?;
        let summaries: Vec<PositionSummary> = positions.into_iter().map(Into::into).collect();
        to_json(&summaries)
    }

    async fn idle_assets(&self, wallet: &dyn WalletProvider) -> Result<String> {
        let assets = self.client.idle_assets(wallet.address()).await?;
        let summaries: Vec<IdleAssetSummary> = assets.into_iter().map(Into::into).collect();
        to_json(&summaries)
    }
}

/// Base units of `token` for `amount`; `"max"` is the sender's full balance.
async fn resolve_amount(
    wallet: &dyn WalletProvider,
    amount: &AmountSpec,
    token: Address,
    sender: Address,
    intent: Intent,
) -> Result<U256> {
    match amount {
        AmountSpec::Exact(value) => {
            check_amount(value)?;
            let decimals = token::decimals(wallet, token).await?;
            to_base_units(value, decimals)
        }
        AmountSpec::Max => {
            let balance = token::balance_of(wallet, token, sender).await?;
            if balance.is_zero() {
                return Err(ActionError::InvalidAmount(format!(
                    "nothing to {intent}: balance of {token} is zero"
                )));
            }
            Ok(balance)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn operation(action: &str) -> &'static str {
    match action {
        "vaultsfyi_vaults" => "fetch vaults",
        "vaultsfyi_vault_details" => "fetch vault details",
        "vaultsfyi_deposit" => "deposit",
        "vaultsfyi_redeem" => "redeem",
        "vaultsfyi_claim" => "claim",
        "vaultsfyi_positions" => "fetch positions",
        "vaultsfyi_idle_assets" => "fetch idle assets",
        _ => "run action",
    }
}

#[async_trait]
impl ActionProvider for VaultsFyiActionProvider {
    fn id(&self) -> &'static str {
        "vaultsfyi"
    }

    fn actions(&self) -> &'static [ActionDefinition] {
        ACTIONS
    }

    fn supports_network(&self, network: &Network) -> bool {
        network.is_evm() && vaultsfyi_network(network).is_ok()
    }

    async fn invoke(
        &self,
        action: &str,
        args: serde_json::Value,
        wallet: &dyn WalletProvider,
    ) -> Result<String> {
        match VaultsFyiAction::parse(action, args)? {
            VaultsFyiAction::Vaults(args) => self.vaults(args).await,
            VaultsFyiAction::VaultDetails(args) => self.vault_details(wallet, args).await,
            VaultsFyiAction::Deposit(args) => self.transfer(wallet, Intent::Deposit, args).await,
            VaultsFyiAction::Redeem(args) => self.transfer(wallet, Intent::Redeem, args).await,
            VaultsFyiAction::Claim(args) => self.claim(wallet, args).await,
            VaultsFyiAction::Positions => self.positions(wallet).await,
            VaultsFyiAction::IdleAssets => self.idle_assets(wallet).await,
        }
    }

    /// Upstream and per-step failures already read "Failed to ...".
    fn describe_failure(&self, action: &str, error: &ActionError) -> String {
        match error {
            ActionError::PlanningFailed { .. } | ActionError::StepFailed { .. } => error.to_string(),
            _ => format!("Failed to {}: {error}", operation(action)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VaultsFyiConfig::default();
        assert_eq!(config.base_url, "https://api.vaults.fyi/v1");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_supported_networks() {
        let provider = VaultsFyiActionProvider::new(&VaultsFyiConfig::default()).unwrap();
        assert!(provider.supports_network(&Network::from_chain_id(8453)));
        assert!(provider.supports_network(&Network::from_chain_id(137)));
        assert!(!provider.supports_network(&Network::from_chain_id(84532)));
    }

    #[test]
    fn test_describe_failure_keeps_upstream_text() {
        let provider = VaultsFyiActionProvider::new(&VaultsFyiConfig::default()).unwrap();
        let upstream = ActionError::PlanningFailed {
            op: "deposit".into(),
            error: "Bad Request".into(),
            message: "Vault paused".into(),
        };
        assert_eq!(
            provider.describe_failure("vaultsfyi_deposit", &upstream),
            "Failed to deposit: Bad Request, Vault paused"
        );
        let local = ActionError::InvalidAmount("zero".into());
        assert_eq!(
            provider.describe_failure("vaultsfyi_redeem", &local),
            "Failed to redeem: Invalid amount: zero"
        );
    }
}
