use serde::Deserialize;

use super::normalize::SortKey;
use crate::actions::parse_args;
use crate::amount::AmountSpec;
use crate::error::{ActionError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VaultsArgs {
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// vaults.fyi network name or network id; all networks when absent.
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub min_tvl: Option<f64>,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub take: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VaultDetailsArgs {
    pub vault_address: String,
    /// Defaults to the wallet's network.
    #[serde(default)]
    pub network: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferArgs {
    pub vault_address: String,
    pub asset_address: String,
    pub amount: AmountSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimArgs {
    pub vault_address: String,
    pub asset_address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmptyArgs {}

#[derive(Debug, Clone)]
pub enum VaultsFyiAction {
    Vaults(VaultsArgs),
    VaultDetails(VaultDetailsArgs),
    Deposit(TransferArgs),
    Redeem(TransferArgs),
    Claim(ClaimArgs),
    Positions,
    IdleAssets,
}

impl VaultsFyiAction {
    pub fn parse(action: &str, args: serde_json::Value) -> Result<Self> {
        match action {
            "vaultsfyi_vaults" => {
                let args: VaultsArgs = parse_args(action, args)?;
                if args.take == Some(0) {
                    return Err(ActionError::InvalidArguments(
                        "take must be at least 1".to_string(),
                    ));
                }
                Ok(VaultsFyiAction::Vaults(args))
            }
            "vaultsfyi_vault_details" => parse_args(action, args).map(VaultsFyiAction::VaultDetails),
            "vaultsfyi_deposit" => parse_args(action, args).map(VaultsFyiAction::Deposit),
            "vaultsfyi_redeem" => parse_args(action, args).map(VaultsFyiAction::Redeem),
            "vaultsfyi_claim" => parse_args(action, args).map(VaultsFyiAction::Claim),
            "vaultsfyi_positions" => {
                parse_args::<EmptyArgs>(action, args).map(|_| VaultsFyiAction::Positions)
            }
            "vaultsfyi_idle_assets" => {
                parse_args::<EmptyArgs>(action, args).map(|_| VaultsFyiAction::IdleAssets)
            }
            other => Err(ActionError::UnknownAction(other.to_string())),
        }
    }
}
