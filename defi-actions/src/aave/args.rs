//! Argument types for the Aave actions. Every struct rejects unknown fields.

use std::fmt;

use alloy::primitives::U256;
use serde::Deserialize;

use crate::actions::parse_args;
use crate::amount::AmountSpec;
use crate::error::{ActionError, Result};

/// Aave interest-rate mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "u8")]
pub enum InterestRateMode {
    Stable,
    #[default]
    Variable,
}

impl TryFrom<u8> for InterestRateMode {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(InterestRateMode::Stable),
            2 => Ok(InterestRateMode::Variable),
            other => Err(format!(
                "interest_rate_mode must be 1 (stable) or 2 (variable), got {other}"
            )),
        }
    }
}

impl InterestRateMode {
    pub fn as_u256(self) -> U256 {
        match self {
            InterestRateMode::Stable => U256::from(1u8),
            InterestRateMode::Variable => U256::from(2u8),
        }
    }
}

impl fmt::Display for InterestRateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterestRateMode::Stable => f.write_str("stable"),
            InterestRateMode::Variable => f.write_str("variable"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupplyArgs {
    pub asset_id: String,
    pub amount: AmountSpec,
    #[serde(default)]
    pub on_behalf_of: Option<String>,
    #[serde(default)]
    pub referral_code: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WithdrawArgs {
    pub asset_id: String,
    pub amount: AmountSpec,
    #[serde(default)]
    pub to: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BorrowArgs {
    pub asset_id: String,
    pub amount: AmountSpec,
    #[serde(default)]
    pub interest_rate_mode: InterestRateMode,
    #[serde(default)]
    pub on_behalf_of: Option<String>,
    #[serde(default)]
    pub referral_code: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepayArgs {
    pub asset_id: String,
    pub amount: AmountSpec,
    #[serde(default)]
    pub interest_rate_mode: InterestRateMode,
    #[serde(default)]
    pub on_behalf_of: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetCollateralArgs {
    pub asset_id: String,
    pub use_as_collateral: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortfolioArgs {
    #[serde(default)]
    pub account: Option<String>,
}

/// One validated Aave action.
#[derive(Debug, Clone)]
pub enum AaveAction {
    Supply(SupplyArgs),
    Withdraw(WithdrawArgs),
    Borrow(BorrowArgs),
    Repay(RepayArgs),
    SetCollateral(SetCollateralArgs),
    Portfolio(PortfolioArgs),
}

impl AaveAction {
    pub fn parse(action: &str, args: serde_json::Value) -> Result<Self> {
        match action {
            "aave_supply" => parse_args(action, args).map(AaveAction::Supply),
            "aave_withdraw" => parse_args(action, args).map(AaveAction::Withdraw),
            "aave_borrow" => parse_args(action, args).map(AaveAction::Borrow),
            "aave_repay" => parse_args(action, args).map(AaveAction::Repay),
            "aave_set_collateral" => parse_args(action, args).map(AaveAction::SetCollateral),
            "aave_portfolio" => parse_args(action, args).map(AaveAction::Portfolio),
            other => Err(ActionError::UnknownAction(other.to_string())),
        }
    }
}
