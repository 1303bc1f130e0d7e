//! Aave V3 lending actions: supply, withdraw, borrow, repay, collateral toggle
//! and a read-only portfolio summary.
//!
//! Every write resolves the market and asset from the static tables first, so
//! an unsupported network or asset never touches the chain. Supply and repay
//! approve the pool for the exact amount when the allowance is short, and the
//! approval is mined before the pool call is sent.

pub mod args;
pub mod portfolio;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, warn};

pub use args::{
    AaveAction, BorrowArgs, InterestRateMode, PortfolioArgs, RepayArgs, SetCollateralArgs,
    SupplyArgs, WithdrawArgs,
};
pub use portfolio::{AccountData, HealthFactor, PortfolioSnapshot};

use crate::actions::{ActionDefinition, ActionProvider, ParamSpec, address_or};
use crate::amount::{AmountSpec, from_base_units, to_base_units};
use crate::contracts::IPool;
use crate::error::{ActionError, Result};
use crate::networks::{AaveMarket, AssetReference, Network, aave_market, aave_supports};
use crate::token;
use crate::wallet::{TxRequest, WalletProvider, submit_and_confirm};

const ASSET_ID: ParamSpec = ParamSpec {
    name: "asset_id",
    required: true,
    description: "Asset identifier: weth, usdc, cbeth or wsteth (availability varies by network)",
};

static ACTIONS: &[ActionDefinition] = &[
    ActionDefinition {
        name: "aave_supply",
        description: "Supply an asset to Aave V3 as collateral. Approves the pool first when needed.",
        params: &[
            ASSET_ID,
            ParamSpec {
                name: "amount",
                required: true,
                description: "Amount in whole units, e.g. 0.1, or \"max\" for the full wallet balance",
            },
            ParamSpec {
                name: "on_behalf_of",
                required: false,
                description: "Address credited with the supply, defaults to the wallet",
            },
            ParamSpec {
                name: "referral_code",
                required: false,
                description: "Aave referral code, defaults to 0",
            },
        ],
    },
    ActionDefinition {
        name: "aave_withdraw",
        description: "Withdraw a supplied asset from Aave V3.",
        params: &[
            ASSET_ID,
            ParamSpec {
                name: "amount",
                required: true,
                description: "Amount in whole units, or \"max\" for the full supplied balance",
            },
            ParamSpec {
                name: "to",
                required: false,
                description: "Recipient address, defaults to the wallet",
            },
        ],
    },
    ActionDefinition {
        name: "aave_borrow",
        description: "Borrow an asset from Aave V3 against supplied collateral.",
        params: &[
            ASSET_ID,
            ParamSpec {
                name: "amount",
                required: true,
                description: "Amount in whole units",
            },
            ParamSpec {
                name: "interest_rate_mode",
                required: false,
                description: "1 for stable, 2 for variable (default)",
            },
            ParamSpec {
                name: "on_behalf_of",
                required: false,
                description: "Address receiving the debt, defaults to the wallet",
            },
            ParamSpec {
                name: "referral_code",
                required: false,
                description: "Aave referral code, defaults to 0",
            },
        ],
    },
    ActionDefinition {
        name: "aave_repay",
        description: "Repay borrowed assets on Aave V3. Approves the pool first when needed.",
        params: &[
            ASSET_ID,
            ParamSpec {
                name: "amount",
                required: true,
                description: "Amount in whole units, or \"max\" for the full outstanding debt",
            },
            ParamSpec {
                name: "interest_rate_mode",
                required: false,
                description: "1 for stable, 2 for variable (default)",
            },
            ParamSpec {
                name: "on_behalf_of",
                required: false,
                description: "Address whose debt is repaid, defaults to the wallet",
            },
        ],
    },
    ActionDefinition {
        name: "aave_set_collateral",
        description: "Enable or disable a supplied asset as collateral on Aave V3.",
        params: &[
            ASSET_ID,
            ParamSpec {
                name: "use_as_collateral",
                required: true,
                description: "true to enable, false to disable",
            },
        ],
    },
    ActionDefinition {
        name: "aave_portfolio",
        description: "Show Aave V3 collateral, debt, borrowing capacity, health factor and positions.",
        params: &[ParamSpec {
            name: "account",
            required: false,
            description: "Account to inspect, defaults to the wallet",
        }],
    },
];

/// Aave V3 lending actions over the pools in [`crate::networks`].
#[derive(Debug, Clone, Default)]
pub struct AaveActionProvider;

impl AaveActionProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionProvider for AaveActionProvider {
    fn id(&self) -> &'static str {
        "aave"
    }

    fn actions(&self) -> &'static [ActionDefinition] {
        ACTIONS
    }

    fn supports_network(&self, network: &Network) -> bool {
        aave_supports(network)
    }

    async fn invoke(
        &self,
        action: &str,
        args: serde_json::Value,
        wallet: &dyn WalletProvider,
    ) -> Result<String> {
        match AaveAction::parse(action, args)? {
            AaveAction::Supply(args) => supply(wallet, args).await,
            AaveAction::Withdraw(args) => withdraw(wallet, args).await,
            AaveAction::Borrow(args) => borrow(wallet, args).await,
            AaveAction::Repay(args) => repay(wallet, args).await,
            AaveAction::SetCollateral(args) => set_collateral(wallet, args).await,
            AaveAction::Portfolio(args) => portfolio(wallet, args).await,
        }
    }

    fn describe_failure(&self, action: &str, error: &ActionError) -> String {
        let doing = match action {
            "aave_supply" => "supplying to Aave",
            "aave_withdraw" => "withdrawing from Aave",
            "aave_borrow" => "borrowing from Aave",
            "aave_repay" => "repaying to Aave",
            "aave_set_collateral" => "updating collateral on Aave",
            "aave_portfolio" => "getting portfolio details from Aave",
            _ => return format!("Error running {action}: {error}"),
        };
        format!("Error {doing}: {error}")
    }
}

/// Resolve market and asset from the static tables. No chain access.
fn resolve(
    wallet: &dyn WalletProvider,
    asset_id: &str,
) -> Result<(&'static AaveMarket, &'static AssetReference)> {
    let market = aave_market(&wallet.network())?;
    let asset = market.asset(asset_id)?;
    Ok((market, asset))
}

/// Base units for an exact amount, `None` for `"max"`.
fn exact_amount(amount: &AmountSpec, asset: &AssetReference) -> Result<Option<U256>> {
    match amount {
        AmountSpec::Max => Ok(None),
        AmountSpec::Exact(value) => to_base_units(value, asset.decimals).map(Some),
    }
}

fn non_zero(value: U256, what: &str, asset: &AssetReference) -> Result<U256> {
    if value.is_zero() {
        return Err(ActionError::InvalidAmount(format!(
            "nothing to {what}: {} balance is zero",
            asset.symbol
        )));
    }
    Ok(value)
}

fn ensure_balance(balance: U256, amount: U256, asset: &AssetReference) -> Result<()> {
    if balance < amount {
        return Err(ActionError::InsufficientBalance {
            asset: asset.symbol.to_string(),
            have: from_base_units(balance, asset.decimals),
            need: from_base_units(amount, asset.decimals),
        });
    }
    Ok(())
}

async fn health(wallet: &dyn WalletProvider, pool: Address, account: Address) -> Option<HealthFactor> {
    match portfolio::read_account_data(wallet, pool, account).await {
        Ok(data) => Some(data.health_factor()),
        Err(e) => {
            warn!(%account, "health factor read failed: {e}");
            None
        }
    }
}

fn health_change(before: Option<HealthFactor>, after: Option<HealthFactor>) -> String {
    match (before, after) {
        (Some(before), Some(after)) if before.is_bounded() || after.is_bounded() => {
            format!("\nHealth factor changed from {before} to {after}")
        }
        _ => String::new(),
    }
}

/// Borrows that leave the health factor at or below this get a warning.
fn low_health_threshold() -> Decimal {
    Decimal::new(11, 1)
}

async fn supply(wallet: &dyn WalletProvider, args: SupplyArgs) -> Result<String> {
    let (market, asset) = resolve(wallet, &args.asset_id)?;
    let caller = wallet.address();
    let on_behalf_of = address_or("on_behalf_of", args.on_behalf_of.as_deref(), caller)?;
    let requested = exact_amount(&args.amount, asset)?;

    let balance = token::balance_of(wallet, asset.address, caller).await?;
    let amount = match requested {
        Some(amount) => amount,
        None => non_zero(balance, "supply", asset)?,
    };
    ensure_balance(balance, amount, asset)?;

    let before = health(wallet, market.pool, on_behalf_of).await;
    token::ensure_allowance(wallet, asset.address, market.pool, amount).await?;

    info!(asset = asset.symbol, %amount, %on_behalf_of, "aave supply");
    let call = IPool::supplyCall {
        asset: asset.address,
        amount,
        onBehalfOf: on_behalf_of,
        referralCode: args.referral_code,
    };
    let tx_hash = submit_and_confirm(wallet, TxRequest::call(market.pool, &call), "supply").await?;
    let after = health(wallet, market.pool, on_behalf_of).await;

    Ok(format!(
        "Successfully supplied {} {} to Aave.\nTransaction hash: {tx_hash}{}",
        from_base_units(amount, asset.decimals),
        asset.symbol,
        health_change(before, after)
    ))
}

async fn withdraw(wallet: &dyn WalletProvider, args: WithdrawArgs) -> Result<String> {
    let (market, asset) = resolve(wallet, &args.asset_id)?;
    let caller = wallet.address();
    let to = address_or("to", args.to.as_deref(), caller)?;
    let requested = exact_amount(&args.amount, asset)?;

    let account = portfolio::read_account_data(wallet, market.pool, caller).await?;
    let amount = match requested {
        Some(amount) => amount,
        None => {
            if account.has_debt() {
                return Err(ActionError::Precondition(format!(
                    "Cannot withdraw all {} while you have outstanding debt. Repay your debt or withdraw a specific amount.",
                    asset.symbol
                )));
            }
            let reserve = portfolio::read_reserve(wallet, market.pool, asset.address).await?;
            let supplied = token::balance_of(wallet, reserve.aTokenAddress, caller).await?;
            non_zero(supplied, "withdraw", asset)?
        }
    };
    let before = Some(account.health_factor());

    info!(asset = asset.symbol, %amount, %to, "aave withdraw");
    let call = IPool::withdrawCall {
        asset: asset.address,
        amount,
        to,
    };
    let tx_hash = submit_and_confirm(wallet, TxRequest::call(market.pool, &call), "withdraw").await?;
    let after = health(wallet, market.pool, caller).await;

    Ok(format!(
        "Successfully withdrew {} {} from Aave.\nTransaction hash: {tx_hash}{}",
        from_base_units(amount, asset.decimals),
        asset.symbol,
        health_change(before, after)
    ))
}

async fn borrow(wallet: &dyn WalletProvider, args: BorrowArgs) -> Result<String> {
    let (market, asset) = resolve(wallet, &args.asset_id)?;
    let caller = wallet.address();
    let on_behalf_of = address_or("on_behalf_of", args.on_behalf_of.as_deref(), caller)?;
    let Some(amount) = exact_amount(&args.amount, asset)? else {
        return Err(ActionError::InvalidAmount(
            "\"max\" is not supported for borrow; specify an amount".to_string(),
        ));
    };

    let account = portfolio::read_account_data(wallet, market.pool, on_behalf_of).await?;
    if !account.has_collateral() {
        return Err(ActionError::Precondition(
            "No collateral supplied. Supply collateral to Aave before borrowing.".to_string(),
        ));
    }
    let before = account.health_factor();

    info!(asset = asset.symbol, %amount, mode = %args.interest_rate_mode, "aave borrow");
    let call = IPool::borrowCall {
        asset: asset.address,
        amount,
        interestRateMode: args.interest_rate_mode.as_u256(),
        referralCode: args.referral_code,
        onBehalfOf: on_behalf_of,
    };
    let tx_hash = submit_and_confirm(wallet, TxRequest::call(market.pool, &call), "borrow").await?;
    let after = health(wallet, market.pool, on_behalf_of).await;

    let mut message = format!(
        "Successfully borrowed {} {} from Aave with {} interest rate.\nTransaction hash: {tx_hash}{}",
        from_base_units(amount, asset.decimals),
        asset.symbol,
        args.interest_rate_mode,
        health_change(Some(before), after)
    );
    if let Some(after) = after.filter(|hf| hf.at_or_below(low_health_threshold())) {
        message.push_str(&format!(
            "\nWARNING: Your health factor is now {after}, which is dangerously low. Consider repaying some debt or adding more collateral to avoid liquidation."
        ));
    }
    Ok(message)
}

async fn repay(wallet: &dyn WalletProvider, args: RepayArgs) -> Result<String> {
    let (market, asset) = resolve(wallet, &args.asset_id)?;
    let caller = wallet.address();
    let on_behalf_of = address_or("on_behalf_of", args.on_behalf_of.as_deref(), caller)?;
    let requested = exact_amount(&args.amount, asset)?;

    let amount = match requested {
        Some(amount) => amount,
        None => {
            let reserve = portfolio::read_reserve(wallet, market.pool, asset.address).await?;
            let debt_token = match args.interest_rate_mode {
                InterestRateMode::Stable => reserve.stableDebtTokenAddress,
                InterestRateMode::Variable => reserve.variableDebtTokenAddress,
            };
            let debt = token::balance_of(wallet, debt_token, on_behalf_of).await?;
            non_zero(debt, "repay", asset)?
        }
    };
    let balance = token::balance_of(wallet, asset.address, caller).await?;
    ensure_balance(balance, amount, asset)?;

    let before = health(wallet, market.pool, on_behalf_of).await;
    token::ensure_allowance(wallet, asset.address, market.pool, amount).await?;

    info!(asset = asset.symbol, %amount, mode = %args.interest_rate_mode, "aave repay");
    let call = IPool::repayCall {
        asset: asset.address,
        amount,
        interestRateMode: args.interest_rate_mode.as_u256(),
        onBehalfOf: on_behalf_of,
    };
    let tx_hash = submit_and_confirm(wallet, TxRequest::call(market.pool, &call), "repay").await?;
    let after = health(wallet, market.pool, on_behalf_of).await;

    let health_message = match after {
        Some(HealthFactor::Unbounded) => {
            "\nYou have repaid all your debt and have no active borrows.".to_string()
        }
        _ => health_change(before, after),
    };
    Ok(format!(
        "Successfully repaid {} {} to Aave with {} interest rate.\nTransaction hash: {tx_hash}{health_message}",
        from_base_units(amount, asset.decimals),
        asset.symbol,
        args.interest_rate_mode,
    ))
}

async fn set_collateral(wallet: &dyn WalletProvider, args: SetCollateralArgs) -> Result<String> {
    let (market, asset) = resolve(wallet, &args.asset_id)?;

    info!(asset = asset.symbol, enable = args.use_as_collateral, "aave set collateral");
    let call = IPool::setUserUseReserveAsCollateralCall {
        asset: asset.address,
        useAsCollateral: args.use_as_collateral,
    };
    let tx_hash =
        submit_and_confirm(wallet, TxRequest::call(market.pool, &call), "set collateral").await?;

    let verb = if args.use_as_collateral { "enabled" } else { "disabled" };
    Ok(format!(
        "Successfully {verb} {} as collateral on Aave.\nTransaction hash: {tx_hash}",
        asset.symbol
    ))
}

async fn portfolio(wallet: &dyn WalletProvider, args: PortfolioArgs) -> Result<String> {
    let market = aave_market(&wallet.network())?;
    let account = address_or("account", args.account.as_deref(), wallet.address())?;
    let snapshot = portfolio::read_snapshot(wallet, market, account).await?;
    Ok(snapshot.to_markdown())
}
