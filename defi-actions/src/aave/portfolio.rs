//! Aave account reads and the markdown portfolio summary.
//!
//! Base-currency values are USD with 8 decimals, ltv and liquidation threshold
//! are basis points, and the health factor is WAD-scaled.

use std::fmt;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::debug;

use crate::amount::{from_base_units, to_decimal};
use crate::contracts::IPool;
use crate::error::Result;
use crate::networks::{AaveMarket, AssetReference};
use crate::token;
use crate::wallet::{WalletProvider, read_call};

const BASE_CURRENCY_DECIMALS: u8 = 8;
const WAD_DECIMALS: u8 = 18;
const BPS_DENOMINATOR: u64 = 10_000;

/// Raw `getUserAccountData` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountData {
    pub total_collateral_base: U256,
    pub total_debt_base: U256,
    pub liquidation_threshold_bps: U256,
    pub ltv_bps: U256,
    pub health_factor_wad: U256,
}

impl AccountData {
    pub fn health_factor(&self) -> HealthFactor {
        HealthFactor::from_raw(self.total_debt_base, self.health_factor_wad)
    }

    /// collateral × ltv − debt, never below zero.
    pub fn available_to_borrow(&self) -> U256 {
        (self.total_collateral_base
            .saturating_mul(self.ltv_bps)
            / U256::from(BPS_DENOMINATOR))
            .saturating_sub(self.total_debt_base)
    }

    pub fn has_debt(&self) -> bool {
        !self.total_debt_base.is_zero()
    }

    pub fn has_collateral(&self) -> bool {
        !self.total_collateral_base.is_zero()
    }
}

pub async fn read_account_data(
    wallet: &dyn WalletProvider,
    pool: Address,
    account: Address,
) -> Result<AccountData> {
    let data = read_call(wallet, pool, IPool::getUserAccountDataCall { user: account }).await?;
    Ok(AccountData {
        total_collateral_base: data.totalCollateralBase,
        total_debt_base: data.totalDebtBase,
        liquidation_threshold_bps: data.currentLiquidationThreshold,
        ltv_bps: data.ltv,
        health_factor_wad: data.healthFactor,
    })
}

pub async fn read_reserve(
    wallet: &dyn WalletProvider,
    pool: Address,
    asset: Address,
) -> Result<IPool::ReserveData> {
    read_call(wallet, pool, IPool::getReserveDataCall { asset }).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthFactor {
    /// No debt.
    Unbounded,
    Finite(Decimal),
}

impl HealthFactor {
    pub fn from_raw(total_debt_base: U256, health_factor_wad: U256) -> Self {
        if total_debt_base.is_zero() {
            return HealthFactor::Unbounded;
        }
        // Values past Decimal's range only occur for dust debt.
        match to_decimal(health_factor_wad, WAD_DECIMALS) {
            Some(value) => HealthFactor::Finite(value),
            None => HealthFactor::Unbounded,
        }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self, HealthFactor::Finite(_))
    }

    pub fn is_healthy(&self) -> bool {
        match self {
            HealthFactor::Unbounded => true,
            HealthFactor::Finite(value) => *value > Decimal::ONE,
        }
    }

    /// True when bounded and at or below `threshold`.
    pub fn at_or_below(&self, threshold: Decimal) -> bool {
        matches!(self, HealthFactor::Finite(value) if *value <= threshold)
    }

    pub fn classification(&self) -> &'static str {
        if self.is_healthy() {
            "Healthy"
        } else {
            "At risk of liquidation"
        }
    }
}

impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthFactor::Unbounded => f.write_str("∞"),
            HealthFactor::Finite(value) => write!(f, "{:.2}", value),
        }
    }
}

/// Supplied and borrowed balances of one reserve, in base units.
#[derive(Debug, Clone)]
pub struct AssetPosition {
    pub asset: AssetReference,
    pub supplied: U256,
    pub borrowed: U256,
}

#[derive(Debug, Clone)]
pub struct PortfolioSnapshot {
    pub account: Address,
    pub network_id: &'static str,
    pub account_data: AccountData,
    pub positions: Vec<AssetPosition>,
    pub as_of: DateTime<Utc>,
}

async fn read_position(
    wallet: &dyn WalletProvider,
    pool: Address,
    asset: AssetReference,
    account: Address,
) -> Result<AssetPosition> {
    let reserve = read_reserve(wallet, pool, asset.address).await?;
    let (supplied, variable_debt, stable_debt) = futures::try_join!(
        token::balance_of(wallet, reserve.aTokenAddress, account),
        token::balance_of(wallet, reserve.variableDebtTokenAddress, account),
        token::balance_of(wallet, reserve.stableDebtTokenAddress, account),
    )?;
    Ok(AssetPosition {
        asset,
        supplied,
        borrowed: variable_debt.saturating_add(stable_debt),
    })
}

/// Read account totals and every listed reserve's balances concurrently.
pub async fn read_snapshot(
    wallet: &dyn WalletProvider,
    market: &AaveMarket,
    account: Address,
) -> Result<PortfolioSnapshot> {
    let positions = join_all(
        market
            .assets
            .iter()
            .map(|asset| read_position(wallet, market.pool, *asset, account)),
    );
    let (account_data, positions) =
        futures::join!(read_account_data(wallet, market.pool, account), positions);
    let account_data = account_data?;

    let positions = positions
        .into_iter()
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .filter(|p| !p.supplied.is_zero() || !p.borrowed.is_zero())
        .collect::<Vec<_>>();
    debug!(%account, positions = positions.len(), "portfolio read");

    Ok(PortfolioSnapshot {
        account,
        network_id: market.network_id,
        account_data,
        positions,
        as_of: Utc::now(),
    })
}

fn usd(value: U256) -> String {
    match to_decimal(value, BASE_CURRENCY_DECIMALS) {
        Some(d) => format!("${:.2}", d),
        None => format!("${}", from_base_units(value, BASE_CURRENCY_DECIMALS)),
    }
}

fn percent(bps: U256) -> String {
    match to_decimal(bps, 2) {
        Some(d) => format!("{:.2}%", d),
        None => format!("{}%", from_base_units(bps, 2)),
    }
}

fn short_address(address: Address) -> String {
    let s = address.to_checksum(None);
    format!("{}...{}", &s[..6], &s[s.len() - 4..])
}

impl PortfolioSnapshot {
    pub fn health_factor(&self) -> HealthFactor {
        self.account_data.health_factor()
    }

    pub fn to_markdown(&self) -> String {
        let data = &self.account_data;
        let health = self.health_factor();
        let mut out = format!("# Aave Portfolio for {}\n\n", short_address(self.account));

        out.push_str("## Summary\n\n");
        out.push_str(&format!("**Network:** {}\n", self.network_id));
        out.push_str(&format!("**Total Collateral:** {}\n", usd(data.total_collateral_base)));
        out.push_str(&format!("**Total Debt:** {}\n", usd(data.total_debt_base)));
        out.push_str(&format!("**Available to Borrow:** {}\n", usd(data.available_to_borrow())));
        out.push_str(&format!(
            "**Liquidation Threshold:** {}\n",
            percent(data.liquidation_threshold_bps)
        ));
        out.push_str(&format!("**Loan to Value:** {}\n", percent(data.ltv_bps)));
        match health {
            HealthFactor::Unbounded => {
                out.push_str("**Health Factor:** ∞ (Healthy, no borrows)\n");
            }
            HealthFactor::Finite(_) => {
                out.push_str(&format!(
                    "**Health Factor:** {} ({})\n",
                    health,
                    health.classification()
                ));
            }
        }

        out.push_str("\n## Positions\n\n");
        if self.positions.is_empty() {
            out.push_str("No open positions.\n");
        } else {
            out.push_str("| Asset | Supplied | Borrowed |\n|---|---|---|\n");
            for position in &self.positions {
                let decimals = position.asset.decimals;
                out.push_str(&format!(
                    "| {} | {} | {} |\n",
                    position.asset.symbol,
                    from_base_units(position.supplied, decimals),
                    from_base_units(position.borrowed, decimals)
                ));
            }
        }

        if !health.is_healthy() {
            out.push_str(
                "\n**WARNING**: Your position is at risk of liquidation. Consider repaying some debt or adding more collateral.\n",
            );
        }

        out.push_str(&format!("\n_As of {}_\n", self.as_of.to_rfc3339()));
        out
    }
}
