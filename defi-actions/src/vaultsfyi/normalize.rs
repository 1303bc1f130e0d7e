//! Upstream vaults.fyi records and the smaller shapes returned to the agent.
//!
//! Upstream APYs are basis points; normalized APYs are percent. Upstream
//! balances are base-unit integers; normalized balances are decimal strings
//! scaled by each record's own decimals.

use std::cmp::Ordering;

use alloy::primitives::U256;
use serde::{Deserialize, Deserializer, Serialize};

use crate::amount::from_base_units;

pub const OPPORTUNITY_BASE_URL: &str = "https://app.vaults.fyi/opportunity";

/// Number or numeric string. Numbers keep their literal digits, so base-unit
/// balances beyond `f64` precision survive intact.
#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(serde_json::Number),
    Text(String),
}

impl Numeric {
    /// Non-finite values are treated as absent.
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Numeric::Number(n) => n.as_f64(),
            Numeric::Text(s) => s.trim().parse().ok(),
        };
        value.filter(|v: &f64| v.is_finite())
    }

    fn into_text(self) -> String {
        match self {
            Numeric::Number(n) => n.to_string(),
            Numeric::Text(s) => s,
        }
    }
}

fn flexible_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Option::<Numeric>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).unwrap_or(0.0))
}

fn flexible_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Numeric>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

fn flexible_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<Numeric>::deserialize(deserializer)?;
    Ok(value.map(Numeric::into_text).unwrap_or_else(|| "0".to_string()))
}

// ── Upstream shapes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ApiList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiToken {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub asset_address: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub decimals: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiApyWindows {
    #[serde(rename = "1day", default, deserialize_with = "flexible_opt_f64")]
    pub one_day: Option<f64>,
    #[serde(rename = "7day", default, deserialize_with = "flexible_opt_f64")]
    pub seven_day: Option<f64>,
    #[serde(rename = "30day", default, deserialize_with = "flexible_opt_f64")]
    pub thirty_day: Option<f64>,
}

impl ApiApyWindows {
    /// 7-day value, falling back to 30-day then 1-day.
    fn preferred(&self) -> Option<f64> {
        self.seven_day.or(self.thirty_day).or(self.one_day)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiApy {
    #[serde(default)]
    pub base: ApiApyWindows,
    #[serde(default)]
    pub rewards: Option<ApiApyWindows>,
    #[serde(default)]
    pub total: ApiApyWindows,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTvl {
    #[serde(default, deserialize_with = "flexible_f64")]
    pub tvl_usd: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiVault {
    pub name: String,
    pub address: String,
    pub network: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub tvl_detailed: ApiTvl,
    #[serde(default)]
    pub token: ApiToken,
    #[serde(default)]
    pub apy: ApiApy,
    #[serde(default)]
    pub number_of_holders: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPositionApy {
    #[serde(default, deserialize_with = "flexible_f64")]
    pub base: f64,
    #[serde(default, deserialize_with = "flexible_opt_f64")]
    pub rewards: Option<f64>,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub total: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPosition {
    pub vault_name: String,
    pub vault_address: String,
    #[serde(default)]
    pub network: String,
    #[serde(default)]
    pub asset: ApiToken,
    #[serde(default, deserialize_with = "flexible_text")]
    pub balance_native: String,
    #[serde(default, deserialize_with = "flexible_text")]
    pub balance_lp: String,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub balance_usd: f64,
    #[serde(default)]
    pub apy: Option<ApiPositionApy>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIdleAsset {
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub decimals: u8,
    #[serde(default)]
    pub network: String,
    #[serde(default, deserialize_with = "flexible_text")]
    pub balance_native: String,
    #[serde(default, deserialize_with = "flexible_f64")]
    pub balance_usd: f64,
}

// ── Normalized shapes ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSummary {
    pub address: String,
    pub name: String,
    pub symbol: String,
}

/// APY in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApySummary {
    pub base: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewards: Option<f64>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultSummary {
    pub name: String,
    pub address: String,
    pub network: String,
    pub protocol: String,
    pub tvl_in_usd: f64,
    pub token: TokenSummary,
    pub apy: ApySummary,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_holders: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultListing {
    pub total_results: usize,
    pub next_page: bool,
    pub results: Vec<VaultSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSummary {
    pub name: String,
    pub vault_address: String,
    pub network: String,
    pub asset: TokenSummary,
    pub underlying_token_balance: String,
    pub lp_token_balance: String,
    pub usd_value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apy: Option<ApySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdleAssetSummary {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub network: String,
    pub balance: String,
    pub usd_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Tvl,
    Apy,
}

fn bps_to_percent(bps: f64) -> f64 {
    bps / 100.0
}

pub fn opportunity_link(network: &str, address: &str) -> String {
    format!("{OPPORTUNITY_BASE_URL}/{network}/{address}")
}

/// Scale a base-unit integer string; non-integer input passes through.
pub fn rescale(raw: &str, decimals: u8) -> String {
    match U256::from_str_radix(raw.trim(), 10) {
        Ok(value) => from_base_units(value, decimals),
        Err(_) => raw.to_string(),
    }
}

impl From<ApiVault> for VaultSummary {
    fn from(vault: ApiVault) -> Self {
        let apy = ApySummary {
            base: bps_to_percent(vault.apy.base.preferred().unwrap_or(0.0)),
            rewards: vault
                .apy
                .rewards
                .as_ref()
                .and_then(ApiApyWindows::preferred)
                .map(bps_to_percent),
            total: bps_to_percent(vault.apy.total.preferred().unwrap_or(0.0)),
        };
        Self {
            link: opportunity_link(&vault.network, &vault.address),
            name: vault.name,
            address: vault.address,
            network: vault.network,
            protocol: vault.protocol,
            tvl_in_usd: vault.tvl_detailed.tvl_usd,
            token: TokenSummary {
                address: vault.token.asset_address,
                name: vault.token.name,
                symbol: vault.token.symbol,
            },
            apy,
            number_of_holders: None,
            description: None,
        }
    }
}

impl VaultSummary {
    /// Summary that keeps the holder count and description.
    pub fn detailed(vault: ApiVault) -> Self {
        let holders = vault.number_of_holders;
        let description = vault.description.clone().filter(|d| !d.trim().is_empty());
        Self {
            number_of_holders: holders,
            description,
            ..Self::from(vault)
        }
    }
}

impl From<ApiPosition> for PositionSummary {
    fn from(position: ApiPosition) -> Self {
        let decimals = position.asset.decimals.unwrap_or(18);
        Self {
            name: position.vault_name,
            vault_address: position.vault_address,
            network: position.network,
            underlying_token_balance: rescale(&position.balance_native, decimals),
            lp_token_balance: rescale(&position.balance_lp, decimals),
            usd_value: position.balance_usd,
            apy: position.apy.map(|apy| ApySummary {
                base: bps_to_percent(apy.base),
                rewards: apy.rewards.map(bps_to_percent),
                total: bps_to_percent(apy.total),
            }),
            asset: TokenSummary {
                address: position.asset.asset_address,
                name: position.asset.name,
                symbol: position.asset.symbol,
            },
        }
    }
}

impl From<ApiIdleAsset> for IdleAssetSummary {
    fn from(asset: ApiIdleAsset) -> Self {
        Self {
            balance: rescale(&asset.balance_native, asset.decimals),
            address: asset.address,
            name: asset.name,
            symbol: asset.symbol,
            network: asset.network,
            usd_value: asset.balance_usd,
        }
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Normalize, stable-sort and truncate a listing.
pub fn build_listing(vaults: Vec<ApiVault>, sort: SortKey, take: Option<usize>) -> VaultListing {
    let mut results: Vec<VaultSummary> = vaults.into_iter().map(VaultSummary::from).collect();
    match sort {
        SortKey::Name => results.sort_by(|a, b| a.name.cmp(&b.name)),
        SortKey::Tvl => results.sort_by(|a, b| descending(a.tvl_in_usd, b.tvl_in_usd)),
        SortKey::Apy => results.sort_by(|a, b| descending(a.apy.total, b.apy.total)),
    }

    let total_results = results.len();
    let next_page = match take {
        Some(k) if total_results > k => {
            results.truncate(k);
            true
        }
        _ => false,
    };

    VaultListing {
        total_results,
        next_page,
        results,
    }
}
