//! Conversion between human-readable token amounts and integer base units.
//!
//! All arithmetic is done on decimal digit strings and `U256`, never on
//! binary floating point, so `"0.1"` with 18 decimals is exactly
//! `100000000000000000`.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ActionError, Result};

/// The sentinel accepted in place of a number to mean "everything available".
pub const MAX_SENTINEL: &str = "max";

/// A user-supplied amount: either an exact decimal or `"max"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAmount", into = "String")]
pub enum AmountSpec {
    Max,
    Exact(String),
}

/// Agents send amounts both as JSON strings and JSON numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawAmount> for AmountSpec {
    fn from(raw: RawAmount) -> Self {
        match raw {
            RawAmount::Text(s) => AmountSpec::parse(&s),
            RawAmount::Number(n) => AmountSpec::Exact(n.to_string()),
        }
    }
}

impl From<AmountSpec> for String {
    fn from(spec: AmountSpec) -> Self {
        spec.to_string()
    }
}

impl AmountSpec {
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case(MAX_SENTINEL) {
            AmountSpec::Max
        } else {
            AmountSpec::Exact(trimmed.to_string())
        }
    }

    pub fn is_max(&self) -> bool {
        matches!(self, AmountSpec::Max)
    }
}

impl fmt::Display for AmountSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountSpec::Max => f.write_str(MAX_SENTINEL),
            AmountSpec::Exact(s) => f.write_str(s),
        }
    }
}

/// Convert a human-readable decimal amount into base units.
///
/// Accepts plain (`"1.5"`, `".5"`) and scientific (`"1e-5"`) notation.
/// Zero, negative, non-numeric input and amounts with more fractional digits
/// than `decimals` are rejected.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256> {
    let (whole, frac) = split_amount(amount)?;
    let places = usize::from(decimals);
    if frac.len() > places {
        return Err(ActionError::InvalidAmount(format!(
            "{amount} has more than {decimals} decimal places"
        )));
    }

    let mut digits = String::with_capacity(whole.len() + places);
    digits.push_str(whole.trim_start_matches('0'));
    digits.push_str(&frac);
    digits.extend(std::iter::repeat_n('0', places - frac.len()));

    U256::from_str_radix(digits.trim_start_matches('0'), 10)
        .map_err(|e| ActionError::InvalidAmount(format!("{amount} is out of range: {e}")))
}

/// Reject malformed, negative or zero amounts without knowing the token's
/// decimals, so callers can fail before any chain read.
pub fn check_amount(amount: &str) -> Result<()> {
    split_amount(amount).map(|_| ())
}

/// Whole and fractional digits of a positive amount, trailing fractional
/// zeros removed.
fn split_amount(amount: &str) -> Result<(String, String)> {
    let s = amount.trim();
    if s.is_empty() {
        return Err(ActionError::InvalidAmount("amount is empty".into()));
    }
    if s.starts_with('-') {
        return Err(ActionError::InvalidAmount(format!(
            "{amount} is negative; amounts must be positive"
        )));
    }

    if s.contains(['e', 'E']) {
        let d = Decimal::from_scientific(&s.to_ascii_lowercase())
            .map_err(|e| ActionError::InvalidAmount(format!("{amount} is not a number: {e}")))?;
        return split_amount(&d.normalize().to_string());
    }

    let s = s.strip_prefix('+').unwrap_or(s);
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));

    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
        return Err(ActionError::InvalidAmount(format!("{amount} is not a number")));
    }

    let frac = frac.trim_end_matches('0');
    if whole.trim_start_matches('0').is_empty() && frac.is_empty() {
        return Err(ActionError::InvalidAmount(
            "amount must be greater than zero".into(),
        ));
    }
    Ok((whole.to_string(), frac.to_string()))
}

/// Render base units as a human-readable decimal string without trailing zeros.
pub fn from_base_units(value: U256, decimals: u8) -> String {
    if value.is_zero() {
        return "0".into();
    }
    let raw = value.to_string();
    let places = usize::from(decimals);

    let (whole, frac) = if raw.len() > places {
        let (w, f) = raw.split_at(raw.len() - places);
        (w.to_string(), f.to_string())
    } else {
        ("0".to_string(), format!("{raw:0>places$}"))
    };

    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole
    } else {
        format!("{whole}.{frac}")
    }
}

/// Scale base units into a `Decimal` for display math. Returns `None` when the
/// value does not fit `Decimal`'s 96-bit mantissa.
pub fn to_decimal(value: U256, decimals: u8) -> Option<Decimal> {
    Decimal::from_str(&from_base_units(value, decimals)).ok()
}
