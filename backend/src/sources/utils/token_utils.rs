use alloy::primitives::{Address, U256};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

/// Address, amount and numeric coercion helpers shared by every source.
pub struct TokenUtils;

impl TokenUtils {
    /// Parse a decimal string into an `f64`, treating anything unparseable or
    /// non-finite as 0.
    pub fn parse_decimal_or_zero(raw: &str) -> f64 {
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => value,
            _ => 0.0,
        }
    }

    pub fn finite_or_zero(value: f64) -> f64 {
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    /// Format a raw integer amount as a human-readable decimal string.
    pub fn format_units(amount: U256, decimals: u8) -> String {
        if decimals > 77 {
            return "0".to_string();
        }
        if decimals == 0 {
            return amount.to_string();
        }

        let divisor = U256::from(10).pow(U256::from(decimals));
        let whole = amount / divisor;
        let remainder = amount % divisor;

        if remainder.is_zero() {
            return whole.to_string();
        }

        let digits = remainder.to_string();
        let padded = format!("{}{}", "0".repeat(decimals as usize - digits.len()), digits);
        let trimmed = padded.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }

    /// Raw amount scaled down by `decimals`, as a float for pricing.
    pub fn units_to_f64(amount: U256, decimals: u8) -> f64 {
        Self::parse_decimal_or_zero(&Self::format_units(amount, decimals))
    }

    /// Parse a raw integer balance given either as decimal or `0x` hex.
    pub fn parse_raw_amount(raw: &str) -> Option<U256> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => U256::from_str_radix(hex, 16).ok(),
            None => U256::from_str_radix(raw, 10).ok(),
        }
    }

    /// `0x` followed by exactly 40 hex characters.
    pub fn is_valid_address(candidate: &str) -> bool {
        let candidate = candidate.trim();
        candidate.len() == 42
            && candidate.starts_with("0x")
            && candidate[2..].chars().all(|c| c.is_ascii_hexdigit())
    }

    pub fn normalize_address(address: &str) -> String {
        address.trim().to_lowercase()
    }

    pub fn parse_address(address: &str) -> Option<Address> {
        if !Self::is_valid_address(address) {
            return None;
        }
        Address::from_str(address.trim()).ok()
    }

    pub fn is_zero_address(address: &str) -> bool {
        Self::parse_address(address)
            .map(|a| a == Address::ZERO)
            .unwrap_or(false)
    }
}

/// Accepts a JSON number, a numeric string or null.
pub fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().map(TokenUtils::finite_or_zero),
        Some(Value::String(s)) if !s.trim().is_empty() => Some(TokenUtils::parse_decimal_or_zero(&s)),
        _ => None,
    })
}
