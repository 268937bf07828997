// Market-cap comparison arithmetic
pub mod format;

pub use format::{format_compact_usd, format_multiplier, format_percent, format_usd};

use serde::{Deserialize, Serialize};

use crate::types::TokenData;

/// Result of valuing token A at a target market cap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub target_market_cap: f64,
    pub multiplier: f64,
    pub projected_price_per_token: f64,
    pub total_value: f64,
    pub is_upside: bool,
    pub percent_change: f64,
}

/// Display strings for a [`Valuation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub multiplier: String,
    pub projected_price: String,
    pub total_value: String,
    pub target_market_cap: String,
    pub percent_change: String,
}

impl Valuation {
    pub fn summary(&self) -> ValuationSummary {
        ValuationSummary {
            multiplier: format_multiplier(self.multiplier),
            projected_price: format_usd(self.projected_price_per_token),
            total_value: format_usd(self.total_value),
            target_market_cap: format_compact_usd(self.target_market_cap),
            percent_change: format_percent(self.percent_change),
        }
    }
}

/// Pure valuation functions. Every output is finite.
pub struct ValuationEngine;

impl ValuationEngine {
    /// Value `token_a` as if it had `token_b`'s market cap (or its ATH
    /// market cap when `use_all_time_high` is set).
    pub fn evaluate(token_a: &TokenData, token_b: &TokenData, use_all_time_high: bool, amount: f64) -> Valuation {
        Self::evaluate_with_target(token_a, token_b, use_all_time_high, amount, None)
    }

    /// Like [`ValuationEngine::evaluate`], but a finite positive
    /// `target_override` replaces the market cap taken from `token_b`.
    pub fn evaluate_with_target(
        token_a: &TokenData,
        token_b: &TokenData,
        use_all_time_high: bool,
        amount: f64,
        target_override: Option<f64>,
    ) -> Valuation {
        let target = Self::target_market_cap(token_b, use_all_time_high, target_override);
        Self::evaluate_target(token_a, target, amount)
    }

    /// Value `token_a` at an explicit market cap.
    pub fn evaluate_target(token_a: &TokenData, target_market_cap: f64, amount: f64) -> Valuation {
        let target = finite(target_market_cap);
        let multiplier = if token_a.market_cap > 0.0 && token_a.market_cap.is_finite() {
            finite(target / token_a.market_cap)
        } else {
            0.0
        };
        let projected_price_per_token = finite(finite(token_a.current_price) * multiplier);
        let total_value = finite(projected_price_per_token * finite(amount));

        Valuation {
            target_market_cap: target,
            multiplier,
            projected_price_per_token,
            total_value,
            is_upside: multiplier >= 1.0,
            percent_change: finite((multiplier - 1.0) * 100.0),
        }
    }

    pub fn target_market_cap(token_b: &TokenData, use_all_time_high: bool, target_override: Option<f64>) -> f64 {
        if let Some(target) = target_override.filter(|t| t.is_finite() && *t > 0.0) {
            return target;
        }

        let market_cap = finite(token_b.market_cap);
        if !use_all_time_high {
            return market_cap;
        }

        // ATH ratio is undefined without both prices; treat it as 1.
        let ratio = if token_b.current_price > 0.0 && token_b.ath > 0.0 {
            token_b.ath / token_b.current_price
        } else {
            1.0
        };
        finite(market_cap * ratio)
    }
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
