//! Display formatting for valuation output.
//!
//! Small values get extra precision so they never collapse to `0.00x` or
//! `$0.00`.

/// `10.00x`; below 0.01 three significant digits are kept (`0.00123x`).
pub fn format_multiplier(multiplier: f64) -> String {
    if !multiplier.is_finite() || multiplier == 0.0 {
        return "0.00x".to_string();
    }
    if multiplier.abs() < 0.01 {
        let decimals = significant_decimals(multiplier, 3);
        return format!("{:.*}x", decimals, multiplier);
    }
    format!("{:.2}x", multiplier)
}

/// US dollar amount with thousands separators. Values below $1 show up to 6
/// fraction digits, or up to 10 below $0.0001.
pub fn format_usd(value: f64) -> String {
    if !value.is_finite() {
        return "$0.00".to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();

    let body = if abs >= 1.0 || abs == 0.0 {
        with_separators(&format!("{:.2}", abs))
    } else {
        let max_digits = if abs < 0.0001 { 10 } else { 6 };
        let raw = format!("{:.*}", max_digits, abs);
        trim_fraction(&raw, 2)
    };
    format!("{}${}", sign, body)
}

const COMPACT_UNITS: [(f64, &str); 4] = [(1e3, "K"), (1e6, "M"), (1e9, "B"), (1e12, "T")];

/// Compact market cap: `$1.8T`, `$310B`, `$85.5M`, `$12K`.
pub fn format_compact_usd(value: f64) -> String {
    if !value.is_finite() {
        return "$0".to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();

    let mut unit = match COMPACT_UNITS.iter().rposition(|(size, _)| abs >= *size) {
        Some(unit) => unit,
        None => return format_usd(value),
    };
    // Rounding can carry into the next unit: 999_999 is $1M, not $1000K
    if unit + 1 < COMPACT_UNITS.len() && ((abs / COMPACT_UNITS[unit].0) * 100.0).round() >= 100_000.0 {
        unit += 1;
    }
    let (size, suffix) = COMPACT_UNITS[unit];
    format!("{}${}{}", sign, trim_fraction(&format!("{:.2}", abs / size), 0), suffix)
}

/// Whole-number percentage with an explicit sign.
pub fn format_percent(percent: f64) -> String {
    if !percent.is_finite() {
        return "0%".to_string();
    }
    let rounded = percent.round();
    if rounded > 0.0 {
        format!("+{:.0}%", rounded)
    } else if rounded == 0.0 {
        "0%".to_string()
    } else {
        format!("{:.0}%", rounded)
    }
}

fn significant_decimals(value: f64, significant: i32) -> usize {
    let magnitude = value.abs().log10().floor() as i32;
    (significant - 1 - magnitude).clamp(2, 12) as usize
}

/// Drop trailing zeros from the fraction, keeping at least `min_digits`.
fn trim_fraction(raw: &str, min_digits: usize) -> String {
    let Some((whole, fraction)) = raw.split_once('.') else {
        return raw.to_string();
    };
    let trimmed = fraction.trim_end_matches('0');
    let kept = if trimmed.len() < min_digits {
        &fraction[..min_digits.min(fraction.len())]
    } else {
        trimmed
    };
    if kept.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, kept)
    }
}

fn with_separators(raw: &str) -> String {
    let (whole, fraction) = raw.split_once('.').unwrap_or((raw, ""));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if fraction.is_empty() {
        grouped
    } else {
        format!("{}.{}", grouped, fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipliers() {
        assert_eq!(format_multiplier(10.0), "10.00x");
        assert_eq!(format_multiplier(0.5), "0.50x");
        assert_eq!(format_multiplier(0.00123), "0.00123x");
        assert_eq!(format_multiplier(0.0), "0.00x");
        assert_eq!(format_multiplier(f64::NAN), "0.00x");
    }

    #[test]
    fn currency() {
        assert_eq!(format_usd(100.0), "$100.00");
        assert_eq!(format_usd(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_usd(0.5), "$0.50");
        assert_eq!(format_usd(0.000123), "$0.000123");
        assert_eq!(format_usd(0.00001234), "$0.00001234");
        assert_eq!(format_usd(-2.5), "-$2.50");
        assert_eq!(format_usd(0.0), "$0.00");
    }

    #[test]
    fn compact() {
        assert_eq!(format_compact_usd(1.8e12), "$1.8T");
        assert_eq!(format_compact_usd(3.1e11), "$310B");
        assert_eq!(format_compact_usd(85_500_000.0), "$85.5M");
        assert_eq!(format_compact_usd(12_000.0), "$12K");
        assert_eq!(format_compact_usd(999.0), "$999.00");
        assert_eq!(format_compact_usd(999_999.0), "$1M");
        assert_eq!(format_compact_usd(999_994.0), "$999.99K");
        assert_eq!(format_compact_usd(999_999_999_999_999.0), "$1000T");
    }

    #[test]
    fn percents() {
        assert_eq!(format_percent(900.0), "+900%");
        assert_eq!(format_percent(-50.4), "-50%");
        assert_eq!(format_percent(0.2), "0%");
    }
}
