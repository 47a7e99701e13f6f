use alloy_primitives::U256;

/// `10^decimals`, or `None` when it does not fit in 256 bits.
pub fn scale(decimals: u8) -> Option<U256> {
    U256::from(10u8).checked_pow(U256::from(decimals))
}

/// Integer part of `raw / 10^decimals`.
pub fn whole_units(raw: U256, decimals: u8) -> U256 {
    match scale(decimals) {
        Some(divisor) => raw / divisor,
        None => U256::ZERO,
    }
}

/// Exact human-scale rendering of `raw` with trailing fractional zeros trimmed.
pub fn format_units(raw: U256, decimals: u8) -> String {
    let Some(divisor) = scale(decimals) else {
        return "0".to_string();
    };
    let whole = raw / divisor;
    let frac = raw % divisor;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Lossy float view of a raw amount, for percentages only.
pub fn to_f64(raw: U256) -> f64 {
    raw.to_string().parse().unwrap_or(0.0)
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Ratio as a percentage, `None` when the denominator is zero or the result is not finite.
pub fn percentage(part: f64, whole: f64) -> Option<f64> {
    if whole <= 0.0 {
        return None;
    }
    let pct = part / whole * 100.0;
    pct.is_finite().then_some(pct)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(s: &str) -> U256 {
        U256::from_str_radix(s, 10).unwrap()
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(u("1500000000000000000"), 18), "1.5");
        assert_eq!(format_units(u("1000000000000000000000"), 18), "1000");
        assert_eq!(format_units(u("1"), 18), "0.000000000000000001");
        assert_eq!(format_units(u("123456"), 0), "123456");
        assert_eq!(format_units(U256::ZERO, 8), "0");
    }

    #[test]
    fn test_whole_units_truncates() {
        assert_eq!(whole_units(u("1999999999999999999"), 18), U256::from(1u8));
        assert_eq!(whole_units(u("5"), 1), U256::ZERO);
    }

    #[test]
    fn test_large_supply_keeps_precision() {
        // 10^30 tokens at 18 decimals overflows u128 once scaled.
        let raw = u("1000000000000000000000000000000000000000000000000");
        assert_eq!(format_units(raw, 18), "1000000000000000000000000000000");
    }

    #[test]
    fn test_oversized_decimals() {
        assert!(scale(77).is_some());
        assert!(scale(78).is_none());
        assert_eq!(whole_units(U256::MAX, 200), U256::ZERO);
    }

    #[test]
    fn test_percentage_guards_zero() {
        assert_eq!(percentage(5.0, 0.0), None);
        assert_eq!(percentage(25.0, 100.0), Some(25.0));
        assert_eq!(round2(33.3333), 33.33);
    }
}
