//! Exact conversion between human-readable token amounts and the chain's
//! minimal (24-decimal) unit. All arithmetic is integer string math;
//! floating point would lose precision long before 10^24.

/// Decimal places of the chain's native token.
pub const NATIVE_DECIMALS: usize = 24;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount {0:?}")]
    Invalid(String),
    #[error("amount {0:?} has more than 24 decimal places")]
    TooPrecise(String),
    #[error("amount {0:?} overflows the native token range")]
    Overflow(String),
}

/// Parse a human-readable decimal amount (e.g. `"0.1"`) into minimal
/// units. `"0.1"` yields exactly `100000000000000000000000`.
pub fn parse_native_amount(amount: &str) -> Result<u128, AmountError> {
    let trimmed = amount.trim();
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(AmountError::Invalid(amount.to_string()));
    }
    let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(AmountError::Invalid(amount.to_string()));
    }
    if fraction.len() > NATIVE_DECIMALS {
        return Err(AmountError::TooPrecise(amount.to_string()));
    }

    let digits = whole
        .chars()
        .chain(fraction.chars())
        .chain(std::iter::repeat('0').take(NATIVE_DECIMALS - fraction.len()));

    let mut value: u128 = 0;
    for digit in digits {
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u128::from(digit as u8 - b'0')))
            .ok_or_else(|| AmountError::Overflow(amount.to_string()))?;
    }
    Ok(value)
}

/// Render a minimal-unit amount as a human-readable decimal string,
/// trimming trailing fractional zeros.
pub fn format_native_amount(amount: u128) -> String {
    let digits = format!("{amount:0>width$}", width = NATIVE_DECIMALS + 1);
    let (whole, fraction) = digits.split_at(digits.len() - NATIVE_DECIMALS);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenth_of_a_token_is_exact() {
        assert_eq!(
            parse_native_amount("0.1"),
            Ok(100_000_000_000_000_000_000_000)
        );
    }

    #[test]
    fn whole_amounts() {
        assert_eq!(parse_native_amount("0"), Ok(0));
        assert_eq!(
            parse_native_amount("1"),
            Ok(1_000_000_000_000_000_000_000_000)
        );
        assert_eq!(
            parse_native_amount("25"),
            Ok(25_000_000_000_000_000_000_000_000)
        );
    }

    #[test]
    fn bare_fraction_and_trailing_dot() {
        assert_eq!(
            parse_native_amount(".5"),
            Ok(500_000_000_000_000_000_000_000)
        );
        assert_eq!(
            parse_native_amount("2."),
            Ok(2_000_000_000_000_000_000_000_000)
        );
    }

    #[test]
    fn full_precision_is_accepted() {
        assert_eq!(
            parse_native_amount("0.000000000000000000000001"),
            Ok(1)
        );
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["", ".", "abc", "1,5", "1.2.3", "-1", "1e3"] {
            assert!(matches!(
                parse_native_amount(input),
                Err(AmountError::Invalid(_))
            ));
        }
    }

    #[test]
    fn rejects_excess_precision() {
        assert_eq!(
            parse_native_amount("0.0000000000000000000000001"),
            Err(AmountError::TooPrecise(
                "0.0000000000000000000000001".to_string()
            ))
        );
    }

    #[test]
    fn rejects_overflow() {
        // u128::MAX has 39 digits; 40 whole digits cannot fit once scaled.
        let input = "1".repeat(40);
        assert_eq!(
            parse_native_amount(&input),
            Err(AmountError::Overflow(input.clone()))
        );
    }

    #[test]
    fn formats_back_to_human_units() {
        assert_eq!(format_native_amount(0), "0");
        assert_eq!(format_native_amount(100_000_000_000_000_000_000_000), "0.1");
        assert_eq!(
            format_native_amount(25_000_000_000_000_000_000_000_000),
            "25"
        );
        assert_eq!(format_native_amount(1), "0.000000000000000000000001");
    }

    #[test]
    fn parse_format_round_trip() {
        for input in ["0.1", "25", "0.000000000000000000000001", "3.5"] {
            let value = parse_native_amount(input).unwrap();
            assert_eq!(parse_native_amount(&format_native_amount(value)), Ok(value));
        }
    }
}
