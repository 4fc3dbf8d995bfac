use thiserror::Error;

/// Amounts are integer cents so aggregation over many transactions stays exact.
/// `12.50` is stored as `1250`.
pub type Cents = i64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseAmountError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount: {0}")]
    Invalid(String),
}

/// Render cents with two decimals, e.g. `-1234` -> `"-12.34"`.
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a user supplied amount such as `"50"`, `"12.5"` or `"-3.99"` into cents.
/// Digits past the second decimal are dropped.
pub fn parse_cents(input: &str) -> Result<Cents, ParseAmountError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let invalid = || ParseAmountError::Invalid(input.to_string());

    let (units_str, fraction_str) = digits.split_once('.').unwrap_or((digits, ""));
    if units_str.is_empty() && fraction_str.is_empty() {
        return Err(invalid());
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !fraction_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| invalid())?
    };

    let mut fraction: String = fraction_str.chars().take(2).collect();
    while fraction.len() < 2 {
        fraction.push('0');
    }
    let fraction: i64 = fraction.parse().map_err(|_| invalid())?;

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or_else(invalid)?;
    Ok(if negative { -cents } else { cents })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(13000), "130.00");
        assert_eq!(format_cents(1205), "12.05");
        assert_eq!(format_cents(7), "0.07");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-2050), "-20.50");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("100"), Ok(10000));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents("0.99"), Ok(99));
        assert_eq!(parse_cents(".5"), Ok(50));
        assert_eq!(parse_cents("7."), Ok(700));
        assert_eq!(parse_cents("-30.25"), Ok(-3025));
        assert_eq!(parse_cents("1.999"), Ok(199));
    }

    #[test]
    fn test_parse_cents_rejects_garbage() {
        assert_eq!(parse_cents("  "), Err(ParseAmountError::Empty));
        assert!(parse_cents("ten").is_err());
        assert!(parse_cents("1.2.3").is_err());
        assert!(parse_cents(".").is_err());
        assert!(parse_cents("1e3").is_err());
    }
}
