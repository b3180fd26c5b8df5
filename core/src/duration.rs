//! Duration literals such as `300ms`, `-1.5h` or `2h45m`.
//!
//! A duration is an optional sign followed by one or more decimal numbers, each with an
//! optional fraction and a mandatory unit. Valid units are `ns`, `us` (or `µs`), `ms`, `s`,
//! `m` and `h`. The literal `0` needs no unit.

use crate::error::CoercionErrorKind;

const NANOS_PER_UNIT: &[(&str, u64)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

const LIMIT: u64 = 1 << 63;

fn invalid(raw: &str, reason: &'static str) -> CoercionErrorKind {
    CoercionErrorKind::Duration {
        value: raw.to_string(),
        reason,
    }
}

/// Split the leading decimal digits off `s`.
fn leading_int(s: &str) -> Result<(u64, &str), ()> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let mut value: u64 = 0;
    for b in s[..end].bytes() {
        if value > (LIMIT - 1) / 10 {
            return Err(());
        }
        value = value * 10 + u64::from(b - b'0');
        if value > LIMIT {
            return Err(());
        }
    }
    Ok((value, &s[end..]))
}

/// Split the leading fraction digits off `s`, returning `(digits, scale, rest)`.
///
/// Digits beyond what fits in a `u64` are dropped; they are below nanosecond precision.
fn leading_fraction(s: &str) -> (u64, f64, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let mut value: u64 = 0;
    let mut scale = 1.0;
    let mut overflow = false;
    for b in s[..end].bytes() {
        if overflow {
            continue;
        }
        if value > (LIMIT - 1) / 10 {
            overflow = true;
            continue;
        }
        let next = value * 10 + u64::from(b - b'0');
        if next > LIMIT {
            overflow = true;
            continue;
        }
        value = next;
        scale *= 10.0;
    }
    (value, scale, &s[end..])
}

/// Parse a duration literal into signed nanoseconds.
///
/// # Errors
///
/// Returns [`CoercionErrorKind::Duration`] for grammar violations, unknown units and values
/// that overflow a signed 64-bit nanosecond count.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap
)]
pub fn parse_duration(raw: &str) -> Result<i64, CoercionErrorKind> {
    let mut s = raw;
    let mut negative = false;
    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }

    if s == "0" {
        return Ok(0);
    }
    if s.is_empty() {
        return Err(invalid(raw, "empty duration"));
    }

    let mut total: u64 = 0;
    while !s.is_empty() {
        if !s.starts_with(|c: char| c == '.' || c.is_ascii_digit()) {
            return Err(invalid(raw, "expected a number"));
        }

        let (mut value, rest) = leading_int(s).map_err(|()| invalid(raw, "value overflows"))?;
        let has_int = rest.len() != s.len();
        s = rest;

        let mut fraction = 0;
        let mut scale = 1.0;
        let mut has_fraction = false;
        if let Some(rest) = s.strip_prefix('.') {
            let (digits, digit_scale, rest_after) = leading_fraction(rest);
            has_fraction = rest_after.len() != rest.len();
            fraction = digits;
            scale = digit_scale;
            s = rest_after;
        }
        if !has_int && !has_fraction {
            return Err(invalid(raw, "expected digits"));
        }

        let unit_end = s
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(s.len());
        if unit_end == 0 {
            return Err(invalid(raw, "missing unit"));
        }
        let unit_name = &s[..unit_end];
        s = &s[unit_end..];
        let unit = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit_name)
            .map(|(_, nanos)| *nanos)
            .ok_or_else(|| invalid(raw, "unknown unit"))?;

        if value > LIMIT / unit {
            return Err(invalid(raw, "value overflows"));
        }
        value *= unit;
        if fraction > 0 {
            value += (fraction as f64 * (unit as f64 / scale)) as u64;
            if value > LIMIT {
                return Err(invalid(raw, "value overflows"));
            }
        }
        total = total
            .checked_add(value)
            .filter(|t| *t <= LIMIT)
            .ok_or_else(|| invalid(raw, "value overflows"))?;
    }

    if negative {
        return Ok((total as i64).wrapping_neg());
    }
    if total > LIMIT - 1 {
        return Err(invalid(raw, "value overflows"));
    }
    Ok(total as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: i64 = 1_000_000_000;

    #[test]
    fn test_simple_units() {
        assert_eq!(parse_duration("0"), Ok(0));
        assert_eq!(parse_duration("5s"), Ok(5 * SECOND));
        assert_eq!(parse_duration("300ms"), Ok(300_000_000));
        assert_eq!(parse_duration("10us"), Ok(10_000));
        assert_eq!(parse_duration("10µs"), Ok(10_000));
        assert_eq!(parse_duration("7ns"), Ok(7));
        assert_eq!(parse_duration("2m"), Ok(120 * SECOND));
    }

    #[test]
    fn test_compound_and_fractional() {
        assert_eq!(parse_duration("2h45m"), Ok((2 * 3600 + 45 * 60) * SECOND));
        assert_eq!(parse_duration("1.5h"), Ok(5400 * SECOND));
        assert_eq!(parse_duration(".5s"), Ok(SECOND / 2));
        assert_eq!(parse_duration("-1.5s"), Ok(-3 * SECOND / 2));
        assert_eq!(parse_duration("+3s"), Ok(3 * SECOND));
    }

    #[test]
    fn test_grammar_errors() {
        for raw in ["", "-", "s", "5", "1.5", "5x", "5 s", ".s", "1h-5m"] {
            assert!(
                matches!(parse_duration(raw), Err(CoercionErrorKind::Duration { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_overflow() {
        assert!(parse_duration("9223372036854775807ns").is_ok());
        assert!(parse_duration("9223372036854775808ns").is_err());
        assert_eq!(parse_duration("-9223372036854775808ns"), Ok(i64::MIN));
        assert!(parse_duration("3000000h").is_err());
    }
}
