//! Conversion of textual request values into typed fields.
//!
//! Path segments, query values and header values arrive as text. [`Coerce`] turns that text
//! into the field's declared type. A failed conversion never touches the destination: callers
//! go through [`coerce_into`], which assigns only after the conversion succeeded.
//!
//! Integers accept an optional sign, base prefixes (`0x`, `0o`, `0b`, or a bare leading `0`
//! for octal) and `_` digit separators after a prefix. Values are parsed at full width and
//! range-checked against the target. Booleans accept `1 t T TRUE true True` and
//! `0 f F FALSE false False`.

use crate::duration::parse_duration;
use crate::error::{CoercionError, CoercionErrorKind};
use crate::timestamp::parse_timestamp;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::time::SystemTime;

/// Parse a textual value into `Self`.
pub trait Coerce: Sized {
    /// Target name used in error messages.
    const TARGET: &'static str;

    /// Convert `raw` into a value.
    ///
    /// # Errors
    ///
    /// Returns a [`CoercionErrorKind`] describing why the text was rejected.
    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind>;
}

/// Coerce `raw` and store it in `slot`, attributing failures to `field`.
///
/// `slot` is left untouched when the conversion fails.
///
/// # Errors
///
/// Returns a [`CoercionError`] naming `field` when `raw` is not a valid `T`.
pub fn coerce_into<T: Coerce>(slot: &mut T, raw: &str, field: &str) -> Result<(), CoercionError> {
    let value = T::coerce(raw).map_err(|kind| CoercionError::new(field, kind))?;
    *slot = value;
    Ok(())
}

fn syntax(target: &'static str, raw: &str) -> CoercionErrorKind {
    CoercionErrorKind::Syntax {
        target,
        value: raw.to_string(),
    }
}

fn range(target: &'static str, raw: &str) -> CoercionErrorKind {
    CoercionErrorKind::Range {
        target,
        value: raw.to_string(),
    }
}

impl Coerce for String {
    const TARGET: &'static str = "string";

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        Ok(raw.to_string())
    }
}

impl Coerce for bool {
    const TARGET: &'static str = "bool";

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        match raw {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(syntax(Self::TARGET, raw)),
        }
    }
}

impl<T: Coerce> Coerce for Option<T> {
    const TARGET: &'static str = T::TARGET;

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        T::coerce(raw).map(Some)
    }
}

impl<T: Coerce> Coerce for Box<T> {
    const TARGET: &'static str = T::TARGET;

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        T::coerce(raw).map(Box::new)
    }
}

/// Why an integer literal was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteralError {
    Syntax,
    Overflow,
}

/// An integer literal split into sign and magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Literal {
    negative: bool,
    magnitude: u128,
}

fn parse_literal(raw: &str, allow_sign: bool) -> Result<Literal, LiteralError> {
    let (negative, unsigned) = match raw.as_bytes().first() {
        Some(b'-') if allow_sign => (true, &raw[1..]),
        Some(b'+') if allow_sign => (false, &raw[1..]),
        _ => (false, raw),
    };
    if unsigned.is_empty() {
        return Err(LiteralError::Syntax);
    }

    let lower = unsigned.to_ascii_lowercase();
    let (radix, digits, prefixed) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest.to_string(), true)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest.to_string(), true)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest.to_string(), true)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, lower[1..].to_string(), true)
    } else {
        (10, lower, false)
    };

    if digits.is_empty() || digits.ends_with('_') || digits.contains("__") {
        return Err(LiteralError::Syntax);
    }
    if !prefixed && digits.contains('_') {
        return Err(LiteralError::Syntax);
    }

    let mut magnitude: u128 = 0;
    for c in digits.chars().filter(|c| *c != '_') {
        let digit = c.to_digit(radix).ok_or(LiteralError::Syntax)?;
        magnitude = magnitude
            .checked_mul(u128::from(radix))
            .and_then(|m| m.checked_add(u128::from(digit)))
            .ok_or(LiteralError::Overflow)?;
    }
    Ok(Literal {
        negative,
        magnitude,
    })
}

macro_rules! coerce_signed {
    ($($ty:ty),*) => {
        $(impl Coerce for $ty {
            const TARGET: &'static str = stringify!($ty);

            fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
                let literal = parse_literal(raw, true).map_err(|e| match e {
                    LiteralError::Syntax => syntax(Self::TARGET, raw),
                    LiteralError::Overflow => range(Self::TARGET, raw),
                })?;
                let wide = if literal.negative {
                    0_i128.checked_sub_unsigned(literal.magnitude)
                } else {
                    i128::try_from(literal.magnitude).ok()
                };
                wide.and_then(|w| Self::try_from(w).ok())
                    .ok_or_else(|| range(Self::TARGET, raw))
            }
        })*
    };
}

macro_rules! coerce_unsigned {
    ($($ty:ty),*) => {
        $(impl Coerce for $ty {
            const TARGET: &'static str = stringify!($ty);

            fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
                let literal = parse_literal(raw, false).map_err(|e| match e {
                    LiteralError::Syntax => syntax(Self::TARGET, raw),
                    LiteralError::Overflow => range(Self::TARGET, raw),
                })?;
                Self::try_from(literal.magnitude).map_err(|_| range(Self::TARGET, raw))
            }
        })*
    };
}

coerce_signed!(i8, i16, i32, i64, i128, isize);
coerce_unsigned!(u8, u16, u32, u64, u128, usize);

fn names_infinity(raw: &str) -> bool {
    raw.to_ascii_lowercase().contains("inf")
}

impl Coerce for f64 {
    const TARGET: &'static str = "f64";

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        let value: Self = raw.parse().map_err(|_| syntax(Self::TARGET, raw))?;
        if value.is_infinite() && !names_infinity(raw) {
            return Err(range(Self::TARGET, raw));
        }
        Ok(value)
    }
}

impl Coerce for f32 {
    const TARGET: &'static str = "f32";

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        let value: Self = raw.parse().map_err(|_| syntax(Self::TARGET, raw))?;
        if value.is_infinite() && !names_infinity(raw) {
            return Err(range(Self::TARGET, raw));
        }
        Ok(value)
    }
}

impl Coerce for DateTime<FixedOffset> {
    const TARGET: &'static str = "timestamp";

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        parse_timestamp(raw)
    }
}

impl Coerce for DateTime<Utc> {
    const TARGET: &'static str = "timestamp";

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        parse_timestamp(raw).map(|ts| ts.with_timezone(&Utc))
    }
}

impl Coerce for NaiveDateTime {
    const TARGET: &'static str = "timestamp";

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        parse_timestamp(raw).map(|ts| ts.naive_local())
    }
}

impl Coerce for NaiveDate {
    const TARGET: &'static str = "date";

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        parse_timestamp(raw).map(|ts| ts.date_naive())
    }
}

impl Coerce for NaiveTime {
    const TARGET: &'static str = "time";

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        parse_timestamp(raw).map(|ts| ts.time())
    }
}

impl Coerce for SystemTime {
    const TARGET: &'static str = "timestamp";

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        parse_timestamp(raw).map(Self::from)
    }
}

impl Coerce for char {
    const TARGET: &'static str = "char";

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(syntax(Self::TARGET, raw)),
        }
    }
}

impl Coerce for chrono::Duration {
    const TARGET: &'static str = "duration";

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        parse_duration(raw).map(Self::nanoseconds)
    }
}

impl Coerce for std::time::Duration {
    const TARGET: &'static str = "duration";

    fn coerce(raw: &str) -> Result<Self, CoercionErrorKind> {
        let nanos = parse_duration(raw)?;
        u64::try_from(nanos)
            .map(Self::from_nanos)
            .map_err(|_| range(Self::TARGET, raw))
    }
}
