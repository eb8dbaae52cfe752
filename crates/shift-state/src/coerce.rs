//! Scalar type coercions
//!
//! Legacy schemas stored many numeric, boolean and duration fields as
//! strings. Each coercion converts in place, leaves values that already have
//! the target type alone, and reports invalid input instead of guessing.

use serde_json::{Number, Value};
use shift_core::MigrationContext;

use crate::error::PathError;
use crate::normalize::get_at_mut;
use crate::path::StatePath;

/// Outcome of a coercion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coerced {
    Converted,
    /// Value already has the target type
    Unchanged,
    /// Nothing (or `null`) at the path
    Absent,
    /// Value is not valid for its source representation and was kept
    Invalid(String),
}

impl Coerced {
    #[inline]
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    /// Record a warning for an invalid value
    pub fn report(&self, ctx: &mut MigrationContext, address: &str, field: &str) {
        if let Self::Invalid(raw) = self {
            ctx.warn_at(
                address,
                "value not converted",
                format!("`{field}` kept as {raw}: not a valid value for conversion"),
            );
        }
    }
}

/// Unit of a numeric duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Nanoseconds,
    /// Whole seconds, truncated
    Seconds,
}

/// `"42"` becomes `42`, `"1.5"` becomes `1.5`
///
/// # Errors
/// Returns [`PathError`] if `path` is malformed.
pub fn to_number(root: &mut Value, path: &str) -> Result<Coerced, PathError> {
    coerce_at(root, path, Value::is_number, parse_number)
}

/// `"true"`/`"enabled"` become `true`, `"false"`/`"disabled"` become `false`
///
/// # Errors
/// Returns [`PathError`] if `path` is malformed.
pub fn to_bool(root: &mut Value, path: &str) -> Result<Coerced, PathError> {
    coerce_at(root, path, Value::is_boolean, parse_bool)
}

/// `"1h30m"` becomes a number of `unit`
///
/// # Errors
/// Returns [`PathError`] if `path` is malformed.
pub fn to_duration(root: &mut Value, path: &str, unit: DurationUnit) -> Result<Coerced, PathError> {
    coerce_at(root, path, Value::is_number, |text| {
        let nanos = parse_duration(text)?;
        let amount = match unit {
            DurationUnit::Nanoseconds => nanos,
            DurationUnit::Seconds => nanos / 1_000_000_000,
        };
        Some(Value::from(amount))
    })
}

fn coerce_at(
    root: &mut Value,
    path: &str,
    is_target: impl Fn(&Value) -> bool,
    convert: impl FnOnce(&str) -> Option<Value>,
) -> Result<Coerced, PathError> {
    let path: StatePath = path.parse()?;
    let Some(value) = get_at_mut(root, &path) else {
        return Ok(Coerced::Absent);
    };
    if value.is_null() {
        return Ok(Coerced::Absent);
    }
    if is_target(value) {
        return Ok(Coerced::Unchanged);
    }

    let converted = match &*value {
        Value::String(text) => convert(text.trim()).ok_or_else(|| format!("{text:?}")),
        other => Err(other.to_string()),
    };
    match converted {
        Ok(new) => {
            *value = new;
            Ok(Coerced::Converted)
        }
        Err(raw) => Ok(Coerced::Invalid(raw)),
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::from(n));
    }
    let f = text.parse::<f64>().ok()?;
    Number::from_f64(f).map(Value::Number)
}

fn parse_bool(text: &str) -> Option<Value> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "enabled" => Some(Value::Bool(true)),
        "false" | "disabled" => Some(Value::Bool(false)),
        _ => None,
    }
}

/// Parse a duration such as `"300ms"`, `"1h30m"` or `"1.5s"` into nanoseconds
///
/// Units: `ns`, `us` (`µs`), `ms`, `s`, `m`, `h`. A bare `"0"` is accepted.
#[must_use]
pub fn parse_duration(text: &str) -> Option<i64> {
    let (negative, mut rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if rest == "0" {
        return Some(0);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: i128 = 0;
    while !rest.is_empty() {
        let whole_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let whole = &rest[..whole_len];
        rest = &rest[whole_len..];

        let mut fraction = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let len = after_dot
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_dot.len());
            fraction = &after_dot[..len];
            rest = &after_dot[len..];
        }
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale: i128 = match &rest[..unit_len] {
            "ns" => 1,
            "us" | "\u{b5}s" | "\u{3bc}s" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60_000_000_000,
            "h" => 3_600_000_000_000,
            _ => return None,
        };
        rest = &rest[unit_len..];

        let whole: i128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        total = total.checked_add(whole.checked_mul(scale)?)?;
        if !fraction.is_empty() {
            // digits beyond nanosecond precision cannot contribute
            let digits = &fraction[..fraction.len().min(18)];
            let numerator: i128 = digits.parse().ok()?;
            let denominator = 10_i128.checked_pow(u32::try_from(digits.len()).ok()?)?;
            total = total.checked_add(numerator.checked_mul(scale)? / denominator)?;
        }
    }

    let total = if negative { -total } else { total };
    i64::try_from(total).ok()
}
