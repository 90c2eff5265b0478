//! Type coercion engine.
//!
//! Casting is deliberately lenient: `"12abc"` casts to `12` and `"abc"` casts
//! to `0`, the way conventional string parsers behave. A separate judgement
//! step compares the raw text with the cast result and flags casts that
//! silently substituted a zero, false or nil value for unparsable input.
//! Only textual raw input is judged; any other raw value is taken as given.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;

use crate::kind::{Kind, ScalarKind};
use crate::registry::Descriptor;
use crate::value::Value;

// Literal patterns; `None` only if a pattern failed to compile.
static ZERO_TEXT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[-+]?0+(\.0+)?$").ok());

static INTEGER_PREFIX: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[-+]?\d+").ok());

static FLOAT_PREFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[-+]?(\d+(\.\d+)?|\.\d+)([eE][-+]?\d+)?").ok());

fn matched_prefix<'t>(pattern: &Option<Regex>, text: &'t str) -> Option<&'t str> {
    pattern
        .as_ref()
        .and_then(|re| re.find(text))
        .map(|found| found.as_str())
}

/// Boolean tokens accepted as genuine, compared case-insensitively.
pub const BOOLEAN_TOKENS: &[&str] = &["true", "false", "1", "0", "t", "f", "yes", "no"];

const FALSE_TOKENS: &[&str] = &["false", "0", "f", "no", "off"];

// ═══════════════════════════════════════════════════════════════════════════
// CASTING
// ═══════════════════════════════════════════════════════════════════════════

/// Cast a raw value for an attribute of the given kind.
///
/// Contract, one-of and computed kinds are not cast here; the raw value is
/// returned for the resolver to handle.
#[must_use]
pub fn cast(kind: &Kind, raw: &Value) -> Value {
    match kind {
        Kind::Scalar(scalar) => cast_scalar(*scalar, raw),
        Kind::Array(element) => match raw {
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| cast_scalar(*element, item)).collect())
            }
            other => other.clone(),
        },
        Kind::AnyMap => raw.clone().normalize_keys(),
        Kind::AnyArray | Kind::Contract(_) | Kind::OneOf(_) | Kind::Computed(_) => raw.clone(),
    }
}

/// Cast a single raw value to a scalar kind. Nil stays nil.
#[must_use]
pub fn cast_scalar(kind: ScalarKind, raw: &Value) -> Value {
    if raw.is_nil() {
        return Value::Nil;
    }
    match kind {
        ScalarKind::Any => raw.clone(),
        ScalarKind::Text => cast_text(raw),
        ScalarKind::Integer => cast_integer(raw),
        ScalarKind::Float => cast_float(raw),
        ScalarKind::Boolean => cast_boolean(raw),
        ScalarKind::Date => cast_date(raw),
        ScalarKind::DateTime => cast_datetime(raw),
        ScalarKind::Time => cast_time(raw),
    }
}

fn cast_text(raw: &Value) -> Value {
    match raw {
        Value::Array(_) | Value::Map(_) | Value::Contract(_) | Value::Text(_) => raw.clone(),
        other => Value::Text(other.to_string()),
    }
}

fn cast_integer(raw: &Value) -> Value {
    match raw {
        Value::Integer(n) => Value::Integer(*n),
        #[allow(clippy::cast_possible_truncation)]
        Value::Float(x) if x.is_finite() => Value::Integer(x.trunc() as i64),
        Value::Bool(b) => Value::Integer(i64::from(*b)),
        Value::Text(text) if text.trim().is_empty() => Value::Nil,
        Value::Text(text) => Value::Integer(parse_integer_prefix(text.trim_start())),
        _ => Value::Nil,
    }
}

fn parse_integer_prefix(text: &str) -> i64 {
    let Some(digits) = matched_prefix(&INTEGER_PREFIX, text) else {
        return 0;
    };
    digits.parse::<i64>().unwrap_or_else(|_| {
        if digits.starts_with('-') {
            i64::MIN
        } else {
            i64::MAX
        }
    })
}

fn cast_float(raw: &Value) -> Value {
    match raw {
        #[allow(clippy::cast_precision_loss)]
        Value::Integer(n) => Value::Float(*n as f64),
        Value::Float(x) => Value::Float(*x),
        Value::Bool(b) => Value::Float(if *b { 1.0 } else { 0.0 }),
        Value::Text(text) if text.trim().is_empty() => Value::Nil,
        Value::Text(text) => Value::Float(
            matched_prefix(&FLOAT_PREFIX, text.trim_start())
                .and_then(|digits| digits.parse::<f64>().ok())
                .unwrap_or(0.0),
        ),
        _ => Value::Nil,
    }
}

fn cast_boolean(raw: &Value) -> Value {
    match raw {
        Value::Bool(b) => Value::Bool(*b),
        Value::Integer(n) => Value::Bool(*n != 0),
        Value::Float(x) => Value::Bool(*x != 0.0),
        Value::Text(text) if text.trim().is_empty() => Value::Nil,
        Value::Text(text) => {
            let token = text.trim().to_lowercase();
            Value::Bool(!FALSE_TOKENS.contains(&token.as_str()))
        }
        _ => Value::Bool(true),
    }
}

fn cast_date(raw: &Value) -> Value {
    match raw {
        Value::Date(date) => Value::Date(*date),
        Value::DateTime(dt) => Value::Date(dt.date_naive()),
        Value::Text(text) => parse_date(text.trim()).map_or(Value::Nil, Value::Date),
        _ => Value::Nil,
    }
}

fn cast_datetime(raw: &Value) -> Value {
    match raw {
        Value::DateTime(dt) => Value::DateTime(*dt),
        Value::Date(date) => date
            .and_hms_opt(0, 0, 0)
            .map_or(Value::Nil, |naive| Value::DateTime(Utc.from_utc_datetime(&naive).fixed_offset())),
        Value::Integer(seconds) => DateTime::from_timestamp(*seconds, 0)
            .map_or(Value::Nil, |dt| Value::DateTime(dt.fixed_offset())),
        Value::Text(text) => parse_datetime(text.trim()).map_or(Value::Nil, Value::DateTime),
        _ => Value::Nil,
    }
}

fn cast_time(raw: &Value) -> Value {
    match raw {
        Value::Time(time) => Value::Time(*time),
        Value::DateTime(dt) => Value::Time(dt.time()),
        Value::Text(text) => parse_time(text.trim()).map_or(Value::Nil, Value::Time),
        _ => Value::Nil,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| parse_datetime(text).map(|dt| dt.date_naive()))
}

fn parse_datetime(text: &str) -> Option<DateTime<chrono::FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(dt);
    }
    [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ]
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    .or_else(|| {
        ["%Y-%m-%d", "%Y/%m/%d"]
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
    .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    ["%H:%M:%S%.f", "%H:%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
        .or_else(|| parse_datetime(text).map(|dt| dt.time()))
}

// ═══════════════════════════════════════════════════════════════════════════
// FALLBACK DETECTION
// ═══════════════════════════════════════════════════════════════════════════

/// Whether a cast produced real data or a silent fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Genuine,
    /// Carries the value-error message to report
    Fallback(&'static str),
}

impl Verdict {
    #[must_use]
    pub const fn is_genuine(self) -> bool {
        matches!(self, Self::Genuine)
    }
}

/// Judge one scalar cast against its raw input.
#[must_use]
pub fn judge_scalar(kind: ScalarKind, raw: &Value, cast: &Value) -> Verdict {
    let Value::Text(text) = raw else {
        return Verdict::Genuine;
    };
    match kind {
        ScalarKind::Integer | ScalarKind::Float => {
            if is_zero(cast) && matched_prefix(&ZERO_TEXT, text.trim()).is_none() {
                Verdict::Fallback(numeric_message(kind))
            } else {
                Verdict::Genuine
            }
        }
        ScalarKind::Boolean => {
            let token = text.trim().to_lowercase();
            if BOOLEAN_TOKENS.contains(&token.as_str()) {
                Verdict::Genuine
            } else {
                Verdict::Fallback("is not a valid boolean")
            }
        }
        ScalarKind::Date | ScalarKind::DateTime | ScalarKind::Time => {
            if cast.is_nil() && !text.trim().is_empty() {
                Verdict::Fallback(temporal_message(kind))
            } else {
                Verdict::Genuine
            }
        }
        ScalarKind::Text | ScalarKind::Any => Verdict::Genuine,
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Integer(n) => *n == 0,
        Value::Float(x) => *x == 0.0,
        _ => false,
    }
}

const fn numeric_message(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Integer => "is not a valid integer",
        _ => "is not a valid number",
    }
}

const fn temporal_message(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Date => "is not a valid date",
        ScalarKind::Time => "is not a valid time",
        _ => "is not a valid datetime",
    }
}

/// Value errors for one provided attribute, as `(key, message)` pairs.
///
/// Typed-array elements are judged independently and keyed `name[index]`.
#[must_use]
pub fn fallback_errors(descriptor: &Descriptor, raw: &Value, cast: &Value) -> Vec<(String, String)> {
    let name = descriptor.name();
    match descriptor.kind() {
        Kind::Scalar(scalar) => match judge_scalar(*scalar, raw, cast) {
            Verdict::Genuine => Vec::new(),
            Verdict::Fallback(message) => vec![(name.to_string(), message.to_string())],
        },
        Kind::Array(element) => match (raw, cast) {
            (Value::Array(raw_items), Value::Array(cast_items)) => raw_items
                .iter()
                .zip(cast_items.iter())
                .enumerate()
                .filter_map(|(index, (raw_item, cast_item))| {
                    match judge_scalar(*element, raw_item, cast_item) {
                        Verdict::Genuine => None,
                        Verdict::Fallback(message) => {
                            Some((format!("{name}[{index}]"), message.to_string()))
                        }
                    }
                })
                .collect(),
            (Value::Nil, _) => Vec::new(),
            _ => vec![(name.to_string(), "must be an array".to_string())],
        },
        Kind::Contract(_) | Kind::OneOf(_) => match cast {
            Value::Nil | Value::Map(_) | Value::Contract(_) => Vec::new(),
            _ => vec![(name.to_string(), "must be an object".to_string())],
        },
        Kind::AnyArray | Kind::AnyMap | Kind::Computed(_) => Vec::new(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// UNIT TESTS
// ═══════════════════════════════════════════════════════════════════════════
