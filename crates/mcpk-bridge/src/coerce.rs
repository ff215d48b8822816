//! Argument coercion from caller values to the wire types a tool declares.
//!
//! Each value goes through a fixed pipeline and the first step that succeeds
//! wins:
//!
//! 1. A value that already has the target shape passes through.
//! 2. A string headed for a scalar target is parsed as that scalar
//!    (`"42"` to `42`, `"true"` to `true`).
//! 3. A string is decoded as JSON and the decoded value is coerced again
//!    (`"[1,2]"` to `[1, 2]`, `"4.0"` to `4` for an integer).
//! 4. Otherwise the [`CoercionFallback`] decides: send the original value or
//!    fail with [`ArgumentError::Uncoercible`].
//!
//! Non-string values headed for a string target are rendered as JSON text.

use mcpk_config::CoercionFallback;
use mcpk_types::{ArgumentError, TypeTag};
use serde_json::{Number, Value};

/// Coerce `value` for parameter `parameter` of type `target`.
///
/// Returns `Ok(None)` when an optional parameter was given `null`; the caller
/// decides whether that is sent as `null` or left out.
pub fn coerce_argument(
    parameter: &str,
    value: Value,
    target: &TypeTag,
    fallback: CoercionFallback,
) -> Result<Option<Value>, ArgumentError> {
    if value.is_null() && (target.is_optional() || accepts_null(target)) {
        return Ok(None);
    }
    if let Some(coerced) = coerce_value(&value, target) {
        return Ok(Some(coerced));
    }
    match fallback {
        CoercionFallback::PassThrough => {
            tracing::debug!("Passing '{parameter}' through uncoerced (expected {target})");
            Ok(Some(value))
        }
        CoercionFallback::Reject => Err(ArgumentError::Uncoercible {
            parameter: parameter.to_string(),
            expected: target.to_string(),
            value: value.to_string(),
        }),
    }
}

fn accepts_null(target: &TypeTag) -> bool {
    matches!(target, TypeTag::Dynamic | TypeTag::Map)
}

/// Run the coercion pipeline. `None` means no step applied.
pub fn coerce_value(value: &Value, target: &TypeTag) -> Option<Value> {
    match target {
        TypeTag::Optional(inner) => {
            if value.is_null() {
                Some(Value::Null)
            } else {
                coerce_value(value, inner)
            }
        }
        TypeTag::Dynamic => Some(value.clone()),
        TypeTag::String => to_string_value(value),
        TypeTag::Integer => match value {
            Value::Number(n) => integral(n),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .ok()
                .map(Value::from)
                .or_else(|| decode_then(s, target)),
            _ => None,
        },
        TypeTag::Number => match value {
            Value::Number(_) => Some(value.clone()),
            Value::String(s) => parse_number(s.trim()).or_else(|| decode_then(s, target)),
            _ => None,
        },
        TypeTag::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            Value::String(s) => parse_bool(s.trim()).or_else(|| decode_then(s, target)),
            _ => None,
        },
        TypeTag::Array(item) => match value {
            Value::Array(items) => items
                .iter()
                .map(|v| coerce_value(v, item))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            Value::String(s) => decode_then(s, target),
            _ => None,
        },
        TypeTag::Object(fields) => match value {
            Value::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (key, v) in map {
                    let coerced = match fields.get(key) {
                        Some(tag) => coerce_value(v, tag)?,
                        None => v.clone(),
                    };
                    out.insert(key.clone(), coerced);
                }
                Some(Value::Object(out))
            }
            Value::String(s) => decode_then(s, target),
            _ => None,
        },
        TypeTag::Map => match value {
            Value::Object(_) => Some(value.clone()),
            Value::String(s) => decode_then(s, target),
            _ => None,
        },
    }
}

fn to_string_value(value: &Value) -> Option<Value> {
    match value {
        Value::String(_) => Some(value.clone()),
        Value::Null => None,
        Value::Bool(b) => Some(Value::String(b.to_string())),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).ok().map(Value::String),
    }
}

fn integral(n: &Number) -> Option<Value> {
    if n.is_i64() || n.is_u64() {
        return Some(Value::Number(n.clone()));
    }
    let f = n.as_f64()?;
    // i64::MAX and u64::MAX round up to 2^63 and 2^64 as f64; both upper bounds are exclusive.
    if f.fract() != 0.0 || f < i64::MIN as f64 || f >= u64::MAX as f64 {
        None
    } else if f < i64::MAX as f64 {
        Some(Value::from(f as i64))
    } else {
        Some(Value::from(f as u64))
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    let f = s.parse::<f64>().ok()?;
    Number::from_f64(f).map(Value::Number)
}

fn parse_bool(s: &str) -> Option<Value> {
    if s.eq_ignore_ascii_case("true") {
        Some(Value::Bool(true))
    } else if s.eq_ignore_ascii_case("false") {
        Some(Value::Bool(false))
    } else {
        None
    }
}

/// Decode `s` as JSON and coerce the result, unless it decodes to a string.
fn decode_then(s: &str, target: &TypeTag) -> Option<Value> {
    match serde_json::from_str::<Value>(s).ok()? {
        Value::String(_) => None,
        decoded => coerce_value(&decoded, target),
    }
}
