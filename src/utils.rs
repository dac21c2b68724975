//! Small shared helpers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// "Operation in flight" marker shared by a workflow and its observers.
///
/// `try_begin` hands out a guard; the flag clears when the guard drops, so
/// every exit path (success, error, `?`, panic) resets it.
#[derive(Debug, Clone, Default)]
pub struct PendingFlag(Arc<AtomicBool>);

impl PendingFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Set the flag, or return `None` if it is already set.
    pub fn try_begin(&self) -> Option<PendingGuard> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| PendingGuard(Arc::clone(&self.0)))
    }
}

pub struct PendingGuard(Arc<AtomicBool>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Encode a float as a JSON number, writing integral values without a
/// fractional part (`72`, not `72.0`). Non-finite values have no JSON form.
pub fn json_number(value: f64) -> Option<Number> {
    if !value.is_finite() {
        return None;
    }
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        return Some(Number::from(value as i64));
    }
    Number::from_f64(value)
}

/// Coerce a loosely typed JSON value to a number.
///
/// Numbers pass through and numeric strings are parsed; anything else
/// (booleans, null, objects, blank or garbage strings) is not numeric.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_numeric(s),
        _ => None,
    }
}

/// Parse user-typed numeric text, ignoring surrounding whitespace.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Text form of a scalar: strings as-is, numbers and booleans printed.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Serde adapter: `41`, `41.5` or `"41"`; anything else reads as absent.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_number))
}

/// Serde adapter: scalars as text, `null` and containers as empty.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_text).unwrap_or_default())
}

/// Items of a JSON array that decode as `T`; the rest are skipped.
/// `None` when the value is not an array.
pub fn decodable_items<T: DeserializeOwned>(value: Option<Value>) -> Option<Vec<T>> {
    match value {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        ),
        _ => None,
    }
}

/// Render a number the way a user typed it: `41`, `41.5`.
pub fn format_number(value: f64) -> String {
    match json_number(value) {
        Some(n) => n.to_string(),
        None => value.to_string(),
    }
}
