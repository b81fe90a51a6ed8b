//! Lenient numeric coercion for provider payloads.
//!
//! Price tables sometimes carry `null`, empty strings, `"NaN"` or stray text in
//! numeric columns. Everything that is not a finite number becomes `None`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Coerce a JSON value to a finite `f64`.
pub fn to_finite(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// `deserialize_with` helper for optional numeric columns.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(to_finite(&value))
}
