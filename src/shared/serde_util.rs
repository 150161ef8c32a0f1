//! Custom serde helpers for backend wire formats.

use serde_json::Value;

/// Read a lenient numeric field.
///
/// The backend serializes decimals as JSON numbers, but some endpoints
/// pass them through as strings. `null`, missing and unparseable values are
/// absent, never zero.
pub fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Date lists arrive as strings or bare integers (`20240301`).
pub mod date_list {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
        Ok(raw
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect())
    }
}
