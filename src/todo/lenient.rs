//! Field-level coercions for stored records.
//!
//! Each helper reads whatever JSON is present and maps it onto the field's
//! type instead of failing the whole record. Values that cannot be mapped
//! are logged and replaced with the field's empty value.

use log::warn;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Strings as-is, numbers and booleans in their display form, null as "".
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => {
            warn!("unreadable text field {}, using empty string", other);
            String::new()
        }
    })
}

/// Booleans, `"true"`/`"false"` and numbers (non-zero is true).
pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => match s.trim() {
            "true" | "1" => true,
            "false" | "0" | "" => false,
            other => {
                warn!("unreadable flag {:?}, using false", other);
                false
            }
        },
        other => {
            warn!("unreadable flag {}, using false", other);
            false
        }
    })
}

/// Non-negative integer position; floats are truncated, negatives clamp to 0.
pub fn position<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match number(&raw) {
        Some(n) if n.is_finite() && n > 0.0 => n as usize,
        Some(_) => 0,
        None => {
            if !raw.is_null() {
                warn!("unreadable order {}, using 0", raw);
            }
            0
        }
    })
}

/// Numbers or numeric strings; anything else reads as absent.
pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let parsed = number(&raw).filter(|n| n.is_finite());
    if parsed.is_none() && !raw.is_null() {
        warn!("unreadable number {}, dropping it", raw);
    }
    Ok(parsed)
}

fn number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
