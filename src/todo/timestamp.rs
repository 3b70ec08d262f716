//! Serde glue for record timestamps.
//!
//! Timestamps are written as RFC 3339 strings. Reading is lenient because the
//! two storage tiers (and older exports) do not agree on a representation:
//! RFC 3339, RFC 2822, naive `YYYY-MM-DD HH:MM:SS` and epoch milliseconds
//! (as a number or a numeric string) are all accepted. Anything else is
//! logged and replaced with the current instant so a record never fails to
//! load over a bad date.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(coerce_timestamp(&raw))
}

pub fn coerce_timestamp(raw: &Value) -> DateTime<Utc> {
    match parse_timestamp(raw) {
        Some(date) => date,
        None => {
            warn!("unparseable timestamp {}, using current time", raw);
            Utc::now()
        }
    }
}

pub fn parse_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(s) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(s) {
        return Some(date.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS.iter() {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    s.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}
