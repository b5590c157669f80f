//! Issue records and count normalization.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Result, SentrexError};

use super::opaque_text;

/// Occurrence count as Sentry sent it.
///
/// Sentry encodes `count` as a numeric string on most endpoints and as a
/// number on some; the original encoding is kept so a cached snapshot
/// re-projects exactly like a freshly fetched one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssueCount {
    Number(f64),
    Text(String),
    Other(Value),
}

impl Default for IssueCount {
    fn default() -> Self {
        IssueCount::Other(Value::Null)
    }
}

impl IssueCount {
    /// Normalize to a 64-bit count. Fractions truncate, negatives clamp to 0.
    pub fn normalize(&self) -> Result<u64> {
        match self {
            IssueCount::Number(v) => float_to_count(*v),
            IssueCount::Text(s) => {
                let v: f64 = s
                    .trim()
                    .parse()
                    .map_err(|e| SentrexError::Shape(format!("count {s:?} is not numeric: {e}")))?;
                float_to_count(v)
            }
            IssueCount::Other(v) => Err(SentrexError::Shape(format!(
                "count has unsupported type: {}",
                value_type(v)
            ))),
        }
    }
}

impl From<u64> for IssueCount {
    fn from(v: u64) -> Self {
        IssueCount::Number(v as f64)
    }
}

impl From<&str> for IssueCount {
    fn from(v: &str) -> Self {
        IssueCount::Text(v.to_string())
    }
}

fn float_to_count(v: f64) -> Result<u64> {
    if !v.is_finite() {
        return Err(SentrexError::Shape(format!("count is not finite: {v}")));
    }
    Ok(v.max(0.0) as u64)
}

/// Normalize an arbitrary JSON value that is expected to carry a count.
pub fn normalize_count_value(v: &Value) -> Result<u64> {
    match v {
        Value::Number(n) => match n.as_f64() {
            Some(f) => float_to_count(f),
            None => Err(SentrexError::Shape(format!("count {n} is out of range"))),
        },
        Value::String(s) => IssueCount::Text(s.clone()).normalize(),
        other => IssueCount::Other(other.clone()).normalize(),
    }
}

fn value_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One Sentry issue as listed for a (project, environment, window) branch.
///
/// Label fields are opaque text: whatever Sentry sent is kept and re-emitted
/// verbatim, `null` becomes the empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(deserialize_with = "opaque_text")]
    pub id: String,
    #[serde(default, deserialize_with = "opaque_text")]
    pub logger: String,
    #[serde(default, deserialize_with = "opaque_text")]
    pub level: String,
    #[serde(default, deserialize_with = "opaque_text")]
    pub status: String,
    #[serde(default, deserialize_with = "opaque_text")]
    pub platform: String,
    #[serde(default)]
    pub count: IssueCount,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_unhandled: Option<bool>,
    #[serde(default, deserialize_with = "opaque_text")]
    pub first_seen: String,
    #[serde(default, deserialize_with = "opaque_text")]
    pub last_seen: String,
}

impl Issue {
    /// Unhandled flag as label text (`true`/`false`, empty when unknown).
    pub fn unhandled_label(&self) -> &'static str {
        match self.is_unhandled {
            Some(true) => "true",
            Some(false) => "false",
            None => "",
        }
    }
}

fn lenient_flag<'de, D>(d: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}
