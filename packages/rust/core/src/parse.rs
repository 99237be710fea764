//! Defensive parsing of extraction output.
//!
//! Models wrap JSON in prose or code fences, drift on types, and use
//! sentinel strings for "no value". All of that is normalized here so the
//! steps only ever see [`CandidateUpdate`] with real `Option`s.

use serde_json::Value;
use tracing::{debug, warn};

/// One proposed field value as reported by the extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateUpdate {
    pub field: String,
    /// `None` when the model returned nothing usable or a sentinel.
    pub value: Option<String>,
    /// Clamped to `[0, 1]`; `None` when missing or unparseable.
    pub confidence: Option<f64>,
    pub source_url: Option<String>,
}

/// Parse a raw completion into candidate updates.
///
/// Never fails: anything that cannot be read yields an empty list, and
/// malformed entries are skipped individually.
pub fn parse_updates(text: &str) -> Vec<CandidateUpdate> {
    let Some(body) = json_object_slice(text) else {
        debug!("no JSON object in completion");
        return Vec::new();
    };

    let root: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "JSON parse error in completion");
            return Vec::new();
        }
    };

    let Some(entries) = root.get("updates").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries.iter().filter_map(parse_entry).collect()
}

/// Text between the first `{` and the last `}`, inclusive.
fn json_object_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_entry(entry: &Value) -> Option<CandidateUpdate> {
    let obj = entry.as_object()?;
    let field = obj.get("field")?.as_str()?.trim();
    if field.is_empty() {
        return None;
    }

    Some(CandidateUpdate {
        field: field.to_string(),
        value: obj.get("value").and_then(scalar_text).and_then(non_sentinel),
        confidence: obj.get("confidence").and_then(confidence_of),
        source_url: obj
            .get("source_url")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|u| !u.is_empty() && !u.eq_ignore_ascii_case("null"))
            .map(str::to_string),
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Drop values that only say "no value".
fn non_sentinel(value: String) -> Option<String> {
    let upper = value.to_uppercase();
    let sentinel = value.is_empty() || upper.contains("UNKNOWN") || upper == "NULL" || upper == "NONE";
    (!sentinel).then_some(value)
}

fn confidence_of(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    raw.is_finite().then(|| raw.clamp(0.0, 1.0))
}
