//! Pure envelope validation.
//!
//! A single ordered pass over required keys, protocol version, payload
//! shape, and non-empty string fields, reworked into a typed, panic-free
//! Rust function so the hub and every peer client validate against
//! identical rules.

use serde_json::{Map, Value};

use crate::envelope::Envelope;
use crate::error::HubError;
use crate::topics::PROTOCOL_VERSION;

const REQUIRED_KEYS: &[&str] = &[
    "v", "id", "ts", "from", "to", "topic", "reply_to", "trace_id", "payload",
];

const STRING_FIELDS: &[&str] = &["id", "trace_id", "from", "to", "topic", "ts"];

/// Validate a decoded JSON value against the envelope contract.
///
/// Checks, in order: presence of all required keys; `v == 1`; `payload` is
/// an object; each required string field is non-empty once trimmed;
/// `reply_to` is null or a string. Never panics — any input that isn't a
/// valid envelope yields one of the [`HubError`] variants.
pub fn validate_envelope(value: &Value) -> Result<Envelope, HubError> {
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => {
            let missing = REQUIRED_KEYS.to_vec();
            return Err(missing_keys_error(&missing));
        }
    };

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .filter(|key| !obj.contains_key(**key))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(missing_keys_error(&missing));
    }

    let version = &obj["v"];
    if version.as_i64() != Some(PROTOCOL_VERSION) {
        return Err(HubError::UnsupportedVersion(describe_value(version)));
    }

    let payload = match obj["payload"].as_object() {
        Some(map) => map.clone(),
        None => return Err(HubError::InvalidPayload),
    };

    let mut strings = std::collections::HashMap::with_capacity(STRING_FIELDS.len());
    for field in STRING_FIELDS {
        let trimmed = non_empty_trimmed_string(&obj[*field])
            .ok_or_else(|| HubError::InvalidField((*field).to_owned()))?;
        strings.insert(*field, trimmed);
    }

    let reply_to = match &obj["reply_to"] {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        _ => return Err(HubError::InvalidField("reply_to".to_owned())),
    };

    Ok(Envelope {
        v: PROTOCOL_VERSION,
        id: strings.remove("id").unwrap(),
        ts: strings.remove("ts").unwrap(),
        from: strings.remove("from").unwrap(),
        to: strings.remove("to").unwrap(),
        topic: strings.remove("topic").unwrap(),
        reply_to,
        trace_id: strings.remove("trace_id").unwrap(),
        payload,
    })
}

/// Convenience wrapper for callers holding a raw text frame: JSON decode
/// failures become [`HubError::InvalidJson`] rather than being passed
/// through to [`validate_envelope`].
pub fn parse_and_validate(text: &str) -> Result<Envelope, HubError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| HubError::InvalidJson(e.to_string()))?;
    validate_envelope(&value)
}

fn missing_keys_error(missing: &[&str]) -> HubError {
    let mut sorted: Vec<&str> = missing.to_vec();
    sorted.sort_unstable();
    HubError::MissingKeys(sorted.join(", "))
}

fn non_empty_trimmed_string(value: &Value) -> Option<String> {
    let s = value.as_str()?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        other => other.to_string(),
    }
}
