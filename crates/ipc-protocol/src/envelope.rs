//! The envelope: the only wire form traversing the hub.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A validated, normalized envelope.
///
/// `payload` is a JSON object by construction — [`crate::validate::validate_envelope`]
/// is the only legal way to obtain one from untrusted input, so downstream
/// code never has to re-check "is this actually an object".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub v: i64,
    pub id: String,
    pub ts: String,
    pub from: String,
    pub to: String,
    pub topic: String,
    pub reply_to: Option<String>,
    pub trace_id: String,
    pub payload: Map<String, Value>,
}

impl Envelope {
    /// Build a freshly originated envelope: fresh `id`, current `ts`. Shared
    /// by hub-originated replies and peer-originated requests so both sides
    /// stamp envelopes identically.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        topic: impl Into<String>,
        trace_id: impl Into<String>,
        reply_to: Option<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            v: crate::topics::PROTOCOL_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            ts: chrono::Utc::now().to_rfc3339(),
            from: from.into(),
            to: to.into(),
            topic: topic.into(),
            reply_to,
            trace_id: trace_id.into(),
            payload,
        }
    }

    /// Build a hub-originated envelope: `from = "ipc-hub"`, and the given
    /// `trace_id` preserved from the request being answered.
    #[must_use]
    pub fn hub_originated(
        to: impl Into<String>,
        topic: impl Into<String>,
        trace_id: impl Into<String>,
        reply_to: Option<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self::new(
            crate::topics::HUB_NAME,
            to,
            topic,
            trace_id,
            reply_to,
            payload,
        )
    }

    /// Serialize a `Serialize` payload value into the JSON-object form the
    /// envelope requires. Panics only if `T`'s `Serialize` impl produces a
    /// non-object, which none of the payload types in this crate do.
    pub fn payload_of<T: Serialize>(value: &T) -> Map<String, Value> {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// `auth.hello` payload (peer -> hub).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthHello {
    pub service: String,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
}

/// `auth.ok` payload (hub -> peer).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthOk {
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

/// `ipc.error` / `auth.error` payload (hub -> peer).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl From<&crate::error::HubError> for ErrorPayload {
    fn from(err: &crate::error::HubError) -> Self {
        Self {
            code: err.code().to_owned(),
            message: err.to_string(),
        }
    }
}
