//! Authentication contract: the first frame on every connection must be
//! `auth.hello` carrying the shared secret.
//!
//! The hub has exactly one shared secret rather than per-peer credentials,
//! so this is a single token compare plus taking `service_name` from the
//! envelope's `from` field — never from the payload, so a peer cannot
//! claim a different identity than it sent under.

use ipc_protocol::{topics, AuthHello, Envelope, HubError};

/// Validate an `auth.hello` envelope against the configured token.
///
/// Returns the resolved service name (the envelope's `from`) on success.
/// The envelope validator has already guaranteed `payload` is an object and
/// every listed string field is non-empty; this only checks the topic and
/// the token.
pub fn authenticate(envelope: &Envelope, expected_token: &str) -> Result<String, HubError> {
    if envelope.topic != topics::AUTH_HELLO {
        return Err(HubError::AuthRequired);
    }

    let hello: AuthHello = serde_json::from_value(serde_json::Value::Object(
        envelope.payload.clone(),
    ))
    .map_err(|_| HubError::InvalidPayload)?;

    if hello.token != expected_token {
        return Err(HubError::AuthInvalid);
    }

    Ok(envelope.from.clone())
}
