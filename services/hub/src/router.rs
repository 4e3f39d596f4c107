//! Router: dispatches a validated envelope from an authenticated sender to
//! its destination(s).
//!
//! `hb.ping` is answered directly; `broadcast` fans out to every other
//! session; anything else is a unicast lookup-or-error. Cross-session
//! delivery goes through each target's own outbound queue
//! ([`crate::session::SessionHandle::try_forward`]) rather than a socket
//! the router itself holds, so the router never holds a lock on the
//! sender's receive path while waiting on a write to a downstream peer.

use ipc_protocol::{topics, Envelope, ErrorPayload, HubError};
use tracing::{debug, warn};

use crate::registry::Registry;

/// What the connection task handling the sender must do after the router
/// has acted. Direct replies (`hb.pong`, `ipc.error`) are addressed back to
/// the sender on the same transport the sender is already writing on, so
/// the caller sends them itself rather than going through the registry.
pub enum RouteOutcome {
    /// The envelope was forwarded (unicast or broadcast) or silently
    /// dropped (self-addressed unicast); nothing more to do.
    Delivered,
    /// Send this serialized envelope back to the sender directly.
    Reply(String),
}

pub struct Router {
    registry: Registry,
}

impl Router {
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Route one validated envelope from `sender_name`, whose original raw
    /// text is `raw_text` (forwarded byte-identical per P2 — never
    /// re-serialized from `envelope`).
    pub async fn route(
        &self,
        sender_name: &str,
        raw_text: &str,
        envelope: &Envelope,
    ) -> RouteOutcome {
        if envelope.topic == topics::HB_PING {
            let pong = Envelope::hub_originated(
                sender_name,
                topics::HB_PONG,
                envelope.trace_id.clone(),
                Some(envelope.id.clone()),
                serde_json::Map::new(),
            );
            return RouteOutcome::Reply(serialize(&pong));
        }

        if envelope.to == topics::BROADCAST {
            self.broadcast(sender_name, raw_text).await;
            return RouteOutcome::Delivered;
        }

        if envelope.to == sender_name {
            // Self-addressed unicast: neither "forward" nor "unknown
            // destination" applies cleanly, so it's a silent drop.
            debug!(service = %sender_name, "dropping self-addressed unicast envelope");
            return RouteOutcome::Delivered;
        }

        match self.registry.lookup(&envelope.to).await {
            Some(target) => {
                if !target.try_forward(raw_text.to_owned()) {
                    warn!(
                        from = %sender_name,
                        to = %envelope.to,
                        "dropped envelope: destination outbound queue full or closed"
                    );
                }
                RouteOutcome::Delivered
            }
            None => {
                let err = HubError::UnknownDestination(envelope.to.clone());
                let reply = Envelope::hub_originated(
                    sender_name,
                    topics::IPC_ERROR,
                    envelope.trace_id.clone(),
                    Some(envelope.id.clone()),
                    Envelope::payload_of(&ErrorPayload::from(&err)),
                );
                RouteOutcome::Reply(serialize(&reply))
            }
        }
    }

    async fn broadcast(&self, sender_name: &str, raw_text: &str) {
        for target in self.registry.snapshot().await {
            if target.service_name() == sender_name {
                continue;
            }
            if !target.try_forward(raw_text.to_owned()) {
                warn!(
                    from = %sender_name,
                    to = %target.service_name(),
                    "broadcast dropped for one recipient: outbound queue full or closed"
                );
            }
        }
    }
}

fn serialize(envelope: &Envelope) -> String {
    serde_json::to_string(envelope).expect("Envelope serialization is infallible")
}
