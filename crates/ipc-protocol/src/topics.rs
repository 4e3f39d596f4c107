//! Frozen v1 topic and destination names.
//!
//! Kept as plain string constants rather than an enum so wire bytes never
//! need a serde round-trip just to compare a topic.

/// Peer -> hub: the first message on every connection.
pub const AUTH_HELLO: &str = "auth.hello";
/// Hub -> peer: sent once authentication succeeds.
pub const AUTH_OK: &str = "auth.ok";
/// Reserved for future use; the hub currently reports every rejection,
/// including handshake failures, on [`IPC_ERROR`] instead.
pub const AUTH_ERROR: &str = "auth.error";
/// Hub -> peer: any validation or routing error.
pub const IPC_ERROR: &str = "ipc.error";
/// Peer -> hub: liveness probe.
pub const HB_PING: &str = "hb.ping";
/// Hub -> peer: liveness probe reply.
pub const HB_PONG: &str = "hb.pong";

/// Reserved destination meaning "fan out to every other authenticated peer".
pub const BROADCAST: &str = "broadcast";
/// The hub's own identity, used as `from` on every hub-originated envelope
/// and as `to` for hub-local topics.
pub const HUB_NAME: &str = "ipc-hub";

pub const PROTOCOL_VERSION: i64 = 1;
