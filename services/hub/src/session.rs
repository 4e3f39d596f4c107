//! Per-connection session state.
//!
//! A session owns exclusive write access to its transport: nothing outside
//! the connection task ever writes to the socket directly. Other tasks
//! (the router, the liveness sweep) talk to a session only through its
//! bounded outbound queue, a command channel the connection task drains
//! itself.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::time::Instant;

/// Capacity of a session's outbound queue.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// The three states a connection passes through. Tracked locally by the
/// connection task — nothing outside it needs to observe this directly,
/// but modeling it as a named enum (rather than booleans) keeps the
/// transitions in `connection.rs` self-documenting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingAuth,
    Authenticated,
    Closing,
}

/// Something the router or liveness monitor wants the connection task to do
/// on this session's behalf. The connection task alone touches the
/// transport in response.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Forward this exact text frame, byte-identical (P2).
    Forward(String),
    /// Close the transport with the given WS close code and reason.
    Close { code: u16, reason: String },
}

/// A clonable, cheaply-comparable reference to a live session, held by the
/// registry and handed to other sessions/the liveness monitor. Two handles
/// compare equal (via [`SessionHandle::points_to_same`]) iff they were
/// cloned from the same registration — this backs the registry's
/// `drop(name, expected_session)` guard against evicting a reconnect.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    service_name: String,
    outbound: mpsc::Sender<Outbound>,
    last_seen: Mutex<Instant>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let handle = Self {
            inner: Arc::new(SessionInner {
                service_name: service_name.into(),
                outbound: tx,
                last_seen: Mutex::new(Instant::now()),
            }),
        };
        (handle, rx)
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.inner.service_name
    }

    /// True if `self` and `other` were cloned from the same registration.
    /// Used by the registry's `drop` to guard against racing reconnects.
    #[must_use]
    pub fn points_to_same(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn touch(&self) {
        *self.inner.last_seen.lock().expect("last_seen mutex poisoned") = Instant::now();
    }

    #[must_use]
    pub fn idle_for(&self) -> std::time::Duration {
        self.inner
            .last_seen
            .lock()
            .expect("last_seen mutex poisoned")
            .elapsed()
    }

    /// Best-effort: enqueue a frame for this session's connection task to
    /// forward. Returns `false` if the queue is full or the session has
    /// already gone away — callers log and move on, since one slow or dead
    /// peer must never abort delivery to others.
    #[must_use]
    pub fn try_forward(&self, text: String) -> bool {
        self.inner.outbound.try_send(Outbound::Forward(text)).is_ok()
    }

    /// Ask the connection task to close with the given code/reason. Used by
    /// the liveness monitor and by auth failures; best-effort, same
    /// rationale as [`Self::try_forward`].
    pub fn request_close(&self, code: u16, reason: impl Into<String>) {
        let _ = self.inner.outbound.try_send(Outbound::Close {
            code,
            reason: reason.into(),
        });
    }
}
