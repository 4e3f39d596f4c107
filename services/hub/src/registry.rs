//! Session registry: a name → session directory enforcing at most one
//! session per name, idempotent removal, and lock-free broadcast iteration.
//!
//! An `Arc<RwLock<HashMap<...>>>` with a short critical section per
//! operation, and a snapshot-then-act pattern so callers never hold the
//! lock across I/O.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::session::SessionHandle;

/// Returned by [`Registry::register`] when a name is already taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateService;

#[derive(Clone, Default)]
pub struct Registry {
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` under `name`. Fails with [`DuplicateService`] if
    /// the name is already live — the existing session is left untouched.
    pub async fn register(
        &self,
        name: &str,
        session: SessionHandle,
    ) -> Result<(), DuplicateService> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(name) {
            return Err(DuplicateService);
        }
        sessions.insert(name.to_owned(), session);
        Ok(())
    }

    /// Look up a live session by name.
    pub async fn lookup(&self, name: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(name).cloned()
    }

    /// Remove `name` only if its current entry is the same registration as
    /// `expected`, guarding against a stale eviction racing a reconnect.
    /// Idempotent: a second call, or a call after a newer session has
    /// replaced this one, is a no-op.
    pub async fn drop_if_current(&self, name: &str, expected: &SessionHandle) {
        let mut sessions = self.sessions.write().await;
        if let Some(current) = sessions.get(name) {
            if current.points_to_same(expected) {
                sessions.remove(name);
            }
        }
    }

    /// A stable-ordering snapshot of every live session, for broadcast and
    /// the liveness sweep. Cloning handles is cheap (`Arc` refcount bump);
    /// callers do their I/O after the lock is released.
    pub async fn snapshot(&self) -> Vec<SessionHandle> {
        self.sessions.read().await.values().cloned().collect()
    }
}
