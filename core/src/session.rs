//! Persisted session: bearer token plus cached user.
//!
//! # Design
//! One `SessionStore` exists per client context and is passed explicitly
//! (`Arc<SessionStore>`) to the HTTP client and the coordinator. Reads and
//! writes go through a single mutex, so a 401 clearing the session from one
//! thread is observed by every later request on any other thread.
//!
//! The contract has no failure mode: storage write errors are logged and
//! dropped, and a cached user that no longer deserializes reads as absent.
//!
//! Every `set_token` bumps a generation counter. A generation identifies one
//! authenticated period; the coordinator uses it to redirect once per period.
//! `clear` reports the generation it ended, read under the same lock, so a
//! 401 can be attributed to the period it actually belonged to.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::storage::{MemoryStorage, Storage};
use crate::types::User;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Outcome of `SessionStore::clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cleared {
    /// Whether a token or cached user was present.
    pub had_session: bool,
    /// Generation the store was in when it was cleared.
    pub generation: u64,
}

struct Inner {
    storage: Box<dyn Storage>,
    generation: u64,
}

pub struct SessionStore {
    inner: Mutex<Inner>,
}

impl SessionStore {
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            inner: Mutex::new(Inner {
                storage: Box::new(storage),
                generation: 0,
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_token(&self, token: &str) {
        let mut inner = self.lock();
        inner.generation += 1;
        if let Err(e) = inner.storage.set(TOKEN_KEY, token) {
            tracing::warn!(error = %e, "failed to persist session token");
        }
    }

    pub fn token(&self) -> Option<String> {
        self.lock().storage.get(TOKEN_KEY)
    }

    pub fn set_user(&self, user: &User) {
        let value = match serde_json::to_string(user) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize cached user");
                return;
            }
        };
        if let Err(e) = self.lock().storage.set(USER_KEY, &value) {
            tracing::warn!(error = %e, "failed to persist cached user");
        }
    }

    pub fn user(&self) -> Option<User> {
        let raw = self.lock().storage.get(USER_KEY)?;
        serde_json::from_str(&raw).ok()
    }

    /// Remove token and cached user.
    pub fn clear(&self) -> Cleared {
        let mut inner = self.lock();
        let had_session =
            inner.storage.get(TOKEN_KEY).is_some() || inner.storage.get(USER_KEY).is_some();
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = inner.storage.remove(key) {
                tracing::warn!(key, error = %e, "failed to remove session key");
            }
        }
        Cleared {
            had_session,
            generation: inner.generation,
        }
    }

    pub fn state(&self) -> SessionState {
        match self.token() {
            Some(_) => SessionState::Authenticated,
            None => SessionState::Anonymous,
        }
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.state())
            .field("generation", &self.generation())
            .finish()
    }
}
