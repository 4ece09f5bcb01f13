//! Top-level observer of `Unauthorized` results.
//!
//! # Design
//! The HTTP layer only clears the session and reports `Unauthorized`; moving
//! the user to the login view happens here, once. Each `Unauthorized` carries
//! the session generation it cleared. The coordinator remembers the
//! generation it last redirected for, so any number of 401s from one period
//! (for example from requests that were already in flight) produce a single
//! navigation. Logging in again bumps the generation and re-arms the redirect;
//! a 401 from an earlier period observed after that login is ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::auth::AuthApi;
use crate::error::ApiError;
use crate::session::{SessionState, SessionStore};
use crate::types::Token;

const NEVER: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Todos,
}

pub trait Navigator {
    fn navigate(&self, view: View);
}

pub struct SessionCoordinator<N> {
    session: Arc<SessionStore>,
    navigator: N,
    redirected_for: AtomicU64,
}

impl<N: Navigator> SessionCoordinator<N> {
    pub fn new(session: Arc<SessionStore>, navigator: N) -> Self {
        Self {
            session,
            navigator,
            redirected_for: AtomicU64::new(NEVER),
        }
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Pass `result` through, redirecting to login if it is `Unauthorized`.
    pub fn observe<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(ApiError::Unauthorized { generation, .. }) = &result {
            self.redirect_to_login(*generation);
        }
        result
    }

    /// Log in and show the todo list.
    pub fn login(&self, auth: AuthApi<'_>, email: &str, password: &str) -> Result<Token, ApiError> {
        let token = self.observe(auth.login(email, password))?;
        self.navigator.navigate(View::Todos);
        Ok(token)
    }

    /// Forget the local session and show the login view.
    pub fn logout(&self, auth: AuthApi<'_>) {
        auth.logout();
        self.navigator.navigate(View::Login);
    }

    fn redirect_to_login(&self, generation: u64) {
        let current = self.session.generation();
        if current != generation {
            tracing::debug!(generation, current, "401 from an earlier session, not redirecting");
            return;
        }
        if self.redirected_for.swap(generation, Ordering::SeqCst) == generation {
            tracing::debug!(generation, "login redirect already performed");
            return;
        }
        tracing::warn!(generation, "session rejected by backend, redirecting to login");
        self.navigator.navigate(View::Login);
    }
}

impl<N> std::fmt::Debug for SessionCoordinator<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("session", &self.session)
            .field("redirected_for", &self.redirected_for)
            .finish_non_exhaustive()
    }
}
