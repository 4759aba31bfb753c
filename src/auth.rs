//! Auth-session state published by the identity provider.
//!
//! SYSTEM CONTEXT
//! ==============
//! The provider owns this state and writes it through [`AuthSignal`]. The
//! session controller holds the single subscription; nothing else in the
//! crate reads provider state directly.
//!
//! DESIGN
//! ======
//! `AuthSignal` wraps a `tokio::sync::watch` cell that starts at
//! [`AuthState::Unknown`]. Its writer exposes only `sign_in` and `sign_out`,
//! so once resolved the cell can never return to `Unknown`.
//!
//! A watch cell keeps only the latest value, so a sign-out followed by a
//! sign-in can reach subscribers as a single change. Subscribers detect the
//! sign-in edge by a differing `session_id`; for that to hold, a session id
//! that has been signed out is never accepted again.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

// =============================================================================
// IDENTITY
// =============================================================================

/// The signed-in user as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Provider user identifier (e.g. `user_2abc...`).
    pub user_id: String,
    /// Provider session identifier. A new sign-in always carries a new one.
    pub session_id: String,
    pub first_name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), session_id: session_id.into(), first_name: None, email: None }
    }

    #[must_use]
    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Upper-cased first name, or `USER` when the provider has none.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.first_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| "USER".to_owned(), str::to_uppercase)
    }

    /// Dashboard header greeting.
    #[must_use]
    pub fn welcome_banner(&self) -> String {
        format!("WELCOME BACK, {}!", self.display_name())
    }

    /// True when both identities belong to the same provider session.
    #[must_use]
    pub fn same_session(&self, other: &Self) -> bool {
        self.user_id == other.user_id && self.session_id == other.session_id
    }
}

// =============================================================================
// AUTH STATE
// =============================================================================

/// Tri-valued authentication status.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum AuthState {
    /// The provider has not resolved yet.
    #[default]
    Unknown,
    Authenticated(Identity),
    Unauthenticated,
}

impl AuthState {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Unknown | Self::Unauthenticated => None,
        }
    }
}

// =============================================================================
// CREDENTIAL
// =============================================================================

/// Short-lived bearer token minted by the provider for one sync attempt.
///
/// Never cached or cloned; each attempt fetches its own.
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value, for the `Authorization` header only.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

// =============================================================================
// SIGNAL
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignInError {
    /// The session was already signed out; a new sign-in needs a new id.
    #[error("session `{0}` has ended; sign in with a new session id")]
    SessionEnded(String),
}

/// Writer half of the provider's auth-state cell.
#[derive(Debug)]
pub struct AuthSignal {
    tx: watch::Sender<AuthState>,
    ended: Mutex<HashSet<String>>,
}

impl AuthSignal {
    /// Create a cell in the `Unknown` bootstrap state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthState::Unknown);
        Self { tx, ended: Mutex::new(HashSet::new()) }
    }

    /// Subscribe to state changes. The receiver sees the current value first.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    /// Publish a signed-in identity. Returns `Ok(false)` if that exact
    /// identity was already published, in which case subscribers are not
    /// woken.
    ///
    /// # Errors
    ///
    /// Returns [`SignInError::SessionEnded`] when the identity reuses a
    /// session id that was signed out earlier. Accepting it could coalesce
    /// with that sign-out and hide the new sign-in from subscribers.
    pub fn sign_in(&self, identity: Identity) -> Result<bool, SignInError> {
        if self.ended_sessions().contains(&identity.session_id) {
            return Err(SignInError::SessionEnded(identity.session_id));
        }
        Ok(self.tx.send_if_modified(|state| {
            if matches!(&*state, AuthState::Authenticated(current) if *current == identity) {
                return false;
            }
            *state = AuthState::Authenticated(identity);
            true
        }))
    }

    /// Publish the signed-out state and retire the current session id. Also
    /// used by the provider to resolve the bootstrap state when no session
    /// exists.
    pub fn sign_out(&self) -> bool {
        let mut ended = self.ended_sessions();
        self.tx.send_if_modified(|state| {
            match state {
                AuthState::Unauthenticated => return false,
                AuthState::Authenticated(identity) => {
                    ended.insert(identity.session_id.clone());
                }
                AuthState::Unknown => {}
            }
            *state = AuthState::Unauthenticated;
            true
        })
    }

    fn ended_sessions(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.ended.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AuthSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
