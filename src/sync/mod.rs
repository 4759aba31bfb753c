//! Identity sync: forwards a fresh provider credential to the backend.
//!
//! DESIGN
//! ======
//! Two trait seams keep the handshake testable without a live provider or
//! server. [`CredentialSource`] mints the bearer token and [`SyncBackend`]
//! delivers it. [`attempt::IdentitySync`] runs one attempt per sign-in edge
//! and reports back over a channel, tagged with the generation it was
//! started under.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is terminal for its attempt only. Errors are carried back
//! as data in the attempt report and end up in [`SyncStatus`]; nothing is
//! raised to the rendering side and navigation is never affected.

pub mod attempt;
pub mod http;
#[cfg(test)]
pub(crate) mod test_support;

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::auth::Credential;

pub use attempt::{AttemptOutcome, AttemptReport, Generation, IdentitySync};
pub use http::HttpSyncBackend;

// =============================================================================
// ERRORS
// =============================================================================

/// The identity provider could not produce a token.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("identity provider could not issue a token: {0}")]
    Unavailable(String),

    #[error("no active provider session")]
    SignedOut,

    #[error("identity provider did not issue a token within {0:?}")]
    Timeout(Duration),
}

/// The backend handshake failed.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Connection or protocol failure before a status was received.
    #[error("sync request failed: {0}")]
    Transport(String),

    #[error("sync request timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with a non-success status.
    #[error("sync rejected: status {status}")]
    Status { status: u16, body: String },

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// User record echoed by the backend after it upserts the session owner.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SyncedUser {
    pub id: i64,
    pub clerk_id: String,
}

/// Successful sync acknowledgement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncReceipt {
    pub status: u16,
    /// Parsed best-effort; `None` when the body has another shape.
    pub user: Option<SyncedUser>,
}

/// Last applied sync result, as seen by the rendering side.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SyncStatus {
    #[default]
    Idle,
    InFlight {
        generation: Generation,
    },
    Acknowledged {
        generation: Generation,
        user: Option<SyncedUser>,
    },
    Failed {
        generation: Generation,
        reason: String,
    },
}

// =============================================================================
// SEAMS
// =============================================================================

/// On-demand credential fetch from the identity provider.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch_credential(&self) -> Result<Credential, CredentialError>;
}

/// Delivers a credential to the backend session endpoint.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    async fn sync(&self, credential: &Credential) -> Result<SyncReceipt, SyncError>;
}

/// Serves a fixed token, e.g. one pasted from the provider's dev console.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self { token: token.filter(|t| !t.trim().is_empty()) }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn fetch_credential(&self) -> Result<Credential, CredentialError> {
        self.token
            .as_deref()
            .map(Credential::new)
            .ok_or_else(|| CredentialError::Unavailable("no session token configured".into()))
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
