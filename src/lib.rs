//! Session-gated navigation and identity sync for the Assessly client.
//!
//! ARCHITECTURE
//! ============
//! - [`navigation`]: pure guard from auth state and path to a screen.
//! - [`sync`]: one-shot credential handshake with the backend.
//! - [`controller`]: the application root that watches auth transitions,
//!   settles redirects and drives sync attempts.
//! - [`auth`]: the provider-owned auth-state cell and identity types.

pub mod auth;
pub mod config;
pub mod console;
pub mod controller;
pub mod navigation;
pub mod sync;

pub use auth::{AuthSignal, AuthState, Credential, Identity, SignInError};
pub use config::SyncConfig;
pub use controller::{SessionController, ViewUpdate};
pub use navigation::{Route, RouteSelection, guard};
pub use sync::{HttpSyncBackend, StaticCredentials, SyncStatus};
