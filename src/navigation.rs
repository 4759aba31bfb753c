//! Navigation guard: which screen the current auth state may see.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every route component applies the same rule, so it lives here as a single
//! total function instead of per-page redirect effects. Signed-in users never
//! reach the login surface and signed-out users never reach the dashboard.
//!
//! DESIGN
//! ======
//! `guard` is pure. It performs no I/O and keeps no state, and re-evaluating
//! it on the same input always yields the same selection. While the provider
//! is still resolving it returns `Pending`, so no gated content renders
//! before a decision exists.

use std::fmt;

use crate::auth::AuthState;

pub const ROOT_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

// =============================================================================
// ROUTES
// =============================================================================

/// The two canonical destinations. Everything else is a catch-all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Dashboard,
}

impl Route {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => LOGIN_PATH,
            Self::Dashboard => DASHBOARD_PATH,
        }
    }

    /// Match a requested path against the route table.
    ///
    /// Query strings, fragments and trailing slashes are ignored, and the
    /// comparison is ASCII case-insensitive. Root and unrecognized paths
    /// return `None`.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let normalized = normalize_path(path);
        [Self::Login, Self::Dashboard]
            .into_iter()
            .find(|route| normalized.eq_ignore_ascii_case(route.path()))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Strip query, fragment and trailing slashes. Empty input is root.
pub(crate) fn normalize_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim().trim_end_matches('/');
    if trimmed.is_empty() { ROOT_PATH } else { trimmed }
}

// =============================================================================
// SELECTION
// =============================================================================

/// Outcome of evaluating the guard for one `(AuthState, path)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteSelection {
    /// Provider unresolved; render nothing gated.
    Pending,
    LoginView,
    DashboardView,
    RedirectTo(Route),
}

impl RouteSelection {
    #[must_use]
    pub fn redirect_target(self) -> Option<Route> {
        match self {
            Self::RedirectTo(route) => Some(route),
            Self::Pending | Self::LoginView | Self::DashboardView => None,
        }
    }

    /// True when this selection renders content that requires a session.
    #[must_use]
    pub fn is_gated_content(self) -> bool {
        matches!(self, Self::DashboardView)
    }
}

// =============================================================================
// GUARD
// =============================================================================

/// Map auth state and requested path to exactly one selection.
#[must_use]
pub fn guard(state: &AuthState, requested_path: &str) -> RouteSelection {
    match state {
        AuthState::Unknown => RouteSelection::Pending,
        AuthState::Authenticated(_) => match Route::parse(requested_path) {
            Some(Route::Dashboard) => RouteSelection::DashboardView,
            Some(Route::Login) | None => RouteSelection::RedirectTo(Route::Dashboard),
        },
        AuthState::Unauthenticated => match Route::parse(requested_path) {
            Some(Route::Login) => RouteSelection::LoginView,
            Some(Route::Dashboard) | None => RouteSelection::RedirectTo(Route::Login),
        },
    }
}

#[cfg(test)]
#[path = "navigation_test.rs"]
mod tests;
