//! Session controller: the application root that composes guard and sync.
//!
//! SYSTEM CONTEXT
//! ==============
//! Holds the single subscription to the provider's auth signal. Every auth
//! change and navigation request flows through here, so the rest of the app
//! only ever sees a settled [`ViewUpdate`].
//!
//! DESIGN
//! ======
//! Transitions are detected explicitly: the controller keeps the
//! last-observed `AuthState` and compares it with each update. Only the edge
//! into `Authenticated` starts a sync attempt; re-observing an unchanged
//! state is a no-op. The view is settled before the attempt is spawned, so
//! the dashboard never waits on the backend.
//!
//! Redirects use replace semantics: the location becomes the redirect
//! target and the view is the selection at that target.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::auth::AuthState;
use crate::navigation::{self, ROOT_PATH, RouteSelection};
use crate::sync::{
    AttemptOutcome, AttemptReport, CredentialSource, Generation, IdentitySync, SyncBackend, SyncStatus,
};

/// Settled navigation and sync state published to the rendering side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewUpdate {
    pub location: String,
    pub view: RouteSelection,
    pub sync: SyncStatus,
}

/// What happened to an attempt report handed to the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportDisposition {
    Applied(SyncStatus),
    /// The report's generation was superseded; nothing changed.
    Discarded { generation: Generation },
}

/// Sync-relevant edge between two observed auth states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncEdge {
    /// Entered `Authenticated`, or switched to a different provider session.
    SignedIn,
    /// Left `Authenticated`.
    SignedOut,
    None,
}

/// Classify the transition from `previous` to `next`.
#[must_use]
pub fn sync_edge(previous: &AuthState, next: &AuthState) -> SyncEdge {
    match (previous, next) {
        (AuthState::Authenticated(before), AuthState::Authenticated(after)) => {
            if before.same_session(after) {
                SyncEdge::None
            } else {
                SyncEdge::SignedIn
            }
        }
        (_, AuthState::Authenticated(_)) => SyncEdge::SignedIn,
        (AuthState::Authenticated(_), _) => SyncEdge::SignedOut,
        _ => SyncEdge::None,
    }
}

pub struct SessionController<C, B> {
    auth: AuthState,
    location: String,
    view: RouteSelection,
    status: SyncStatus,
    sync: IdentitySync<C, B>,
}

impl<C, B> SessionController<C, B>
where
    C: CredentialSource + 'static,
    B: SyncBackend + 'static,
{
    /// Start in the bootstrap state at `/`. `attempt_timeout` bounds each
    /// backend call.
    #[must_use]
    pub fn new(credentials: Arc<C>, backend: Arc<B>, attempt_timeout: Duration) -> Self {
        Self {
            auth: AuthState::Unknown,
            location: ROOT_PATH.to_owned(),
            view: RouteSelection::Pending,
            status: SyncStatus::Idle,
            sync: IdentitySync::new(credentials, backend, attempt_timeout),
        }
    }

    #[must_use]
    pub fn auth_state(&self) -> &AuthState {
        &self.auth
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub fn view(&self) -> RouteSelection {
        self.view
    }

    #[must_use]
    pub fn sync_status(&self) -> &SyncStatus {
        &self.status
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.sync.generation()
    }

    #[must_use]
    pub fn snapshot(&self) -> ViewUpdate {
        ViewUpdate { location: self.location.clone(), view: self.view, sync: self.status.clone() }
    }

    /// Feed the latest provider state. Returns the guard's selection for the
    /// current location before any redirect is followed.
    pub fn observe_auth(&mut self, next: AuthState) -> RouteSelection {
        if next == self.auth {
            return navigation::guard(&self.auth, &self.location);
        }

        let edge = sync_edge(&self.auth, &next);
        self.auth = next;
        let selection = self.settle();

        match edge {
            SyncEdge::SignedIn => {
                let generation = self.sync.trigger();
                info!(%generation, "identity sync started");
                self.status = SyncStatus::InFlight { generation };
            }
            SyncEdge::SignedOut => {
                let generation = self.sync.invalidate();
                debug!(%generation, "signed out; pending sync superseded");
                self.status = SyncStatus::Idle;
            }
            SyncEdge::None => {}
        }
        selection
    }

    /// Request a new location. Returns the guard's selection for it.
    pub fn navigate(&mut self, path: &str) -> RouteSelection {
        path.clone_into(&mut self.location);
        self.settle()
    }

    /// Wait for the next report from any attempt.
    pub async fn next_report(&mut self) -> Option<AttemptReport> {
        self.sync.next_report().await
    }

    /// Apply a report if it is current. Never touches navigation.
    pub fn apply_report(&mut self, report: AttemptReport) -> ReportDisposition {
        let generation = report.generation;
        let Some(outcome) = self.sync.accept(report) else {
            return ReportDisposition::Discarded { generation };
        };

        self.status = match outcome {
            AttemptOutcome::Synced(receipt) => {
                info!(%generation, status = receipt.status, "identity sync acknowledged");
                SyncStatus::Acknowledged { generation, user: receipt.user }
            }
            AttemptOutcome::CredentialFailed(e) => {
                warn!(%generation, error = %e, "credential unavailable; identity sync aborted");
                SyncStatus::Failed { generation, reason: e.to_string() }
            }
            AttemptOutcome::BackendFailed(e) => {
                warn!(%generation, error = %e, "identity sync failed");
                SyncStatus::Failed { generation, reason: e.to_string() }
            }
        };
        ReportDisposition::Applied(self.status.clone())
    }

    /// Drive the controller until the auth signal closes.
    ///
    /// Publishes a [`ViewUpdate`] whenever the settled state changes. A closed
    /// navigation channel only stops navigation; sync reports keep flowing.
    pub async fn run(
        mut self,
        mut auth: watch::Receiver<AuthState>,
        mut nav: mpsc::Receiver<String>,
        updates: watch::Sender<ViewUpdate>,
    ) {
        let initial = auth.borrow_and_update().clone();
        self.observe_auth(initial);
        self.publish(&updates);

        let mut nav_open = true;
        loop {
            tokio::select! {
                changed = auth.changed() => {
                    if changed.is_err() {
                        info!("auth signal closed; session controller stopping");
                        break;
                    }
                    let next = auth.borrow_and_update().clone();
                    self.observe_auth(next);
                }
                path = nav.recv(), if nav_open => match path {
                    Some(path) => {
                        self.navigate(&path);
                    }
                    None => nav_open = false,
                },
                Some(report) = self.sync.next_report() => {
                    self.apply_report(report);
                }
            }
            self.publish(&updates);
        }
    }

    fn publish(&self, updates: &watch::Sender<ViewUpdate>) {
        updates.send_if_modified(|current| {
            let next = self.snapshot();
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn settle(&mut self) -> RouteSelection {
        let selection = navigation::guard(&self.auth, &self.location);
        self.view = match selection {
            RouteSelection::RedirectTo(route) => {
                debug!(from = %self.location, to = route.path(), "redirecting");
                route.path().clone_into(&mut self.location);
                navigation::guard(&self.auth, &self.location)
            }
            other => other,
        };
        selection
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
