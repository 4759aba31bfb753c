//! Sync attempt driver with generation tagging.
//!
//! DESIGN
//! ======
//! Each attempt captures the generation current at trigger time and sends
//! its outcome back over an unbounded channel. The owner bumps the
//! generation on every new sign-in edge and on sign-out. A report is applied
//! only when its generation still matches. Superseded attempts are not
//! aborted: they may finish against the backend, but their results are
//! dropped on arrival.
//!
//! The driver is owned by one writer (the session controller), so the
//! generation is a plain `u64` with no locking.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use super::{CredentialError, CredentialSource, SyncBackend, SyncError, SyncReceipt};

/// Monotonic tag identifying one sync attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub enum AttemptOutcome {
    Synced(SyncReceipt),
    /// Aborted before any request was sent.
    CredentialFailed(CredentialError),
    BackendFailed(SyncError),
}

#[derive(Debug)]
pub struct AttemptReport {
    pub generation: Generation,
    pub outcome: AttemptOutcome,
}

/// Run one attempt: fetch a fresh credential, then call the backend.
///
/// `limit` is one budget shared by both steps, so a hung provider ends the
/// attempt as surely as a hung backend.
pub async fn run_attempt<C, B>(credentials: &C, backend: &B, limit: Duration) -> AttemptOutcome
where
    C: CredentialSource + ?Sized,
    B: SyncBackend + ?Sized,
{
    let deadline = Instant::now() + limit;

    let credential = match tokio::time::timeout_at(deadline, credentials.fetch_credential()).await {
        Ok(Ok(credential)) => credential,
        Ok(Err(e)) => return AttemptOutcome::CredentialFailed(e),
        Err(_) => return AttemptOutcome::CredentialFailed(CredentialError::Timeout(limit)),
    };

    match tokio::time::timeout_at(deadline, backend.sync(&credential)).await {
        Ok(Ok(receipt)) => AttemptOutcome::Synced(receipt),
        Ok(Err(e)) => AttemptOutcome::BackendFailed(e),
        Err(_) => AttemptOutcome::BackendFailed(SyncError::Timeout(limit)),
    }
}

pub struct IdentitySync<C, B> {
    credentials: Arc<C>,
    backend: Arc<B>,
    limit: Duration,
    generation: Generation,
    reports_tx: mpsc::UnboundedSender<AttemptReport>,
    reports_rx: mpsc::UnboundedReceiver<AttemptReport>,
}

impl<C, B> IdentitySync<C, B>
where
    C: CredentialSource + 'static,
    B: SyncBackend + 'static,
{
    #[must_use]
    pub fn new(credentials: Arc<C>, backend: Arc<B>, limit: Duration) -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        Self { credentials, backend, limit, generation: Generation::default(), reports_tx, reports_rx }
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Start a new attempt under a fresh generation. Must be called from
    /// within a tokio runtime.
    pub fn trigger(&mut self) -> Generation {
        self.generation = self.generation.next();
        let generation = self.generation;
        let credentials = Arc::clone(&self.credentials);
        let backend = Arc::clone(&self.backend);
        let reports_tx = self.reports_tx.clone();
        let limit = self.limit;

        tokio::spawn(async move {
            let outcome = run_attempt(&*credentials, &*backend, limit).await;
            // Send fails only once the driver itself is gone.
            let _ = reports_tx.send(AttemptReport { generation, outcome });
        });
        generation
    }

    /// Supersede any in-flight attempt without starting a new one.
    pub fn invalidate(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.generation
    }

    /// Wait for the next report from any attempt, current or stale.
    pub async fn next_report(&mut self) -> Option<AttemptReport> {
        self.reports_rx.recv().await
    }

    /// Unwrap a report if it belongs to the current generation.
    pub fn accept(&self, report: AttemptReport) -> Option<AttemptOutcome> {
        if report.generation != self.generation {
            debug!(
                generation = %report.generation,
                current = %self.generation,
                "discarding superseded sync report"
            );
            return None;
        }
        Some(report.outcome)
    }
}

#[cfg(test)]
#[path = "attempt_test.rs"]
mod tests;
