//! Scripted credential source and backend for sync and controller tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{CredentialError, CredentialSource, SyncBackend, SyncError, SyncReceipt, SyncedUser};
use crate::auth::Credential;

// =========================================================================
// MockCredentials
// =========================================================================

/// Issues `tok-1`, `tok-2`, ... unless a failure is queued.
#[derive(Default)]
pub(crate) struct MockCredentials {
    issued: AtomicUsize,
    failures: Mutex<VecDeque<CredentialError>>,
}

impl MockCredentials {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn fail_next(&self, err: CredentialError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub(crate) fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialSource for MockCredentials {
    async fn fetch_credential(&self) -> Result<Credential, CredentialError> {
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Credential::new(format!("tok-{n}")))
    }
}

/// Provider that never answers.
#[derive(Debug, Default)]
pub(crate) struct HungCredentials;

#[async_trait]
impl CredentialSource for HungCredentials {
    async fn fetch_credential(&self) -> Result<Credential, CredentialError> {
        std::future::pending().await
    }
}

// =========================================================================
// MockBackend
// =========================================================================

/// Records every token it receives. Tokens can be held until released or
/// scripted to fail with a 500.
#[derive(Default)]
pub(crate) struct MockBackend {
    seen: Mutex<Vec<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failing: Mutex<HashSet<String>>,
}

impl MockBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Block calls carrying `token` until the returned handle is notified.
    pub(crate) fn hold(&self, token: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(token.to_owned(), Arc::clone(&gate));
        gate
    }

    pub(crate) fn fail(&self, token: &str) {
        self.failing.lock().unwrap().insert(token.to_owned());
    }

    pub(crate) fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SyncBackend for MockBackend {
    async fn sync(&self, credential: &Credential) -> Result<SyncReceipt, SyncError> {
        let token = credential.expose().to_owned();
        self.seen.lock().unwrap().push(token.clone());

        let gate = self.gates.lock().unwrap().get(&token).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.failing.lock().unwrap().contains(&token) {
            return Err(SyncError::Status { status: 500, body: "boom".into() });
        }
        Ok(SyncReceipt { status: 200, user: Some(SyncedUser { id: 1, clerk_id: token }) })
    }
}
