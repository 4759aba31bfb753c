//! HTTP sync backend.
//!
//! Thin reqwest wrapper for `GET {api_url}{sync_path}` with a bearer token.
//! Body parsing is split into `parse_synced_user` for testability.

use std::time::Duration;

use async_trait::async_trait;

use super::{SyncBackend, SyncError, SyncReceipt, SyncedUser};
use crate::auth::Credential;
use crate::config::SyncConfig;

pub struct HttpSyncBackend {
    http: reqwest::Client,
    endpoint: String,
    request_timeout: Duration,
}

impl HttpSyncBackend {
    /// Build a client with the configured request and connect timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::HttpClientBuild`] if the TLS backend fails to initialise.
    pub fn new(config: &SyncConfig) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| SyncError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, endpoint: config.endpoint(), request_timeout: config.request_timeout })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, err: &reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.request_timeout)
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl SyncBackend for HttpSyncBackend {
    async fn sync(&self, credential: &Credential) -> Result<SyncReceipt, SyncError> {
        let response = self
            .http
            .get(&self.endpoint)
            .bearer_auth(credential.expose())
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !status.is_success() {
            return Err(SyncError::Status { status: status.as_u16(), body: text });
        }

        Ok(SyncReceipt { status: status.as_u16(), user: parse_synced_user(&text) })
    }
}

pub(crate) fn parse_synced_user(body: &str) -> Option<SyncedUser> {
    serde_json::from_str(body).ok()
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
