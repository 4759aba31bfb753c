//! Sync endpoint configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_SYNC_PATH: &str = "/api/me";
pub const DEFAULT_SYNC_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SYNC_CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The API base URL is not an absolute http(s) URL.
    #[error("invalid API base URL: {0:?}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Backend base URL without a trailing slash.
    pub api_url: String,
    /// Sync endpoint path, always starting with `/`.
    pub sync_path: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl SyncConfig {
    /// Build a config with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if `api_url` is not http(s).
    pub fn new(api_url: &str, sync_path: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: normalize_base_url(api_url)?,
            sync_path: normalize_sync_path(sync_path),
            request_timeout: Duration::from_secs(DEFAULT_SYNC_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_SYNC_CONNECT_TIMEOUT_SECS),
        })
    }

    /// Build typed sync config from environment variables.
    ///
    /// Optional:
    /// - `ASSESSLY_API_URL`: default `http://localhost:8000`
    /// - `ASSESSLY_SYNC_PATH`: default `/api/me`
    /// - `SYNC_REQUEST_TIMEOUT_SECS`: default 10
    /// - `SYNC_CONNECT_TIMEOUT_SECS`: default 5
    ///
    /// # Errors
    ///
    /// Returns an error if `ASSESSLY_API_URL` is set to a non-http(s) value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("ASSESSLY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        let sync_path = lookup("ASSESSLY_SYNC_PATH").unwrap_or_else(|| DEFAULT_SYNC_PATH.to_owned());
        let request_secs = parse_or(lookup("SYNC_REQUEST_TIMEOUT_SECS"), DEFAULT_SYNC_REQUEST_TIMEOUT_SECS);
        let connect_secs = parse_or(lookup("SYNC_CONNECT_TIMEOUT_SECS"), DEFAULT_SYNC_CONNECT_TIMEOUT_SECS);

        Ok(Self::new(&api_url, &sync_path)?.with_timeouts(
            Duration::from_secs(request_secs),
            Duration::from_secs(connect_secs),
        ))
    }

    /// Replace the base URL, keeping everything else.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] if `api_url` is not http(s).
    pub fn with_api_url(mut self, api_url: &str) -> Result<Self, ConfigError> {
        self.api_url = normalize_base_url(api_url)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_timeouts(mut self, request: Duration, connect: Duration) -> Self {
        self.request_timeout = request;
        self.connect_timeout = connect;
        self
    }

    /// Full sync endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.api_url, self.sync_path)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            sync_path: DEFAULT_SYNC_PATH.to_owned(),
            request_timeout: Duration::from_secs(DEFAULT_SYNC_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_SYNC_CONNECT_TIMEOUT_SECS),
        }
    }
}

fn parse_or<T>(raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr,
{
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));
    match host {
        Some(rest) if !rest.is_empty() => Ok(trimmed.to_owned()),
        _ => Err(ConfigError::InvalidBaseUrl(raw.to_owned())),
    }
}

fn normalize_sync_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_SYNC_PATH.to_owned()
    } else if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
