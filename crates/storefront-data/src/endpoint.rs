//! Collaborator endpoints and their timeouts.

use std::time::Duration;

use storefront_commerce::config::ServiceConfig;
use url::Url;

use crate::client::FetchError;

/// Timeout configuration for a fetch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Connection timeout.
    pub connect: Duration,
    /// Total operation timeout.
    pub total: Duration,
}

impl TimeoutConfig {
    /// Create from a single total timeout. Connecting gets a quarter of it.
    pub fn from_total(total: Duration) -> Self {
        Self {
            connect: total / 4,
            total,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self::from_total(Duration::from_secs(10))
    }
}

/// Where a collaborator lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: Url,
    pub timeouts: TimeoutConfig,
}

impl Endpoint {
    pub fn new(url: &str, total: Duration) -> Result<Self, FetchError> {
        let url = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self {
            url,
            timeouts: TimeoutConfig::from_total(total),
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, FetchError> {
        Self::new(&config.url, config.timeout())
    }

    /// URL of a path below this endpoint, e.g. `create-payment-intent`.
    pub fn join(&self, path: &str) -> Result<Url, FetchError> {
        let mut base = self.url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| FetchError::InvalidUrl(format!("{path}: {e}")))
    }
}
