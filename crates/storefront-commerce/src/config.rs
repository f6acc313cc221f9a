//! Storefront configuration.
//!
//! Loaded from TOML (or JSON, by file extension). Every section has defaults,
//! and `[environments.<name>]` tables replace whole sections for one
//! environment:
//!
//! ```toml
//! [checkout]
//! currency = "USD"
//! return_url = "https://shop.example.com/checkout/complete"
//!
//! [payment]
//! url = "https://api.example.com/payments"
//!
//! [environments.staging.payment]
//! url = "https://staging.example.com/payments"
//! timeout_ms = 20000
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use storefront_observability::LoggingConfig;
use thiserror::Error;
use url::Url;

use crate::access::EmailAllowList;
use crate::money::Currency;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub checkout: CheckoutConfig,

    #[serde(default = "ServiceConfig::shipping")]
    pub shipping: ServiceConfig,

    #[serde(default = "ServiceConfig::payment")]
    pub payment: ServiceConfig,

    #[serde(default = "ServiceConfig::orders")]
    pub orders: ServiceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    /// Environment-specific overrides.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentConfig>,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            checkout: CheckoutConfig::default(),
            shipping: ServiceConfig::shipping(),
            payment: ServiceConfig::payment(),
            orders: ServiceConfig::orders(),
            logging: LoggingConfig::default(),
            admin: AdminConfig::default(),
            environments: HashMap::new(),
        }
    }
}

impl StorefrontConfig {
    /// Load config from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        let config = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: display,
                message: e.to_string(),
            })?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: display,
                message: e.to_string(),
            })?
        };

        tracing::debug!(path = %path.display(), "loaded storefront config");
        Ok(config)
    }

    /// Parse TOML from a string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Get environment-specific config.
    pub fn for_environment(&self, env: &str) -> StorefrontConfig {
        let mut config = self.clone();

        if let Some(overrides) = self.environments.get(env) {
            if let Some(ref checkout) = overrides.checkout {
                config.checkout = checkout.clone();
            }
            if let Some(ref shipping) = overrides.shipping {
                config.shipping = shipping.clone();
            }
            if let Some(ref payment) = overrides.payment {
                config.payment = payment.clone();
            }
            if let Some(ref orders) = overrides.orders {
                config.orders = orders.clone();
            }
            if let Some(ref logging) = overrides.logging {
                config.logging = logging.clone();
            }
        } else {
            tracing::warn!(env, "no overrides for environment, using base config");
        }

        config
    }

    /// Check URLs and timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.checkout.return_url).map_err(|e| {
            ConfigError::Invalid(format!("checkout.return_url `{}`: {e}", self.checkout.return_url))
        })?;
        if !self.checkout.confirmation_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "checkout.confirmation_path `{}` must start with `/`",
                self.checkout.confirmation_path
            )));
        }

        for (name, service) in [
            ("shipping", &self.shipping),
            ("payment", &self.payment),
            ("orders", &self.orders),
        ] {
            Url::parse(&service.url)
                .map_err(|e| ConfigError::Invalid(format!("{name}.url `{}`: {e}", service.url)))?;
            if service.timeout_ms == 0 {
                return Err(ConfigError::Invalid(format!("{name}.timeout_ms must be positive")));
            }
        }

        Ok(())
    }
}

/// Checkout settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutConfig {
    /// Cart currency.
    #[serde(default)]
    pub currency: Currency,

    /// Where redirect-based payment methods send the browser back to.
    #[serde(default = "default_return_url")]
    pub return_url: String,

    /// Path of the order confirmation view.
    #[serde(default = "default_confirmation_path")]
    pub confirmation_path: String,
}

fn default_return_url() -> String {
    "http://localhost:3000/checkout/complete".to_string()
}

fn default_confirmation_path() -> String {
    "/checkout/success".to_string()
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            return_url: default_return_url(),
            confirmation_path: default_confirmation_path(),
        }
    }
}

/// Location and timeout of one HTTP collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    pub url: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl ServiceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn shipping() -> Self {
        Self::new("http://localhost:3000/api/shipping/calculate")
    }

    fn payment() -> Self {
        Self::new("http://localhost:3000/api/payments")
    }

    fn orders() -> Self {
        Self::new("http://localhost:3000/api/orders")
    }
}

/// Admin settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdminConfig {
    /// Emails allowed into the admin views.
    #[serde(default)]
    pub emails: Vec<String>,
}

impl AdminConfig {
    /// Build the access checker for the admin views.
    pub fn allow_list(&self) -> EmailAllowList {
        EmailAllowList::new(&self.emails)
    }
}

/// Per-environment overrides. A present section replaces the base one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout: Option<CheckoutConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping: Option<ServiceConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<ServiceConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders: Option<ServiceConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}
