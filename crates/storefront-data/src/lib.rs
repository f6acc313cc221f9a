//! HTTP adapters for the storefront's checkout collaborators.
//!
//! Provides:
//! - JSON-over-HTTP client with per-endpoint timeouts
//! - Shipping quote provider
//! - Payment gateway (intent creation and confirmation)
//! - Order store

mod client;
mod endpoint;
mod orders;
mod payment;
mod shipping;

#[cfg(test)]
mod test_server;

use std::sync::Arc;

use storefront_commerce::checkout::{OrderStore, PaymentGateway};
use storefront_commerce::config::StorefrontConfig;
use storefront_commerce::shipping::ShippingQuoteProvider;

pub use client::{FetchError, JsonClient};
pub use endpoint::{Endpoint, TimeoutConfig};
pub use orders::HttpOrderStore;
pub use payment::HttpPaymentGateway;
pub use shipping::HttpShippingQuoteProvider;

/// The three collaborators, ready to hand to the commerce core.
#[derive(Clone)]
pub struct Collaborators {
    pub shipping: Arc<dyn ShippingQuoteProvider>,
    pub payments: Arc<dyn PaymentGateway>,
    pub orders: Arc<dyn OrderStore>,
}

impl Collaborators {
    /// Build HTTP collaborators from the `[shipping]`, `[payment]` and `[orders]` sections.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self, FetchError> {
        Ok(Self {
            shipping: Arc::new(HttpShippingQuoteProvider::new(Endpoint::from_config(
                &config.shipping,
            )?)?),
            payments: Arc::new(HttpPaymentGateway::new(Endpoint::from_config(&config.payment)?)?),
            orders: Arc::new(HttpOrderStore::new(Endpoint::from_config(&config.orders)?)?),
        })
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
