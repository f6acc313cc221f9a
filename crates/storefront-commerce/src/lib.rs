//! Storefront cart, shipping quotes and checkout.
//!
//! This crate holds the client-side commerce core:
//!
//! - **Cart**: line items merged by `(product, size, color)`, totals recomputed
//!   from scratch after every change, and an observable store for the UI
//! - **Shipping**: quote client with an input guard, stale-response rejection
//!   and a fail-open policy
//! - **Checkout**: the attempt state machine and the orchestrator that drives
//!   payment intent, confirmation (including redirects) and order persistence
//! - **Config**, admin **access** checks and entity change **feeds**
//!
//! Collaborators (shipping quotes, payments, orders) are async traits; HTTP
//! implementations live in `storefront-data`.
//!
//! # Example
//!
//! ```rust,ignore
//! use storefront_commerce::prelude::*;
//!
//! let cart = CartStore::new(Currency::USD);
//! cart.add_item(LineItemInput::new("p1", "Tee", Money::new(2000, Currency::USD)))?;
//!
//! let checkout = CheckoutOrchestrator::new(cart.clone(), payments, orders, config.checkout);
//! match checkout.submit(CheckoutForm::same_as_billing(billing), card).await? {
//!     CheckoutOutcome::Completed(receipt) => navigate(&receipt.confirmation_url),
//!     CheckoutOutcome::Redirect { url } => navigate(&url),
//!     failure => show_error(failure),
//! }
//! ```

pub mod access;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod feed;
pub mod ids;
pub mod money;
pub mod shipping;

pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Cart
    pub use crate::cart::{CartState, CartStore, LineItem, LineItemInput, LineItemKey};

    // Shipping
    pub use crate::shipping::{
        QuoteError, QuoteOutcome, ShippingQuote, ShippingQuoteClient, ShippingQuoteProvider,
        ShippingQuoteRequest, ShippingQuoteResponse,
    };

    // Checkout
    pub use crate::checkout::{
        Address, CheckoutError, CheckoutForm, CheckoutOrchestrator, CheckoutOutcome,
        CheckoutReceipt, CheckoutStage, ConfirmOutcome, OrderConfirmation, OrderDraft,
        OrderStore, OrderStoreError, PaymentError, PaymentGateway, PaymentReturn,
    };

    pub use crate::access::{AdminAccessChecker, EmailAllowList};
    pub use crate::config::{CheckoutConfig, ConfigError, ServiceConfig, StorefrontConfig};
    pub use crate::feed::{BroadcastFeed, ChangeEvent, ChangeFeed, Keyed};
}
