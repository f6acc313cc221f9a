//! Shipping quotes.
//!
//! Contains the quote service wire types, the provider seam, and the client
//! that keeps the cart's shipping cost in step with the destination.

mod client;
mod quote;

pub use client::{QuoteOutcome, ShippingQuoteClient};
pub use quote::{
    QuoteAddress, QuoteError, QuoteItem, ShippingQuote, ShippingQuoteProvider,
    ShippingQuoteRequest, ShippingQuoteResponse,
};
