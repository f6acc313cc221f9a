//! Shipping quote wire types and the collaborator seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::LineItem;
use crate::checkout::Address;
use crate::ids::ProductId;
use crate::money::{Currency, Money};

/// Destination fields sent to the quote service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteAddress {
    pub line1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// Minimal item projection sent to the quote service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItem {
    pub id: ProductId,
    pub quantity: u32,
    /// Unit price in major units (e.g., 19.99).
    pub unit_price: f64,
}

/// Request body for a shipping quote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingQuoteRequest {
    pub address: QuoteAddress,
    pub items: Vec<QuoteItem>,
}

impl ShippingQuoteRequest {
    /// Build a request for a destination and the current cart lines.
    pub fn new(destination: &Address, items: &[LineItem]) -> Self {
        Self {
            address: QuoteAddress {
                line1: destination.line1.clone(),
                city: destination.city.clone(),
                state: destination.state.clone(),
                postal_code: destination.postal_code.clone(),
                country: destination.country.clone(),
            },
            items: items
                .iter()
                .map(|item| QuoteItem {
                    id: item.product_id.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price.to_decimal(),
                })
                .collect(),
        }
    }
}

/// Successful response body from the quote service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuoteResponse {
    /// Cost in major units, same currency as the cart.
    pub shipping_cost: f64,
    #[serde(default)]
    pub estimated_delivery: String,
    #[serde(default)]
    pub method: String,
}

impl ShippingQuoteResponse {
    /// Convert into a quote in the cart's currency.
    ///
    /// Costs that are not finite or are negative are rejected.
    pub fn into_quote(self, currency: Currency) -> Result<ShippingQuote, QuoteError> {
        if !self.shipping_cost.is_finite() || self.shipping_cost < 0.0 {
            return Err(QuoteError::InvalidResponse(format!(
                "shipping cost {} is not a valid amount",
                self.shipping_cost
            )));
        }

        Ok(ShippingQuote {
            cost: Money::from_decimal(self.shipping_cost, currency),
            estimated_delivery: self.estimated_delivery,
            method: self.method,
        })
    }
}

/// A validated shipping quote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuote {
    pub cost: Money,
    pub estimated_delivery: String,
    pub method: String,
}

impl ShippingQuote {
    /// Check if this is free shipping.
    pub fn is_free(&self) -> bool {
        self.cost.is_zero()
    }
}

/// Errors from the shipping quote service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QuoteError {
    #[error("Shipping quote request failed: {0}")]
    Transport(String),

    #[error("Shipping quote service returned status {0}")]
    Status(u16),

    #[error("Invalid shipping quote response: {0}")]
    InvalidResponse(String),
}

/// Shipping quote service.
#[async_trait]
pub trait ShippingQuoteProvider: Send + Sync {
    /// Quote shipping for a destination and item set.
    async fn quote(&self, request: &ShippingQuoteRequest)
        -> Result<ShippingQuoteResponse, QuoteError>;
}
