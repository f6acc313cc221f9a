//! Payment collaborator seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::ids::{CheckoutId, PaymentIntentId, PaymentMethodToken, PaymentReference};
use crate::money::Currency;

/// Request to create a payment intent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntentRequest {
    /// Amount in minor units.
    pub amount: i64,
    pub currency: Currency,
    /// Attempt bookkeeping for the processor dashboard. Not an idempotency key:
    /// every submission creates a new intent.
    pub metadata: IntentMetadata,
}

/// Metadata attached to a payment intent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntentMetadata {
    pub checkout_id: CheckoutId,
    /// 1 for the first submission of an attempt, 2 for the next, and so on.
    pub submission: u32,
}

/// A created payment intent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub client_secret: String,
    pub intent_id: PaymentIntentId,
}

/// Request to confirm a payment intent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub client_secret: String,
    pub payment_method: PaymentMethodToken,
    /// Where redirect-based methods send the browser afterwards.
    pub return_url: String,
}

/// Result of a confirmation call that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    /// Charge confirmed.
    Succeeded(PaymentReference),
    /// The customer must complete an action (e.g., 3-D Secure) at `url`.
    /// Control comes back through the return URL.
    RequiresRedirect { url: String },
}

/// Payment collaborator errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PaymentError {
    /// Processor rejected the payment; `message` is meant for the customer.
    #[error("{message}")]
    Declined { message: String },

    #[error("Payment service unreachable: {0}")]
    Transport(String),

    #[error("Payment service returned status {0}")]
    Status(u16),

    #[error("Invalid payment service response: {0}")]
    InvalidResponse(String),
}

/// Payment processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a new intent for the given amount.
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, PaymentError>;

    /// Confirm an intent with the customer's payment method.
    async fn confirm(&self, request: &ConfirmRequest) -> Result<ConfirmOutcome, PaymentError>;
}

/// Status reported on the return URL after a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectStatus {
    Succeeded,
    /// Accepted by the processor, settlement still pending.
    Processing,
    Failed,
}

impl RedirectStatus {
    fn parse(value: &str) -> Self {
        match value {
            "succeeded" => Self::Succeeded,
            "processing" => Self::Processing,
            _ => Self::Failed,
        }
    }

    /// Whether the charge went through (or will settle without the customer).
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Processing)
    }
}

/// Parameters the processor appends to the return URL.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReturn {
    pub intent_id: PaymentIntentId,
    pub client_secret: Option<String>,
    pub status: RedirectStatus,
}

/// Errors parsing a return URL.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PaymentReturnError {
    #[error("Invalid return URL: {0}")]
    InvalidUrl(String),

    #[error("Return URL is missing `{0}`")]
    MissingParameter(&'static str),
}

impl PaymentReturn {
    /// Parse `?payment_intent=...&payment_intent_client_secret=...&redirect_status=...`.
    pub fn from_return_url(return_url: &str) -> Result<Self, PaymentReturnError> {
        let url = Url::parse(return_url).map_err(|e| PaymentReturnError::InvalidUrl(e.to_string()))?;

        let mut intent_id = None;
        let mut client_secret = None;
        let mut status = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "payment_intent" => intent_id = Some(PaymentIntentId::new(value.into_owned())),
                "payment_intent_client_secret" => client_secret = Some(value.into_owned()),
                "redirect_status" => status = Some(RedirectStatus::parse(&value)),
                _ => {}
            }
        }

        Ok(Self {
            intent_id: intent_id.ok_or(PaymentReturnError::MissingParameter("payment_intent"))?,
            client_secret,
            status: status.ok_or(PaymentReturnError::MissingParameter("redirect_status"))?,
        })
    }
}
