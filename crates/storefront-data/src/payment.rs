//! HTTP payment gateway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storefront_commerce::checkout::{
    ConfirmOutcome, ConfirmRequest, IntentMetadata, IntentRequest, PaymentError, PaymentGateway,
    PaymentIntent,
};
use storefront_commerce::ids::PaymentReference;

use crate::client::{FetchError, JsonClient};
use crate::endpoint::Endpoint;

const CREATE_INTENT_PATH: &str = "create-payment-intent";
const CONFIRM_PATH: &str = "confirm-payment";

/// Talks to the payment backend under one base URL.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    client: JsonClient,
}

impl HttpPaymentGateway {
    pub fn new(base: Endpoint) -> Result<Self, FetchError> {
        Ok(Self {
            client: JsonClient::new(base)?,
        })
    }
}

/// Create-intent body. The processor wants lowercase currency codes.
#[derive(Debug, Serialize)]
struct CreateIntentBody<'a> {
    amount: i64,
    currency: String,
    metadata: &'a IntentMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ConfirmResponse {
    #[serde(rename_all = "camelCase")]
    Succeeded { payment_reference: PaymentReference },
    #[serde(rename_all = "camelCase")]
    RequiresAction { redirect_url: String },
}

impl From<ConfirmResponse> for ConfirmOutcome {
    fn from(response: ConfirmResponse) -> Self {
        match response {
            ConfirmResponse::Succeeded { payment_reference } => {
                ConfirmOutcome::Succeeded(payment_reference)
            }
            ConfirmResponse::RequiresAction { redirect_url } => {
                ConfirmOutcome::RequiresRedirect { url: redirect_url }
            }
        }
    }
}

impl From<FetchError> for PaymentError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Http {
                message: Some(message),
                ..
            } => PaymentError::Declined { message },
            FetchError::Http { status, .. } => PaymentError::Status(status),
            FetchError::Deserialization(message) => PaymentError::InvalidResponse(message),
            other => PaymentError::Transport(other.to_string()),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, PaymentError> {
        let body = CreateIntentBody {
            amount: request.amount,
            currency: request.currency.processor_code(),
            metadata: &request.metadata,
        };
        Ok(self.client.post_to(CREATE_INTENT_PATH, &body).await?)
    }

    async fn confirm(&self, request: &ConfirmRequest) -> Result<ConfirmOutcome, PaymentError> {
        let response: ConfirmResponse = self.client.post_to(CONFIRM_PATH, request).await?;
        Ok(response.into())
    }
}
