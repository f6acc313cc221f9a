//! HTTP order store.

use async_trait::async_trait;
use storefront_commerce::checkout::{OrderConfirmation, OrderDraft, OrderStore, OrderStoreError};

use crate::client::{FetchError, JsonClient};
use crate::endpoint::Endpoint;

/// Records orders by POSTing the draft to the orders endpoint.
#[derive(Debug, Clone)]
pub struct HttpOrderStore {
    client: JsonClient,
}

impl HttpOrderStore {
    pub fn new(endpoint: Endpoint) -> Result<Self, FetchError> {
        Ok(Self {
            client: JsonClient::new(endpoint)?,
        })
    }
}

impl From<FetchError> for OrderStoreError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Http {
                status, message, ..
            } => OrderStoreError::Rejected {
                status,
                message: message.unwrap_or_else(|| "no error message".to_string()),
            },
            FetchError::Deserialization(message) => OrderStoreError::InvalidResponse(message),
            other => OrderStoreError::Transport(other.to_string()),
        }
    }
}

#[async_trait]
impl OrderStore for HttpOrderStore {
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderConfirmation, OrderStoreError> {
        let confirmation: OrderConfirmation = self.client.post(draft).await?;
        tracing::debug!(
            checkout_id = %draft.checkout_id,
            order_id = %confirmation.order_id,
            "order stored"
        );
        Ok(confirmation)
    }
}
