//! HTTP shipping quote provider.

use async_trait::async_trait;
use storefront_commerce::shipping::{
    QuoteError, ShippingQuoteProvider, ShippingQuoteRequest, ShippingQuoteResponse,
};

use crate::client::{FetchError, JsonClient};
use crate::endpoint::Endpoint;

/// Quotes shipping by POSTing to the quote endpoint.
#[derive(Debug, Clone)]
pub struct HttpShippingQuoteProvider {
    client: JsonClient,
}

impl HttpShippingQuoteProvider {
    pub fn new(endpoint: Endpoint) -> Result<Self, FetchError> {
        Ok(Self {
            client: JsonClient::new(endpoint)?,
        })
    }
}

impl From<FetchError> for QuoteError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Http { status, .. } => QuoteError::Status(status),
            FetchError::Deserialization(message) => QuoteError::InvalidResponse(message),
            other => QuoteError::Transport(other.to_string()),
        }
    }
}

#[async_trait]
impl ShippingQuoteProvider for HttpShippingQuoteProvider {
    async fn quote(&self, request: &ShippingQuoteRequest) -> Result<ShippingQuoteResponse, QuoteError> {
        Ok(self.client.post(request).await?)
    }
}
