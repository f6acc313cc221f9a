//! Order types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::{CartState, LineItem};
use crate::checkout::{Address, CheckoutForm};
use crate::ids::{CheckoutId, OrderId, PaymentReference};
use crate::money::{Currency, Money};

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order placed, awaiting processing.
    #[default]
    Pending,
    /// Order being prepared.
    Processing,
    /// Order shipped.
    Shipped,
    /// Order delivered.
    Delivered,
    /// Order cancelled.
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Label and tone for status badges.
    pub fn badge(&self) -> StatusBadge {
        let (label, tone) = match self {
            OrderStatus::Pending => ("Pending", BadgeTone::Warning),
            OrderStatus::Processing => ("Processing", BadgeTone::Info),
            OrderStatus::Shipped => ("Shipped", BadgeTone::Accent),
            OrderStatus::Delivered => ("Delivered", BadgeTone::Success),
            OrderStatus::Cancelled => ("Cancelled", BadgeTone::Danger),
        };
        StatusBadge { label, tone }
    }

    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

/// Display treatment of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StatusBadge {
    pub label: &'static str,
    pub tone: BadgeTone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeTone {
    Info,
    Accent,
    Success,
    Warning,
    Danger,
}

/// Order record submitted after a confirmed payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub checkout_id: CheckoutId,
    pub line_items: Vec<LineItem>,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub currency: Currency,
    pub billing_address: Address,
    /// Resolved destination, never the mirror flag.
    pub shipping_address: Address,
    pub payment_reference: PaymentReference,
    pub created_at: DateTime<Utc>,
}

impl OrderDraft {
    /// Build from the cart as it stands and the submitted form.
    pub fn new(
        checkout_id: CheckoutId,
        cart: &CartState,
        form: &CheckoutForm,
        payment_reference: PaymentReference,
    ) -> Self {
        Self {
            checkout_id,
            line_items: cart.items().to_vec(),
            subtotal: cart.subtotal(),
            shipping_cost: cart.shipping_cost(),
            total: cart.total(),
            currency: cart.currency(),
            billing_address: form.billing.clone(),
            shipping_address: form.effective_shipping().clone(),
            payment_reference,
            created_at: Utc::now(),
        }
    }

    /// Get total item count.
    pub fn item_count(&self) -> u64 {
        self.line_items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

/// What the order store hands back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_id: OrderId,
    /// Human-readable order number, when the store assigns one.
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
}

/// Order persistence errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderStoreError {
    #[error("Order service unreachable: {0}")]
    Transport(String),

    #[error("Order service rejected the order ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid order service response: {0}")]
    InvalidResponse(String),
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Record an order for a confirmed payment.
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderConfirmation, OrderStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::LineItemInput;

    #[test]
    fn test_badges() {
        assert_eq!(OrderStatus::Pending.badge().label, "Pending");
        assert_eq!(OrderStatus::Pending.badge().tone, BadgeTone::Warning);
        assert_eq!(OrderStatus::Cancelled.badge().tone, BadgeTone::Danger);
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn test_draft_resolves_shipping_address() {
        let mut cart = CartState::new(Currency::USD);
        let input = LineItemInput::new("p1", "Tee", Money::new(2000, Currency::USD));
        cart.add_item(input.clone()).unwrap();
        cart.add_item(input).unwrap();
        cart.update_shipping(Money::new(500, Currency::USD)).unwrap();

        let billing = Address::new("Jo", "jo@example.com", "1 Main St", "Austin", "TX", "78701", "US");
        let form = CheckoutForm::same_as_billing(billing.clone());
        let draft = OrderDraft::new(CheckoutId::new("co_1"), &cart, &form, PaymentReference::new("pi_1"));

        assert_eq!(draft.shipping_address, billing);
        assert_eq!(draft.subtotal.amount_cents, 4000);
        assert_eq!(draft.total.amount_cents, 4500);
        assert_eq!(draft.item_count(), 2);

        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["paymentReference"], "pi_1");
        assert_eq!(json["shippingCost"]["amount_cents"], 500);
    }

    #[test]
    fn test_confirmation_defaults() {
        let confirmation: OrderConfirmation = serde_json::from_str(r#"{"orderId":"ord_1"}"#).unwrap();
        assert_eq!(confirmation.order_id.as_str(), "ord_1");
        assert!(confirmation.order_number.is_none());
        assert_eq!(confirmation.status, OrderStatus::Pending);
    }
}
