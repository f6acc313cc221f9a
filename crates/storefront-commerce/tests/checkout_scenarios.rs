//! End-to-end cart and checkout scenarios against in-memory collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use storefront_commerce::prelude::*;
use storefront_commerce::checkout::{ConfirmRequest, IntentRequest, OrderStatus, PaymentIntent};
use storefront_observability::AlertRecorder;
use tracing_subscriber::layer::SubscriberExt;

struct FixedQuote(f64);

#[async_trait]
impl ShippingQuoteProvider for FixedQuote {
    async fn quote(&self, _request: &ShippingQuoteRequest) -> Result<ShippingQuoteResponse, QuoteError> {
        Ok(ShippingQuoteResponse {
            shipping_cost: self.0,
            estimated_delivery: "3-5 business days".to_string(),
            method: "Standard".to_string(),
        })
    }
}

struct Gateway {
    decline: Option<String>,
    intents: Mutex<Vec<IntentRequest>>,
}

impl Gateway {
    fn approving() -> Arc<Self> {
        Arc::new(Self {
            decline: None,
            intents: Mutex::new(Vec::new()),
        })
    }

    fn declining(message: &str) -> Arc<Self> {
        Arc::new(Self {
            decline: Some(message.to_string()),
            intents: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PaymentGateway for Gateway {
    async fn create_intent(&self, request: &IntentRequest) -> Result<PaymentIntent, PaymentError> {
        self.intents.lock().unwrap().push(request.clone());
        Ok(PaymentIntent {
            client_secret: "pi_42_secret_x".to_string(),
            intent_id: PaymentIntentId::new("pi_42"),
        })
    }

    async fn confirm(&self, request: &ConfirmRequest) -> Result<ConfirmOutcome, PaymentError> {
        assert_eq!(request.client_secret, "pi_42_secret_x");
        match &self.decline {
            Some(message) => Err(PaymentError::Declined {
                message: message.clone(),
            }),
            None => Ok(ConfirmOutcome::Succeeded(PaymentReference::new("pi_42"))),
        }
    }
}

struct Orders {
    fail: bool,
    drafts: Mutex<Vec<OrderDraft>>,
}

impl Orders {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            fail,
            drafts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl OrderStore for Orders {
    async fn create_order(&self, draft: &OrderDraft) -> Result<OrderConfirmation, OrderStoreError> {
        self.drafts.lock().unwrap().push(draft.clone());
        if self.fail {
            return Err(OrderStoreError::Rejected {
                status: 500,
                message: "database unavailable".to_string(),
            });
        }
        Ok(OrderConfirmation {
            order_id: OrderId::new("ord_1"),
            order_number: Some("1001".to_string()),
            status: OrderStatus::Pending,
        })
    }
}

fn billing() -> Address {
    Address::new(
        "Jane Smith",
        "jane@example.com",
        "456 Oak Ave",
        "Los Angeles",
        "CA",
        "90001",
        "US",
    )
}

fn tee() -> LineItemInput {
    LineItemInput::new("p1", "Tee", Money::from_decimal(20.00, Currency::USD))
}

/// Cart with p1 x2 and a 5.00 quote applied: total 45.00.
async fn cart_at_45() -> CartStore {
    let cart = CartStore::new(Currency::USD);
    cart.add_item(tee()).unwrap();
    cart.add_item(tee()).unwrap();

    let quotes = ShippingQuoteClient::new(Arc::new(FixedQuote(5.00)), cart.clone());
    let items = cart.snapshot().items().to_vec();
    assert!(matches!(quotes.quote(&billing(), &items).await, QuoteOutcome::Applied(_)));

    assert_eq!(cart.snapshot().total().amount_cents, 4500);
    cart
}

fn orchestrator(cart: &CartStore, gateway: Arc<Gateway>, orders: Arc<Orders>) -> CheckoutOrchestrator {
    CheckoutOrchestrator::new(cart.clone(), gateway, orders, CheckoutConfig::default())
}

fn card() -> PaymentMethodToken {
    PaymentMethodToken::new("pm_card_visa")
}

#[test]
fn test_scenario_a_cart_totals() {
    let cart = CartStore::new(Currency::USD);
    cart.add_item(tee()).unwrap();
    cart.add_item(tee()).unwrap();

    let state = cart.snapshot();
    assert_eq!(state.items().len(), 1);
    assert_eq!(state.items()[0].quantity, 2);
    assert_eq!(state.subtotal(), Money::new(4000, Currency::USD));

    cart.update_shipping(Money::from_decimal(5.00, Currency::USD)).unwrap();
    assert_eq!(cart.snapshot().total(), Money::new(4500, Currency::USD));

    cart.clear();
    let state = cart.snapshot();
    assert_eq!(state.subtotal().amount_cents, 0);
    assert_eq!(state.shipping_cost().amount_cents, 0);
    assert_eq!(state.total().amount_cents, 0);

    cart.clear();
    assert_eq!(cart.snapshot(), state);
}

#[tokio::test]
async fn test_scenario_b_happy_path() {
    let cart = cart_at_45().await;
    let gateway = Gateway::approving();
    let orders = Orders::new(false);
    let checkout = orchestrator(&cart, gateway.clone(), orders.clone());

    let outcome = checkout
        .submit(CheckoutForm::same_as_billing(billing()), card())
        .await
        .unwrap();

    assert!(matches!(outcome, CheckoutOutcome::Completed(ref r) if r.soft_failure.is_none()));
    assert_eq!(checkout.stage(), CheckoutStage::Success);
    assert!(cart.snapshot().is_empty());

    assert_eq!(gateway.intents.lock().unwrap()[0].amount, 4500);
    let drafts = orders.drafts.lock().unwrap();
    assert_eq!(drafts[0].total.amount_cents, 4500);
    assert_eq!(drafts[0].shipping_cost.amount_cents, 500);
    assert_eq!(drafts[0].shipping_address, billing());
    assert_eq!(drafts[0].payment_reference.as_str(), "pi_42");
}

#[tokio::test]
async fn test_scenario_c_payment_failure_keeps_cart() {
    let cart = cart_at_45().await;
    let orders = Orders::new(false);
    let checkout = orchestrator(&cart, Gateway::declining("Your card has insufficient funds."), orders.clone());

    let outcome = checkout
        .submit(CheckoutForm::same_as_billing(billing()), card())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        CheckoutOutcome::PaymentFailed {
            message: "Your card has insufficient funds.".to_string()
        }
    );
    assert_eq!(checkout.stage(), CheckoutStage::FailedPayment);
    assert_eq!(checkout.last_error().as_deref(), Some("Your card has insufficient funds."));

    let state = cart.snapshot();
    assert_eq!(state.items().len(), 1);
    assert_eq!(state.items()[0].quantity, 2);
    assert!(orders.drafts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_scenario_d_order_failure_is_soft() {
    let recorder = AlertRecorder::new();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    let _default = tracing::subscriber::set_default(subscriber);

    let cart = cart_at_45().await;
    let checkout = orchestrator(&cart, Gateway::approving(), Orders::new(true));

    let outcome = checkout
        .submit(CheckoutForm::same_as_billing(billing()), card())
        .await
        .unwrap();

    let CheckoutOutcome::Completed(receipt) = outcome else {
        panic!("order failure after payment must still complete");
    };
    assert!(receipt.order.is_none());
    let soft = receipt.soft_failure.expect("soft failure flagged");
    assert!(soft.message.contains("pi_42"));
    assert_eq!(receipt.confirmation_url, "/checkout/success?payment=pi_42");

    assert_eq!(checkout.stage(), CheckoutStage::Success);
    assert!(cart.snapshot().is_empty());

    let alerts = recorder.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].field("payment_reference"), Some("pi_42"));
    assert!(alerts[0].field("error").unwrap().contains("database unavailable"));
}

#[tokio::test]
async fn test_validation_failure_names_address() {
    let cart = cart_at_45().await;
    let gateway = Gateway::approving();
    let checkout = orchestrator(&cart, gateway.clone(), Orders::new(false));

    let mut shipping = billing();
    shipping.postal_code.clear();
    let outcome = checkout
        .submit(CheckoutForm::with_shipping(billing(), shipping), card())
        .await
        .unwrap();

    let CheckoutOutcome::ValidationFailed { message } = outcome else {
        panic!("expected validation failure");
    };
    assert!(message.contains("Shipping address"));
    assert!(message.contains("postal code"));
    assert_eq!(checkout.stage(), CheckoutStage::FailedValidation);
    assert!(gateway.intents.lock().unwrap().is_empty());
    assert_eq!(cart.snapshot().item_count(), 2);
}
