//! Checkout attempt state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::CartState;
use crate::checkout::Address;
use crate::ids::{CheckoutId, PaymentIntentId};

/// Stages of a checkout attempt.
///
/// ```text
/// Idle -> ValidatingAddresses -> AwaitingPaymentIntent -> ConfirmingPayment -> PersistingOrder -> Success
///              |                        |                        |
///              v                        v                        v
///      FailedValidation               Idle                 FailedPayment
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    /// Form is editable.
    #[default]
    Idle,
    ValidatingAddresses,
    AwaitingPaymentIntent,
    /// Waiting on the processor. May span a browser redirect.
    ConfirmingPayment,
    PersistingOrder,
    Success,
    /// Address or cart check failed; the customer edits and resubmits.
    FailedValidation,
    /// Processor rejected the charge; the customer edits and resubmits.
    FailedPayment,
}

impl CheckoutStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStage::Idle => "idle",
            CheckoutStage::ValidatingAddresses => "validating_addresses",
            CheckoutStage::AwaitingPaymentIntent => "awaiting_payment_intent",
            CheckoutStage::ConfirmingPayment => "confirming_payment",
            CheckoutStage::PersistingOrder => "persisting_order",
            CheckoutStage::Success => "success",
            CheckoutStage::FailedValidation => "failed_validation",
            CheckoutStage::FailedPayment => "failed_payment",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CheckoutStage::Idle => "Ready",
            CheckoutStage::ValidatingAddresses => "Checking your details",
            CheckoutStage::AwaitingPaymentIntent => "Preparing payment",
            CheckoutStage::ConfirmingPayment => "Confirming payment",
            CheckoutStage::PersistingOrder => "Placing order",
            CheckoutStage::Success => "Order placed",
            CheckoutStage::FailedValidation => "Details incomplete",
            CheckoutStage::FailedPayment => "Payment failed",
        }
    }

    /// Check if the attempt has stopped moving on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CheckoutStage::Success | CheckoutStage::FailedValidation | CheckoutStage::FailedPayment
        )
    }

    /// Check if a new submission may start from this stage.
    pub fn accepts_submission(&self) -> bool {
        matches!(
            self,
            CheckoutStage::Idle | CheckoutStage::FailedValidation | CheckoutStage::FailedPayment
        )
    }
}

impl std::fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The addresses entered on the checkout form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    pub billing: Address,
    /// Ignored while `shipping_same_as_billing` is set.
    pub shipping: Address,
    pub shipping_same_as_billing: bool,
}

impl Default for CheckoutForm {
    fn default() -> Self {
        Self {
            billing: Address::default(),
            shipping: Address::default(),
            shipping_same_as_billing: true,
        }
    }
}

impl CheckoutForm {
    /// Form whose shipping address mirrors billing.
    pub fn same_as_billing(billing: Address) -> Self {
        Self {
            billing,
            shipping: Address::default(),
            shipping_same_as_billing: true,
        }
    }

    /// Form with a separate shipping address.
    pub fn with_shipping(billing: Address, shipping: Address) -> Self {
        Self {
            billing,
            shipping,
            shipping_same_as_billing: false,
        }
    }

    /// The address goods ship to.
    pub fn effective_shipping(&self) -> &Address {
        if self.shipping_same_as_billing {
            &self.billing
        } else {
            &self.shipping
        }
    }

    /// Check the form and cart are ready to pay for.
    ///
    /// The error is a customer-facing message naming what is incomplete.
    pub fn validate(&self, cart: &CartState) -> Result<(), String> {
        if cart.is_empty() {
            return Err("Your cart is empty".to_string());
        }

        let missing = self.billing.missing_fields();
        if !missing.is_empty() {
            return Err(format!(
                "Billing address is incomplete: missing {}",
                missing.join(", ")
            ));
        }

        if !self.shipping_same_as_billing {
            let missing = self.shipping.missing_fields();
            if !missing.is_empty() {
                return Err(format!(
                    "Shipping address is incomplete: missing {}",
                    missing.join(", ")
                ));
            }
        }

        Ok(())
    }
}

/// A payment waiting on confirmation, possibly across a redirect.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingPayment {
    pub intent_id: PaymentIntentId,
    pub client_secret: String,
    /// Form the payment was submitted with.
    pub form: CheckoutForm,
    /// Cart as validated and charged.
    pub cart: CartState,
}

/// Local state of one checkout attempt. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutAttempt {
    pub id: CheckoutId,
    pub stage: CheckoutStage,
    pub form: CheckoutForm,
    /// Message shown next to the form.
    pub last_error: Option<String>,
    /// Number of submissions so far, including the one in flight.
    pub submissions: u32,
    pub pending: Option<PendingPayment>,
    pub created_at: DateTime<Utc>,
}

impl CheckoutAttempt {
    /// Start a fresh attempt.
    pub fn new() -> Self {
        Self {
            id: CheckoutId::generate(),
            stage: CheckoutStage::Idle,
            form: CheckoutForm::default(),
            last_error: None,
            submissions: 0,
            pending: None,
            created_at: Utc::now(),
        }
    }

    /// Move to `stage`, clearing the error unless the stage is a failure.
    pub(crate) fn enter(&mut self, stage: CheckoutStage) {
        tracing::info!(checkout_id = %self.id, from = %self.stage, to = %stage, "checkout stage");
        self.stage = stage;
        if stage != CheckoutStage::FailedValidation && stage != CheckoutStage::FailedPayment {
            self.last_error = None;
        }
    }

    /// Move to `stage` and record a customer-facing error.
    pub(crate) fn fail(&mut self, stage: CheckoutStage, message: impl Into<String>) {
        self.enter(stage);
        self.last_error = Some(message.into());
    }
}

impl Default for CheckoutAttempt {
    fn default() -> Self {
        Self::new()
    }
}
