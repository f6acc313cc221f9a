//! Checkout orchestration.
//!
//! Drives one [`CheckoutAttempt`] at a time through validation, payment
//! intent creation, payment confirmation and order persistence. Payment
//! failures block; an order-persistence failure after a confirmed charge does
//! not, and is raised as a support alert instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use storefront_observability::ALERT_TARGET;
use thiserror::Error;
use url::form_urlencoded;

use crate::cart::{CartState, CartStore};
use crate::checkout::{
    CheckoutAttempt, CheckoutForm, CheckoutStage, ConfirmOutcome, ConfirmRequest, IntentMetadata,
    IntentRequest, OrderConfirmation, OrderDraft, OrderStore, OrderStoreError, PaymentGateway,
    PaymentReturn, PendingPayment,
};
use crate::config::CheckoutConfig;
use crate::ids::{CheckoutId, PaymentMethodToken, PaymentReference};

/// Guard violations. Stage failures are reported as [`CheckoutOutcome`]s.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("A checkout submission is already in progress")]
    InFlight,

    #[error("This checkout has already completed")]
    AlreadyCompleted,

    #[error("Payment is waiting on customer action")]
    AwaitingRedirect,

    #[error("No payment is waiting to be confirmed")]
    NoPendingPayment,
}

/// How a submission (or resumption) ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// Order placed and cart cleared. Check the receipt for a soft failure.
    Completed(CheckoutReceipt),
    /// Send the browser to `url`; control comes back through [`CheckoutOrchestrator::resume`].
    Redirect { url: String },
    ValidationFailed { message: String },
    /// Could not start a payment. The form is editable again.
    PaymentIntentFailed { message: String },
    /// The processor's message, verbatim.
    PaymentFailed { message: String },
}

/// Non-blocking notice that the order record could not be saved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoftFailure {
    /// Customer-facing notice.
    pub message: String,
    #[serde(skip)]
    pub error: OrderStoreError,
}

/// Result of a completed checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    pub checkout_id: CheckoutId,
    pub payment_reference: PaymentReference,
    /// `None` when the order store failed.
    pub order: Option<OrderConfirmation>,
    pub soft_failure: Option<SoftFailure>,
    /// Where to navigate next.
    pub confirmation_url: String,
}

/// Runs checkout attempts against the cart and the payment and order collaborators.
pub struct CheckoutOrchestrator {
    cart: CartStore,
    payments: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderStore>,
    config: CheckoutConfig,
    attempt: Mutex<CheckoutAttempt>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when a submission ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, CheckoutError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| CheckoutError::InFlight)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CheckoutOrchestrator {
    /// Create an orchestrator with a fresh attempt.
    pub fn new(
        cart: CartStore,
        payments: Arc<dyn PaymentGateway>,
        orders: Arc<dyn OrderStore>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            cart,
            payments,
            orders,
            config,
            attempt: Mutex::new(CheckoutAttempt::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn stage(&self) -> CheckoutStage {
        self.lock_attempt().stage
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock_attempt().last_error.clone()
    }

    /// Clone of the current attempt.
    pub fn attempt(&self) -> CheckoutAttempt {
        self.lock_attempt().clone()
    }

    /// Check if a submission or resumption is running.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit the checkout form.
    ///
    /// Every submission creates a new payment intent, even after a failed
    /// payment on the same attempt.
    pub async fn submit(
        &self,
        form: CheckoutForm,
        payment_method: PaymentMethodToken,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let (checkout_id, submission) = {
            let mut attempt = self.lock_attempt();
            match attempt.stage {
                CheckoutStage::Success => return Err(CheckoutError::AlreadyCompleted),
                CheckoutStage::ConfirmingPayment if attempt.pending.is_some() => {
                    return Err(CheckoutError::AwaitingRedirect)
                }
                _ => {}
            }
            attempt.form = form.clone();
            attempt.pending = None;
            attempt.submissions += 1;
            attempt.enter(CheckoutStage::ValidatingAddresses);
            (attempt.id.clone(), attempt.submissions)
        };

        let cart = self.cart.snapshot();
        if let Err(message) = form.validate(&cart) {
            tracing::info!(%checkout_id, %message, "checkout validation failed");
            self.update(&checkout_id, |a| a.fail(CheckoutStage::FailedValidation, message.clone()));
            return Ok(CheckoutOutcome::ValidationFailed { message });
        }

        self.update(&checkout_id, |a| a.enter(CheckoutStage::AwaitingPaymentIntent));
        let request = IntentRequest {
            amount: cart.total().amount_cents,
            currency: cart.currency(),
            metadata: IntentMetadata {
                checkout_id: checkout_id.clone(),
                submission,
            },
        };
        let intent = match self.payments.create_intent(&request).await {
            Ok(intent) => intent,
            Err(e) => {
                tracing::warn!(%checkout_id, error = %e, "payment intent creation failed");
                let message = e.to_string();
                self.update(&checkout_id, |a| a.fail(CheckoutStage::Idle, message.clone()));
                return Ok(CheckoutOutcome::PaymentIntentFailed { message });
            }
        };

        tracing::debug!(%checkout_id, intent_id = %intent.intent_id, submission, "payment intent created");
        self.update(&checkout_id, |a| {
            a.enter(CheckoutStage::ConfirmingPayment);
            a.pending = Some(PendingPayment {
                intent_id: intent.intent_id.clone(),
                client_secret: intent.client_secret.clone(),
                form: form.clone(),
                cart: cart.clone(),
            });
        });

        let confirm = ConfirmRequest {
            client_secret: intent.client_secret,
            payment_method,
            return_url: self.config.return_url.clone(),
        };
        match self.payments.confirm(&confirm).await {
            Ok(ConfirmOutcome::Succeeded(reference)) => {
                Ok(self.complete(&checkout_id, &form, &cart, reference).await)
            }
            Ok(ConfirmOutcome::RequiresRedirect { url }) => {
                tracing::info!(%checkout_id, "payment requires customer action");
                Ok(CheckoutOutcome::Redirect { url })
            }
            Err(e) => {
                tracing::warn!(%checkout_id, error = %e, "payment confirmation failed");
                let message = e.to_string();
                self.update(&checkout_id, |a| {
                    a.pending = None;
                    a.fail(CheckoutStage::FailedPayment, message.clone());
                });
                Ok(CheckoutOutcome::PaymentFailed { message })
            }
        }
    }

    /// Continue after the processor sends the browser back.
    pub async fn resume(&self, ret: &PaymentReturn) -> Result<CheckoutOutcome, CheckoutError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let (checkout_id, pending) = {
            let attempt = self.lock_attempt();
            if attempt.stage == CheckoutStage::Success {
                return Err(CheckoutError::AlreadyCompleted);
            }
            match (&attempt.pending, attempt.stage) {
                (Some(pending), CheckoutStage::ConfirmingPayment) => {
                    (attempt.id.clone(), pending.clone())
                }
                _ => return Err(CheckoutError::NoPendingPayment),
            }
        };

        let failure = if ret.intent_id != pending.intent_id {
            tracing::warn!(
                %checkout_id,
                expected = %pending.intent_id,
                returned = %ret.intent_id,
                "return does not match the pending payment"
            );
            Some("We could not verify your payment. Please try again.")
        } else if !ret.status.is_confirmed() {
            tracing::warn!(%checkout_id, status = ?ret.status, "payment not completed after redirect");
            Some("Your payment was not completed. Please try another payment method.")
        } else {
            None
        };

        if let Some(message) = failure {
            self.update(&checkout_id, |a| {
                a.pending = None;
                a.fail(CheckoutStage::FailedPayment, message);
            });
            return Ok(CheckoutOutcome::PaymentFailed {
                message: message.to_string(),
            });
        }

        let reference = PaymentReference::new(pending.intent_id.as_str());
        Ok(self
            .complete(&checkout_id, &pending.form, &pending.cart, reference)
            .await)
    }

    /// Throw away the local attempt and start a fresh one.
    ///
    /// Calls already in flight are not cancelled. They run to completion but no
    /// longer update the attempt.
    pub fn abandon(&self) {
        let mut attempt = self.lock_attempt();
        tracing::info!(checkout_id = %attempt.id, stage = %attempt.stage, "checkout attempt abandoned");
        *attempt = CheckoutAttempt::new();
    }

    /// Persist the order for a confirmed payment, take the paid lines out of
    /// the cart and build the receipt.
    ///
    /// `charged` is the cart the payment intent was created from. Changes made
    /// to the live cart while the payment was confirming are not part of the
    /// order and stay in the cart.
    async fn complete(
        &self,
        checkout_id: &CheckoutId,
        form: &CheckoutForm,
        charged: &CartState,
        reference: PaymentReference,
    ) -> CheckoutOutcome {
        self.update(checkout_id, |a| a.enter(CheckoutStage::PersistingOrder));

        let draft = OrderDraft::new(checkout_id.clone(), charged, form, reference.clone());
        let (order, soft_failure) = match self.orders.create_order(&draft).await {
            Ok(order) => {
                tracing::info!(%checkout_id, order_id = %order.order_id, "order recorded");
                (Some(order), None)
            }
            Err(e) => {
                tracing::error!(
                    target: ALERT_TARGET,
                    checkout_id = %checkout_id,
                    payment_reference = %reference,
                    total = %draft.total,
                    error = %e,
                    "payment succeeded but order record failed"
                );
                let soft = SoftFailure {
                    message: format!(
                        "Your payment went through, but we could not save your order. \
                         Please contact support with payment reference {reference}."
                    ),
                    error: e,
                };
                (None, Some(soft))
            }
        };

        self.cart.remove_purchased(charged);
        self.update(checkout_id, |a| {
            a.pending = None;
            a.enter(CheckoutStage::Success);
        });

        let confirmation_url = self.confirmation_url(order.as_ref(), &reference);
        CheckoutOutcome::Completed(CheckoutReceipt {
            checkout_id: checkout_id.clone(),
            payment_reference: reference,
            order,
            soft_failure,
            confirmation_url,
        })
    }

    fn confirmation_url(&self, order: Option<&OrderConfirmation>, reference: &PaymentReference) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(number) = order.and_then(|o| o.order_number.as_deref()) {
            query.append_pair("order", number);
        }
        query.append_pair("payment", reference.as_str());
        format!("{}?{}", self.config.confirmation_path, query.finish())
    }

    /// Apply a stage change unless the attempt was abandoned meanwhile.
    fn update(&self, checkout_id: &CheckoutId, f: impl FnOnce(&mut CheckoutAttempt)) {
        let mut attempt = self.lock_attempt();
        if attempt.id == *checkout_id {
            f(&mut attempt);
        } else {
            tracing::debug!(%checkout_id, "attempt abandoned, dropping stage change");
        }
    }

    fn lock_attempt(&self) -> MutexGuard<'_, CheckoutAttempt> {
        self.attempt
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
