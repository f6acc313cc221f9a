//! Checkout module.
//!
//! Contains addresses, the attempt state machine, the payment and order
//! collaborator seams, and the orchestrator that drives them.

mod address;
mod attempt;
mod orchestrator;
mod order;
mod payment;

pub use address::Address;
pub use attempt::{CheckoutAttempt, CheckoutForm, CheckoutStage, PendingPayment};
pub use orchestrator::{
    CheckoutError, CheckoutOrchestrator, CheckoutOutcome, CheckoutReceipt, SoftFailure,
};
pub use order::{
    BadgeTone, OrderConfirmation, OrderDraft, OrderStatus, OrderStore, OrderStoreError,
    StatusBadge,
};
pub use payment::{
    ConfirmOutcome, ConfirmRequest, IntentMetadata, IntentRequest, PaymentError, PaymentGateway,
    PaymentIntent, PaymentReturn, PaymentReturnError, RedirectStatus,
};
