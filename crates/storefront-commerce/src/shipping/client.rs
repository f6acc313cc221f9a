//! Shipping quote client.
//!
//! Feeds quotes into the [`CartStore`]. Every issued request takes a
//! sequence token; a response is committed only if no newer request was
//! issued in the meantime and the cart still holds the quoted lines. Failed
//! quotes fall back to free shipping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::cart::{CartState, CartStore, LineItem};
use crate::checkout::Address;
use crate::ids::ProductId;
use crate::money::Money;
use crate::shipping::{QuoteError, ShippingQuote, ShippingQuoteProvider, ShippingQuoteRequest};

/// What happened to a quote request.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    /// Destination incomplete or cart empty; nothing was requested.
    Skipped,
    /// Inputs match the last issued request; nothing was requested.
    Unchanged,
    /// The quote was committed to the cart.
    Applied(ShippingQuote),
    /// The request failed and shipping was reset to zero.
    FailedOpen(QuoteError),
    /// A newer request was issued first, or the cart changed; this result was discarded.
    Stale,
}

/// Inputs a quote depends on. A change in any of them calls for a new quote.
#[derive(Debug, Clone, PartialEq, Eq)]
struct QuoteFingerprint {
    line1: String,
    city: String,
    state: String,
    postal_code: String,
    country: String,
    items: Vec<QuoteLine>,
}

/// The parts of a line item that affect shipping.
type QuoteLine = (ProductId, Option<String>, Option<String>, u32, i64);

impl QuoteFingerprint {
    fn new(destination: &Address, items: &[LineItem]) -> Self {
        Self {
            line1: destination.line1.clone(),
            city: destination.city.clone(),
            state: destination.state.clone(),
            postal_code: destination.postal_code.clone(),
            country: destination.country.clone(),
            items: Self::lines(items),
        }
    }

    fn lines(items: &[LineItem]) -> Vec<QuoteLine> {
        items
            .iter()
            .map(|i| {
                (
                    i.product_id.clone(),
                    i.size.clone(),
                    i.color.clone(),
                    i.quantity,
                    i.unit_price.amount_cents,
                )
            })
            .collect()
    }
}

#[derive(Default)]
struct Committed {
    quote: Option<ShippingQuote>,
}

/// Obtains shipping quotes and commits the latest one to the cart.
pub struct ShippingQuoteClient {
    provider: Arc<dyn ShippingQuoteProvider>,
    cart: CartStore,
    sequence: AtomicU64,
    last_fingerprint: Mutex<Option<QuoteFingerprint>>,
    committed: Mutex<Committed>,
}

impl ShippingQuoteClient {
    /// Create a client that writes into `cart`.
    pub fn new(provider: Arc<dyn ShippingQuoteProvider>, cart: CartStore) -> Self {
        Self {
            provider,
            cart,
            sequence: AtomicU64::new(0),
            last_fingerprint: Mutex::new(None),
            committed: Mutex::new(Committed::default()),
        }
    }

    /// The most recently committed quote, if the last outcome was a success.
    pub fn last_quote(&self) -> Option<ShippingQuote> {
        self.lock_committed().quote.clone()
    }

    /// Request a quote only if the destination or items changed since the
    /// last issued request.
    pub async fn refresh(&self, destination: &Address, items: &[LineItem]) -> QuoteOutcome {
        if !Self::is_quotable(destination, items) {
            self.invalidate();
            return QuoteOutcome::Skipped;
        }
        if !self.claim(destination, items) {
            return QuoteOutcome::Unchanged;
        }
        self.request(destination, items).await
    }

    /// Request a quote unconditionally (subject to the input guard).
    pub async fn quote(&self, destination: &Address, items: &[LineItem]) -> QuoteOutcome {
        if !Self::is_quotable(destination, items) {
            tracing::debug!("shipping quote skipped: destination incomplete or cart empty");
            self.invalidate();
            return QuoteOutcome::Skipped;
        }
        *self.lock_fingerprint() = Some(QuoteFingerprint::new(destination, items));
        self.request(destination, items).await
    }

    /// Watch the cart and the shipping destination, quoting on every change
    /// that affects the price of shipping.
    ///
    /// Each quote runs as its own task, so a slow quote never delays a newer
    /// one. Returns when the destination sender is dropped.
    pub async fn run_auto_quote(self: Arc<Self>, mut destination: watch::Receiver<Option<Address>>) {
        let mut cart = self.cart.subscribe();

        loop {
            let current = destination.borrow_and_update().clone();
            let items = cart.borrow_and_update().items().to_vec();

            match current {
                Some(address) if Self::is_quotable(&address, &items) => {
                    if self.claim(&address, &items) {
                        let client = Arc::clone(&self);
                        tokio::spawn(async move {
                            client.request(&address, &items).await;
                        });
                    }
                }
                _ => self.invalidate(),
            }

            tokio::select! {
                changed = destination.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = cart.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    }

    fn is_quotable(destination: &Address, items: &[LineItem]) -> bool {
        destination.is_quotable() && !items.is_empty()
    }

    /// Supersede any request in flight and forget the last inputs.
    fn invalidate(&self) {
        self.sequence.fetch_add(1, Ordering::SeqCst);
        *self.lock_fingerprint() = None;
    }

    /// Record the inputs as the latest request. Returns false if unchanged.
    fn claim(&self, destination: &Address, items: &[LineItem]) -> bool {
        let fingerprint = QuoteFingerprint::new(destination, items);
        let mut last = self.lock_fingerprint();
        if last.as_ref() == Some(&fingerprint) {
            return false;
        }
        *last = Some(fingerprint);
        true
    }

    async fn request(&self, destination: &Address, items: &[LineItem]) -> QuoteOutcome {
        let token = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let currency = self.cart.read(|c| c.currency());
        let request = ShippingQuoteRequest::new(destination, items);

        tracing::debug!(token, items = items.len(), "requesting shipping quote");
        let result = self
            .provider
            .quote(&request)
            .await
            .and_then(|response| response.into_quote(currency));

        let quoted = QuoteFingerprint::lines(items);
        let still_quoted =
            |cart: &CartState| !cart.is_empty() && QuoteFingerprint::lines(cart.items()) == quoted;

        // Check and commit under one lock so a newer result cannot land in between.
        let mut committed = self.lock_committed();
        if self.sequence.load(Ordering::SeqCst) != token {
            tracing::debug!(token, "discarding stale shipping quote");
            return QuoteOutcome::Stale;
        }

        match result {
            Ok(quote) => match self.cart.update_shipping_if(quote.cost, still_quoted) {
                Ok(false) => Self::cart_moved_on(token),
                Ok(true) => {
                    tracing::info!(
                        token,
                        cost = %quote.cost,
                        method = %quote.method,
                        "shipping quote applied"
                    );
                    committed.quote = Some(quote.clone());
                    QuoteOutcome::Applied(quote)
                }
                Err(e) => {
                    let error = QuoteError::InvalidResponse(e.to_string());
                    self.fail_open(&mut committed, token, still_quoted, error)
                }
            },
            Err(error) => self.fail_open(&mut committed, token, still_quoted, error),
        }
    }

    /// Reset shipping to zero for a failed quote and let the same inputs be retried.
    fn fail_open(
        &self,
        committed: &mut Committed,
        token: u64,
        still_quoted: impl FnOnce(&CartState) -> bool,
        error: QuoteError,
    ) -> QuoteOutcome {
        let currency = self.cart.read(|c| c.currency());
        match self.cart.update_shipping_if(Money::zero(currency), still_quoted) {
            Ok(false) => return Self::cart_moved_on(token),
            Ok(true) => {}
            Err(e) => tracing::warn!(error = %e, "could not reset shipping cost"),
        }
        tracing::warn!(error = %error, "shipping quote failed, falling back to free shipping");
        committed.quote = None;
        *self.lock_fingerprint() = None;
        QuoteOutcome::FailedOpen(error)
    }

    fn cart_moved_on(token: u64) -> QuoteOutcome {
        tracing::debug!(token, "cart changed while quoting, discarding shipping quote");
        QuoteOutcome::Stale
    }

    fn lock_fingerprint(&self) -> MutexGuard<'_, Option<QuoteFingerprint>> {
        self.last_fingerprint
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_committed(&self) -> MutexGuard<'_, Committed> {
        self.committed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
