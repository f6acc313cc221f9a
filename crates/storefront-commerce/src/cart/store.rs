//! Observable cart store.

use std::sync::Arc;

use tokio::sync::watch;

use crate::cart::{CartState, LineItemInput};
use crate::error::CommerceError;
use crate::ids::ProductId;
use crate::money::{Currency, Money};

/// Shared handle to the session's cart.
///
/// Wraps a [`CartState`] in a `watch` channel: each mutation that changes
/// the state notifies every receiver handed out by [`CartStore::subscribe`].
/// Clones share the same cart.
#[derive(Debug, Clone)]
pub struct CartStore {
    state: Arc<watch::Sender<CartState>>,
}

impl CartStore {
    /// Create an empty cart store.
    pub fn new(currency: Currency) -> Self {
        Self::from_state(CartState::new(currency))
    }

    /// Create a store around an existing (e.g. restored) cart.
    pub fn from_state(state: CartState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Receive a notification on every state change.
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> CartState {
        self.state.borrow().clone()
    }

    /// Read the current state without cloning it.
    ///
    /// Do not hold onto anything across an await point inside `f`.
    pub fn read<R>(&self, f: impl FnOnce(&CartState) -> R) -> R {
        f(&self.state.borrow())
    }

    /// See [`CartState::add_item`].
    pub fn add_item(&self, input: LineItemInput) -> Result<(), CommerceError> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| {
            tracing::debug!(product_id = %input.product_id, "adding item to cart");
            result = state.add_item(input);
            result.is_ok()
        });
        result
    }

    /// See [`CartState::remove_item`].
    pub fn remove_item(&self, product_id: &ProductId) -> usize {
        let mut removed = 0;
        self.state.send_if_modified(|state| {
            removed = state.remove_item(product_id);
            removed > 0
        });
        tracing::debug!(%product_id, removed, "removed item from cart");
        removed
    }

    /// See [`CartState::update_quantity`].
    pub fn update_quantity(&self, product_id: &ProductId, quantity: i64) -> usize {
        let mut affected = 0;
        self.state.send_if_modified(|state| {
            affected = state.update_quantity(product_id, quantity);
            affected > 0
        });
        tracing::debug!(%product_id, quantity, affected, "updated cart quantity");
        affected
    }

    /// See [`CartState::update_shipping`].
    pub fn update_shipping(&self, cost: Money) -> Result<(), CommerceError> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| {
            let before = state.shipping_cost();
            result = state.update_shipping(cost);
            result.is_ok() && state.shipping_cost() != before
        });
        result
    }

    /// Set the shipping cost only if `applies` holds for the current cart.
    ///
    /// The check and the write happen under the same borrow, so no other
    /// mutation can land between them. Returns `Ok(false)` when skipped.
    pub fn update_shipping_if(
        &self,
        cost: Money,
        applies: impl FnOnce(&CartState) -> bool,
    ) -> Result<bool, CommerceError> {
        let mut result = Ok(false);
        self.state.send_if_modified(|state| {
            if !applies(&*state) {
                return false;
            }
            let before = state.shipping_cost();
            result = state.update_shipping(cost).map(|()| true);
            result.is_ok() && state.shipping_cost() != before
        });
        result
    }

    /// See [`CartState::remove_purchased`].
    pub fn remove_purchased(&self, order: &CartState) -> u64 {
        let mut removed = 0;
        self.state.send_if_modified(|state| {
            let had_shipping = !state.shipping_cost().is_zero();
            removed = state.remove_purchased(order);
            removed > 0 || had_shipping
        });
        tracing::debug!(removed, "removed purchased items from cart");
        removed
    }

    /// See [`CartState::clear`].
    pub fn clear(&self) {
        self.state.send_if_modified(|state| {
            let changed = !state.is_empty() || !state.shipping_cost().is_zero();
            state.clear();
            changed
        });
        tracing::debug!("cart cleared");
    }

    /// See [`CartState::toggle_visibility`].
    pub fn toggle_visibility(&self) {
        self.state.send_modify(CartState::toggle_visibility);
    }
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new(Currency::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tee() -> LineItemInput {
        LineItemInput::new("p1", "Tee", Money::new(2000, Currency::USD))
    }

    #[test]
    fn test_clones_share_state() {
        let store = CartStore::default();
        let other = store.clone();

        store.add_item(tee()).unwrap();
        other.add_item(tee()).unwrap();

        assert_eq!(store.snapshot().items()[0].quantity, 2);
        assert_eq!(store.read(|c| c.subtotal().amount_cents), 4000);
    }

    #[test]
    fn test_subscribers_see_changes() {
        let store = CartStore::default();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.add_item(tee()).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().item_count(), 1);

        store.toggle_visibility();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_open());
    }

    #[test]
    fn test_no_notification_without_change() {
        let store = CartStore::default();
        let rx = store.subscribe();

        store.remove_item(&ProductId::new("missing"));
        store.update_quantity(&ProductId::new("missing"), 3);
        store.update_shipping(Money::zero(Currency::USD)).unwrap();
        store.clear();
        assert!(!rx.has_changed().unwrap());

        let result = store.add_item(LineItemInput::new("p1", "Tee", Money::new(1, Currency::GBP)));
        assert!(result.is_err());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_update_shipping_if_checks_current_state() {
        let store = CartStore::default();
        let cost = Money::new(700, Currency::USD);

        assert!(matches!(store.update_shipping_if(cost, |c| !c.is_empty()), Ok(false)));
        assert!(store.snapshot().shipping_cost().is_zero());

        store.add_item(tee()).unwrap();
        let rx = store.subscribe();
        assert!(matches!(store.update_shipping_if(cost, |c| !c.is_empty()), Ok(true)));
        assert!(rx.has_changed().unwrap());
        assert_eq!(store.snapshot().total().amount_cents, 2700);
    }

    #[tokio::test]
    async fn test_changed_wakes_waiter() {
        let store = CartStore::default();
        let mut rx = store.subscribe();

        let writer = store.clone();
        let handle = tokio::spawn(async move {
            writer.add_item(tee()).unwrap();
        });

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().item_count(), 1);
        handle.await.unwrap();
    }
}
