//! Cart state and its synchronous operations.
//!
//! Every operation ends with [`CartState::recompute`], which derives the
//! subtotal and total from the current items. Totals are never adjusted
//! incrementally, so `subtotal == Σ unit_price × quantity` and
//! `total == subtotal + shipping_cost` hold after any sequence of calls.

use crate::cart::{LineItem, LineItemInput, LineItemKey, MAX_QUANTITY_PER_ITEM};
use crate::error::CommerceError;
use crate::ids::ProductId;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// The customer's cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", from = "StoredCart")]
pub struct CartState {
    items: Vec<LineItem>,
    subtotal: Money,
    shipping_cost: Money,
    total: Money,
    is_open: bool,
    currency: Currency,
}

impl CartState {
    /// Create an empty cart in the given currency.
    pub fn new(currency: Currency) -> Self {
        Self {
            items: Vec::new(),
            subtotal: Money::zero(currency),
            shipping_cost: Money::zero(currency),
            total: Money::zero(currency),
            is_open: false,
            currency,
        }
    }

    /// Add one unit of a product configuration.
    ///
    /// Merges into the existing line with the same `(product, size, color)`
    /// key, otherwise appends a new line. Quantities stop at
    /// [`MAX_QUANTITY_PER_ITEM`]. Fails only when the price is in another
    /// currency than the cart.
    pub fn add_item(&mut self, input: LineItemInput) -> Result<(), CommerceError> {
        if input.unit_price.currency != self.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: input.unit_price.currency.code().to_string(),
            });
        }

        let key = input.key();
        match self.items.iter_mut().find(|i| i.has_key(&key)) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .saturating_add(1)
                    .min(MAX_QUANTITY_PER_ITEM);
            }
            None => self.items.push(LineItem::from_input(input)),
        }

        self.recompute();
        Ok(())
    }

    /// Remove every line of a product, whatever its size or color.
    ///
    /// Returns the number of lines removed.
    pub fn remove_item(&mut self, product_id: &ProductId) -> usize {
        let len_before = self.items.len();
        self.items.retain(|i| &i.product_id != product_id);
        self.recompute();
        len_before - self.items.len()
    }

    /// Set the quantity of every line of a product.
    ///
    /// A quantity of zero or less removes those lines. Returns the number of
    /// lines affected.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: i64) -> usize {
        if quantity <= 0 {
            return self.remove_item(product_id);
        }

        let quantity = u32::try_from(quantity)
            .unwrap_or(u32::MAX)
            .min(MAX_QUANTITY_PER_ITEM);

        let mut affected = 0;
        for item in self.items.iter_mut().filter(|i| &i.product_id == product_id) {
            item.quantity = quantity;
            affected += 1;
        }

        self.recompute();
        affected
    }

    /// Set the shipping cost. Negative quotes are clamped to zero.
    pub fn update_shipping(&mut self, cost: Money) -> Result<(), CommerceError> {
        if cost.currency != self.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: cost.currency.code().to_string(),
            });
        }

        self.shipping_cost = cost.non_negative();
        self.recompute();
        Ok(())
    }

    /// Empty the cart and reset every total, shipping included.
    pub fn clear(&mut self) {
        self.items.clear();
        self.shipping_cost = Money::zero(self.currency);
        self.recompute();
    }

    /// Take the lines of a paid order out of the cart and reset shipping.
    ///
    /// `order` is the cart as it was charged. Units added since then stay in
    /// the cart. Returns the number of units removed.
    pub fn remove_purchased(&mut self, order: &CartState) -> u64 {
        let mut removed = 0;
        for ordered in order.items() {
            let key = ordered.key();
            if let Some(line) = self.items.iter_mut().find(|i| i.has_key(&key)) {
                let taken = line.quantity.min(ordered.quantity);
                line.quantity -= taken;
                removed += u64::from(taken);
            }
        }
        self.items.retain(|i| i.quantity > 0);
        self.shipping_cost = Money::zero(self.currency);
        self.recompute();
        removed
    }

    /// Flip the drawer visibility flag.
    pub fn toggle_visibility(&mut self) {
        self.is_open = !self.is_open;
    }

    /// Derive subtotal and total from the current items.
    fn recompute(&mut self) {
        let subtotal_cents = self
            .items
            .iter()
            .map(|i| i.line_total().amount_cents)
            .fold(0_i64, i64::saturating_add);

        self.subtotal = Money::new(subtotal_cents, self.currency);
        self.total = Money::new(
            subtotal_cents.saturating_add(self.shipping_cost.amount_cents),
            self.currency,
        );
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Sum of line totals.
    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    /// Current shipping cost.
    pub fn shipping_cost(&self) -> Money {
        self.shipping_cost
    }

    /// Subtotal plus shipping.
    pub fn total(&self) -> Money {
        self.total
    }

    /// Whether the cart drawer is open.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Cart currency.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Get total item count (sum of quantities).
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get a line by identity key.
    pub fn get_item(&self, key: &LineItemKey) -> Option<&LineItem> {
        self.items.iter().find(|i| i.has_key(key))
    }

    /// Serialize for client-side persistence.
    pub fn to_json(&self) -> Result<String, CommerceError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a persisted cart. Totals are recomputed, not trusted.
    pub fn from_json(json: &str) -> Result<Self, CommerceError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for CartState {
    fn default() -> Self {
        Self::new(Currency::default())
    }
}

/// Persisted shape of a cart; derived totals are ignored on load.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCart {
    items: Vec<LineItem>,
    shipping_cost: Money,
    #[serde(default)]
    is_open: bool,
    currency: Currency,
}

impl From<StoredCart> for CartState {
    fn from(stored: StoredCart) -> Self {
        let mut state = CartState::new(stored.currency);
        state.items = stored
            .items
            .into_iter()
            .filter(|i| i.quantity > 0 && i.unit_price.currency == stored.currency)
            .collect();
        if stored.shipping_cost.currency == stored.currency {
            state.shipping_cost = stored.shipping_cost.non_negative();
        }
        state.is_open = stored.is_open;
        state.recompute();
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tee(price_cents: i64) -> LineItemInput {
        LineItemInput::new("p1", "Tee", Money::new(price_cents, Currency::USD))
    }

    fn assert_totals(cart: &CartState) {
        let expected: i64 = cart
            .items()
            .iter()
            .map(|i| i.unit_price.amount_cents * i64::from(i.quantity))
            .sum();
        assert_eq!(cart.subtotal().amount_cents, expected);
        assert_eq!(
            cart.total().amount_cents,
            expected + cart.shipping_cost().amount_cents
        );
    }

    #[test]
    fn test_remove_purchased_keeps_later_additions() {
        let mut cart = CartState::default();
        cart.add_item(tee(2000)).unwrap();
        cart.update_shipping(Money::new(500, Currency::USD)).unwrap();
        let order = cart.clone();

        cart.add_item(tee(2000)).unwrap();
        cart.add_item(LineItemInput::new("p2", "Cap", Money::new(800, Currency::USD)))
            .unwrap();

        assert_eq!(cart.remove_purchased(&order), 1);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.items()[0].quantity, 1);
        assert!(cart.shipping_cost().is_zero());
        assert_eq!(cart.total().amount_cents, 2800);
        assert_totals(&cart);

        let mut paid = order.clone();
        assert_eq!(paid.remove_purchased(&order), 1);
        assert!(paid.is_empty());
        assert!(paid.total().is_zero());
    }

    #[test]
    fn test_add_same_key_merges() {
        let mut cart = CartState::default();
        for _ in 0..5 {
            cart.add_item(tee(2000)).unwrap();
        }

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(cart.subtotal().amount_cents, 10000);
        assert_totals(&cart);
    }

    #[test]
    fn test_different_variants_are_separate_lines() {
        let mut cart = CartState::default();
        cart.add_item(tee(2000).with_size("S")).unwrap();
        cart.add_item(tee(2000).with_size("M")).unwrap();
        cart.add_item(tee(2000).with_size("M").with_color("Red")).unwrap();
        cart.add_item(tee(2000).with_size("M")).unwrap();

        assert_eq!(cart.items().len(), 3);
        assert_eq!(cart.item_count(), 4);
        assert_eq!(cart.items()[1].quantity, 2);
        assert_totals(&cart);
    }

    #[test]
    fn test_add_rejects_foreign_currency() {
        let mut cart = CartState::default();
        let result = cart.add_item(LineItemInput::new("p1", "Tee", Money::new(1, Currency::EUR)));
        assert!(matches!(result, Err(CommerceError::CurrencyMismatch { .. })));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_zero_or_negative_removes() {
        for quantity in [0, -1] {
            let mut cart = CartState::default();
            cart.add_item(tee(2000)).unwrap();
            assert_eq!(cart.update_quantity(&ProductId::new("p1"), quantity), 1);
            assert!(cart.is_empty());
            assert!(cart.items().iter().all(|i| i.quantity >= 1));
            assert_eq!(cart.subtotal().amount_cents, 0);
        }
    }

    #[test]
    fn test_update_quantity_sets_value() {
        let mut cart = CartState::default();
        cart.add_item(tee(1250)).unwrap();
        cart.update_quantity(&ProductId::new("p1"), 4);

        assert_eq!(cart.items()[0].quantity, 4);
        assert_eq!(cart.subtotal().amount_cents, 5000);
        assert_totals(&cart);
    }

    #[test]
    fn test_update_quantity_caps_at_limit() {
        let mut cart = CartState::default();
        cart.add_item(tee(1)).unwrap();
        cart.update_quantity(&ProductId::new("p1"), i64::MAX);
        assert_eq!(cart.items()[0].quantity, MAX_QUANTITY_PER_ITEM);
    }

    #[test]
    fn test_update_quantity_unknown_product() {
        let mut cart = CartState::default();
        cart.add_item(tee(1000)).unwrap();
        assert_eq!(cart.update_quantity(&ProductId::new("nope"), 3), 0);
        assert_eq!(cart.items()[0].quantity, 1);
    }

    // Removal matches on product id only, so every size of the product goes.
    #[test]
    fn test_remove_item_drops_all_variants_of_product() {
        let mut cart = CartState::default();
        cart.add_item(tee(2000).with_size("S")).unwrap();
        cart.add_item(tee(2000).with_size("L")).unwrap();
        cart.add_item(LineItemInput::new("p2", "Mug", Money::new(800, Currency::USD)))
            .unwrap();

        assert_eq!(cart.remove_item(&ProductId::new("p1")), 2);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product_id.as_str(), "p2");
        assert_totals(&cart);
    }

    #[test]
    fn test_shipping_feeds_total() {
        let mut cart = CartState::default();
        cart.add_item(tee(2000)).unwrap();
        cart.update_shipping(Money::new(500, Currency::USD)).unwrap();
        assert_eq!(cart.total().amount_cents, 2500);

        cart.add_item(tee(2000)).unwrap();
        assert_eq!(cart.total().amount_cents, 4500);

        cart.update_shipping(Money::new(-300, Currency::USD)).unwrap();
        assert_eq!(cart.shipping_cost().amount_cents, 0);
        assert_eq!(cart.total().amount_cents, 4000);
        assert_totals(&cart);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut cart = CartState::default();
        cart.add_item(tee(2000)).unwrap();
        cart.update_shipping(Money::new(500, Currency::USD)).unwrap();

        cart.clear();
        let first = cart.clone();
        cart.clear();

        assert_eq!(cart, first);
        assert!(cart.is_empty());
        assert!(cart.subtotal().is_zero());
        assert!(cart.shipping_cost().is_zero());
        assert!(cart.total().is_zero());
    }

    #[test]
    fn test_toggle_visibility_leaves_totals() {
        let mut cart = CartState::default();
        cart.add_item(tee(2000)).unwrap();
        let before = cart.total();

        cart.toggle_visibility();
        assert!(cart.is_open());
        assert_eq!(cart.total(), before);

        cart.toggle_visibility();
        assert!(!cart.is_open());
    }

    #[test]
    fn test_mixed_sequence_keeps_invariant() {
        let mut cart = CartState::default();
        let prices = [1999, 350, 12000, 1];
        for (n, price) in prices.iter().enumerate() {
            let input = LineItemInput::new(format!("p{}", n), "Item", Money::new(*price, Currency::USD));
            cart.add_item(input.clone()).unwrap();
            cart.add_item(input).unwrap();
            assert_totals(&cart);
        }

        cart.update_quantity(&ProductId::new("p2"), 7);
        assert_totals(&cart);
        cart.remove_item(&ProductId::new("p0"));
        assert_totals(&cart);
        cart.update_shipping(Money::new(995, Currency::USD)).unwrap();
        assert_totals(&cart);
        cart.update_quantity(&ProductId::new("p1"), -4);
        assert_totals(&cart);

        assert_eq!(cart.subtotal().amount_cents, 12000 * 7 + 2);
    }

    #[test]
    fn test_json_restore_recomputes_totals() {
        let mut cart = CartState::default();
        cart.add_item(tee(2000)).unwrap();
        cart.add_item(tee(2000)).unwrap();
        cart.update_shipping(Money::new(500, Currency::USD)).unwrap();

        let json = cart.to_json().unwrap();
        assert_eq!(CartState::from_json(&json).unwrap(), cart);

        let tampered = json.replace("\"total\":{\"amount_cents\":4500", "\"total\":{\"amount_cents\":1");
        let restored = CartState::from_json(&tampered).unwrap();
        assert_eq!(restored.total().amount_cents, 4500);
    }
}
