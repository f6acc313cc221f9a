//! Shopping cart module.
//!
//! Contains line items, the cart state with its totals invariant, and the
//! observable store the UI reads from.

mod line_item;
mod state;
mod store;

pub use line_item::{LineItem, LineItemInput, LineItemKey, MAX_QUANTITY_PER_ITEM};
pub use state::CartState;
pub use store::CartStore;
