//! Line item types.

use crate::ids::ProductId;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Maximum quantity allowed per line item.
pub const MAX_QUANTITY_PER_ITEM: u32 = 9999;

/// What the catalog hands to the cart when a product is added.
///
/// Quantity is implied: every add counts as one unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    /// Product being purchased.
    pub product_id: ProductId,
    /// Product name (denormalized for display).
    pub name: String,
    /// Unit price.
    pub unit_price: Money,
    /// Image URI (display only).
    pub image: String,
    /// Selected size, if the product has sizes.
    pub size: Option<String>,
    /// Selected color, if the product has colors.
    pub color: Option<String>,
}

impl LineItemInput {
    /// Create an input for a product without variant options.
    pub fn new(product_id: impl Into<ProductId>, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            image: String::new(),
            size: None,
            color: None,
        }
    }

    /// Set the image URI.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Set the size option.
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Set the color option.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Identity key of the line this input merges into.
    pub fn key(&self) -> LineItemKey {
        LineItemKey {
            product_id: self.product_id.clone(),
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }
}

/// Identity of a line item: two lines with the same key are the same line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemKey {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// A line item in the cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Product ID.
    pub product_id: ProductId,
    /// Product name (denormalized for display).
    pub name: String,
    /// Unit price.
    pub unit_price: Money,
    /// Image URI.
    pub image: String,
    /// Size option.
    pub size: Option<String>,
    /// Color option.
    pub color: Option<String>,
    /// Quantity, always at least 1.
    pub quantity: u32,
}

impl LineItem {
    /// Create a single-unit line from an input.
    pub fn from_input(input: LineItemInput) -> Self {
        Self {
            product_id: input.product_id,
            name: input.name,
            unit_price: input.unit_price,
            image: input.image,
            size: input.size,
            color: input.color,
            quantity: 1,
        }
    }

    /// Identity key of this line.
    pub fn key(&self) -> LineItemKey {
        LineItemKey {
            product_id: self.product_id.clone(),
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }

    /// Check whether this line has the given identity.
    pub fn has_key(&self, key: &LineItemKey) -> bool {
        self.product_id == key.product_id && self.size == key.size && self.color == key.color
    }

    /// Unit price times quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    /// Variant label for display (e.g., "M / Blue").
    pub fn variant_label(&self) -> Option<String> {
        match (&self.size, &self.color) {
            (Some(size), Some(color)) => Some(format!("{} / {}", size, color)),
            (Some(size), None) => Some(size.clone()),
            (None, Some(color)) => Some(color.clone()),
            (None, None) => None,
        }
    }
}
