//! Cart
//!
//! The in-memory cart model: an ordered list of lines, unique by product.
//! Totals are always derived from the current lines, never stored.

use std::num::NonZeroU32;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{catalog::ProductDetail, ids::ProductId};

/// Upper bound used when a line carries no stock figure.
pub const FALLBACK_MAX_QUANTITY: u32 = 99;

/// Errors raised by cart mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// The product has no line in the cart.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),

    /// A line cannot be created with a zero quantity.
    #[error("quantity must be at least 1")]
    InvalidQuantity,
}

/// One product in the cart.
///
/// Serialized in camelCase; the legacy keys written by older clients
/// (`id`, `image`, `price`, `stock`) are still accepted when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product identifier, unique within a cart
    #[serde(alias = "id")]
    pub product_id: ProductId,

    /// Display name
    pub name: String,

    /// URL slug of the product detail view
    #[serde(default)]
    pub slug: String,

    /// Thumbnail URL
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,

    /// Unit price in minor units
    #[serde(alias = "price")]
    pub unit_price: u64,

    /// Discounted unit price shown next to the regular price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<u64>,

    /// Discount percentage shown next to the regular price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_percent: Option<u32>,

    /// Units in the cart
    pub quantity: u32,

    /// Units the server reports as available
    #[serde(default, alias = "stock")]
    pub available_stock: u32,

    /// Whether the server reports the product as purchasable
    #[serde(default)]
    pub in_stock: bool,
}

impl CartLine {
    /// Builds a line from the product detail view.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for a zero quantity.
    pub fn from_product(product: &ProductDetail, quantity: u32) -> Result<Self, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let mut line = Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            slug: product.slug.clone(),
            image_url: product.primary_image().map(str::to_string),
            unit_price: product.price,
            discount_price: None,
            discount_percent: None,
            quantity,
            available_stock: product.stock,
            in_stock: product.in_stock,
        };

        line.quantity = line.clamp(quantity);

        Ok(line)
    }

    /// Highest quantity this line may hold.
    pub fn quantity_limit(&self) -> u32 {
        if self.available_stock == 0 {
            FALLBACK_MAX_QUANTITY
        } else {
            self.available_stock
        }
    }

    /// Clamps a requested quantity to the line's limit.
    pub fn clamp(&self, requested: u32) -> u32 {
        requested.min(self.quantity_limit())
    }

    /// `unit_price × quantity`
    pub fn line_total(&self) -> u64 {
        self.unit_price.saturating_mul(u64::from(self.quantity))
    }

    /// Whether the line would be rejected at checkout for stock reasons.
    pub fn has_stock_conflict(&self) -> bool {
        !self.in_stock || self.quantity > self.available_stock
    }
}

/// Ordered set of cart lines, unique by product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cart from untrusted lines (local storage or server payload).
    ///
    /// Lines with a zero quantity are dropped and only the first line for a
    /// given product is kept.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut seen = FxHashSet::default();

        let lines = lines
            .into_iter()
            .filter(|line| line.quantity > 0 && seen.insert(line.product_id.clone()))
            .collect();

        Self { lines }
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Consumes the cart, returning its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    /// Line for a product, if present.
    pub fn get(&self, product: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product_id == product)
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct products.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// `Σ unit_price × quantity`
    pub fn total(&self) -> u64 {
        self.lines
            .iter()
            .map(CartLine::line_total)
            .fold(0, u64::saturating_add)
    }

    /// `Σ quantity`
    pub fn count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sets a line's quantity, clamped to its limit.
    ///
    /// Returns the quantity actually applied.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] when the product has no line.
    pub fn set_quantity(
        &mut self,
        product: &ProductId,
        quantity: NonZeroU32,
    ) -> Result<u32, CartError> {
        let line = self
            .lines
            .iter_mut()
            .find(|line| &line.product_id == product)
            .ok_or_else(|| CartError::NotInCart(product.clone()))?;

        line.quantity = line.clamp(quantity.get());

        Ok(line.quantity)
    }

    /// Adds a line, summing quantities with an existing line for the same
    /// product. Stock figures are refreshed from the incoming line before the
    /// sum is clamped.
    ///
    /// Returns the resulting quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for a zero quantity.
    pub fn add(&mut self, incoming: CartLine) -> Result<u32, CartError> {
        if incoming.quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == incoming.product_id)
        {
            line.available_stock = incoming.available_stock;
            line.in_stock = incoming.in_stock;
            line.quantity = line.clamp(line.quantity.saturating_add(incoming.quantity));

            return Ok(line.quantity);
        }

        let mut line = incoming;
        line.quantity = line.clamp(line.quantity);
        let quantity = line.quantity;
        self.lines.push(line);

        Ok(quantity)
    }

    /// Removes a product's line, returning it.
    pub fn remove(&mut self, product: &ProductId) -> Option<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|line| &line.product_id == product)?;

        Some(self.lines.remove(index))
    }

    /// Removes every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Products that are out of stock or exceed their available stock.
    pub fn stock_conflicts(&self) -> SmallVec<[ProductId; 4]> {
        self.lines
            .iter()
            .filter(|line| line.has_stock_conflict())
            .map(|line| line.product_id.clone())
            .collect()
    }
}
