//! Pricing
//!
//! Shipping policy and the checkout summary. Shipping is a pure function of
//! the cart total and is never stored on cart lines.

use rusty_money::{Money, iso};
use thiserror::Error;

use crate::cart::Cart;

/// Totals strictly above this amount ship for free.
pub const FREE_SHIPPING_THRESHOLD: u64 = 500_000;

/// Flat shipping fee charged below the threshold.
pub const SHIPPING_FEE: u64 = 30_000;

/// Errors raised while resolving a display currency.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    /// The ISO code is not a known currency.
    #[error("unknown currency code `{0}`")]
    UnknownCurrency(String),
}

/// Shipping fee for a cart total.
#[must_use]
pub const fn shipping_fee(total: u64) -> u64 {
    if total > FREE_SHIPPING_THRESHOLD {
        0
    } else {
        SHIPPING_FEE
    }
}

/// Totals shown next to the cart and submitted at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    /// Sum of line totals
    pub subtotal: u64,

    /// Shipping fee
    pub shipping: u64,

    /// `subtotal + shipping`
    pub grand_total: u64,

    /// Amount still needed for free shipping; zero once it applies
    pub free_shipping_remaining: u64,

    /// Sum of quantities
    pub item_count: u64,
}

impl OrderSummary {
    /// Summarises a cart.
    #[must_use]
    pub fn for_cart(cart: &Cart) -> Self {
        Self::from_subtotal(cart.total(), cart.count())
    }

    /// Summarises a subtotal directly.
    #[must_use]
    pub const fn from_subtotal(subtotal: u64, item_count: u64) -> Self {
        let shipping = shipping_fee(subtotal);
        let free_shipping_remaining = if shipping == 0 {
            0
        } else {
            FREE_SHIPPING_THRESHOLD.saturating_sub(subtotal)
        };

        Self {
            subtotal,
            shipping,
            grand_total: subtotal.saturating_add(shipping),
            free_shipping_remaining,
            item_count,
        }
    }

    /// Whether shipping is free.
    #[must_use]
    pub const fn ships_free(&self) -> bool {
        self.shipping == 0
    }
}

/// Looks up an ISO currency by code.
///
/// # Errors
///
/// Returns [`PricingError::UnknownCurrency`] for unknown codes.
pub fn currency(code: &str) -> Result<&'static iso::Currency, PricingError> {
    iso::find(&code.trim().to_ascii_uppercase())
        .ok_or_else(|| PricingError::UnknownCurrency(code.to_string()))
}

/// Formats a minor-unit amount in the given currency.
pub fn format_price(amount: u64, currency: &'static iso::Currency) -> String {
    let minor = i64::try_from(amount).unwrap_or(i64::MAX);

    format!("{}", Money::from_minor(minor, currency))
}
