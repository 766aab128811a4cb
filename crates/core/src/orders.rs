//! Orders

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{cart::Cart, ids::OrderId, ids::ProductId, pricing::OrderSummary};

/// One submitted line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Product identifier
    pub product_id: ProductId,

    /// Units ordered
    pub quantity: u32,

    /// Unit price at submission time
    pub price: u64,
}

/// Order submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Ordered lines
    pub items: Vec<OrderLine>,

    /// Grand total including shipping
    pub total: u64,
}

impl OrderRequest {
    /// Builds the payload for a cart; the total includes shipping.
    #[must_use]
    pub fn for_cart(cart: &Cart) -> Self {
        Self {
            items: cart
                .lines()
                .iter()
                .map(|line| OrderLine {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    price: line.unit_price,
                })
                .collect(),
            total: OrderSummary::for_cart(cart).grand_total,
        }
    }
}

/// A placed order as listed in the order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    /// Order identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: OrderId,

    /// Placement time
    #[serde(default)]
    pub created_at: Option<Timestamp>,

    /// Grand total charged
    #[serde(default)]
    pub total: u64,
}

/// Delivery address recorded on an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    /// Recipient
    #[serde(default)]
    pub full_name: String,

    /// Contact number
    #[serde(default)]
    pub phone: String,

    /// Street line
    #[serde(default)]
    pub street: String,
}

/// One line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailLine {
    /// Product identifier
    pub product_id: ProductId,

    /// Display name at order time
    #[serde(default)]
    pub name: String,

    /// Image URL, if any
    #[serde(default)]
    pub image: Option<String>,

    /// Units ordered
    pub quantity: u32,

    /// Amount charged for the line, after discounts
    #[serde(default, rename = "totalDiscountPrice", alias = "lineTotal")]
    pub line_total: u64,
}

/// A placed order with its lines, address and totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    /// Order identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: OrderId,

    /// Placement time
    #[serde(default)]
    pub created_at: Option<Timestamp>,

    /// Ordered lines
    #[serde(default)]
    pub items: Vec<OrderDetailLine>,

    /// Delivery address
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,

    /// Sum of line totals
    #[serde(default)]
    pub subtotal: u64,

    /// Shipping charged
    #[serde(default)]
    pub shipping_fee: u64,

    /// Grand total charged
    #[serde(default)]
    pub total: u64,
}

/// Server acknowledgement of an order submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Whether the order was accepted
    #[serde(default)]
    pub success: bool,

    /// The created order, when returned
    #[serde(default)]
    pub order: Option<OrderRecord>,
}
