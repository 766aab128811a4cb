//! Storefront
//!
//! Domain model for the storefront client: the cart and its totals, the
//! catalog query, shipping policy and order payloads. Everything here is pure
//! and synchronous; network and storage live in `storefront-app`.

pub mod cart;
pub mod catalog;
pub mod ids;
pub mod orders;
pub mod pricing;
pub mod quantity;

pub use cart::{Cart, CartError, CartLine};
pub use catalog::{CatalogFilter, CatalogPage, CatalogQuery, Category, ProductDetail, ProductSummary};
pub use ids::{CategoryId, OrderId, ProductId};
pub use pricing::OrderSummary;
