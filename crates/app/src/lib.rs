//! Storefront client services: session, persisted cart, REST gateway and the
//! cart, catalog and checkout engines built on top of them.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod context;
pub mod gateway;
pub mod http;
pub mod messages;
pub mod notifications;
pub mod observability;
pub mod session;
pub mod store;
