//! Catalog browsing.

mod engine;
mod errors;
mod source;

pub use engine::{CatalogEngine, CatalogStatus, CatalogView, FetchOutcome};
pub use errors::CatalogError;
pub use source::{CatalogSource, HttpCatalogSource, MockCatalogSource, PageRequest};
