//! Catalog errors.

use reqwest::StatusCode;
use thiserror::Error;

use crate::{http::GatewayError, messages};

/// Errors returned by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No product has the requested slug.
    #[error("product {0} not found")]
    NotFound(String),

    /// The product service failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl CatalogError {
    /// Text shown next to the retry affordance.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound(_) => messages::PRODUCT_NOT_FOUND,
            Self::Gateway(_) => messages::CATALOG_FAILED,
        }
    }

    pub(crate) fn for_product(slug: &str, error: GatewayError) -> Self {
        if error.status() == Some(StatusCode::NOT_FOUND) {
            return Self::NotFound(slug.to_string());
        }

        Self::Gateway(error)
    }
}
