//! Catalog source.

use async_trait::async_trait;
use mockall::automock;
use reqwest::{Method, Url};
use storefront::{CatalogPage, Category, ProductDetail, catalog::CatalogRoute};

use crate::http::{ApiClient, GatewayError};

/// One listing request: where it goes and what it asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Endpoint the request is sent to
    pub route: CatalogRoute,

    /// Query string parameters
    pub params: Vec<(&'static str, String)>,
}

impl PageRequest {
    /// Value of a query parameter, if present.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// HTTP implementation of [`CatalogSource`]. Catalog browsing never sends a
/// credential.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    api: ApiClient,
}

impl HttpCatalogSource {
    /// Source sending requests through `api`.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn page_url(&self, route: &CatalogRoute) -> Url {
        match route {
            CatalogRoute::All | CatalogRoute::Unresolved(_) => self.api.endpoint(&["products"]),
            CatalogRoute::Category(slug) => {
                self.api.endpoint(&["products", "category", slug.as_str()])
            }
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn categories(&self) -> Result<Vec<Category>, GatewayError> {
        self.api
            .execute_json(self.api.request(Method::GET, "categories", None))
            .await
    }

    async fn products(&self, request: &PageRequest) -> Result<CatalogPage, GatewayError> {
        let builder = self
            .api
            .request_to(Method::GET, self.page_url(&request.route), None)
            .query(&request.params);

        self.api.execute_json(builder).await
    }

    async fn product(&self, slug: &str) -> Result<ProductDetail, GatewayError> {
        let url = self.api.endpoint(&["products", slug]);

        self.api
            .execute_json(self.api.request_to(Method::GET, url, None))
            .await
    }
}

/// Read-only product endpoints.
#[automock]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Lists every category.
    async fn categories(&self) -> Result<Vec<Category>, GatewayError>;

    /// Fetches one page of products.
    async fn products(&self, request: &PageRequest) -> Result<CatalogPage, GatewayError>;

    /// Fetches a product's detail view.
    async fn product(&self, slug: &str) -> Result<ProductDetail, GatewayError>;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use storefront::{CatalogQuery, CategoryId};
    use testresult::TestResult;

    use super::*;

    #[test]
    fn page_request_builds_category_url_with_params() -> TestResult {
        let source = HttpCatalogSource::new(ApiClient::new(
            "http://localhost:3000",
            Duration::from_secs(1),
        )?);
        let mut query = CatalogQuery::default();
        query.search_text = "  phone ".to_string();

        let request = PageRequest {
            route: CatalogRoute::Category("phones".to_string()),
            params: query.params(),
        };

        let built = source
            .api
            .request_to(Method::GET, source.page_url(&request.route), None)
            .query(&request.params)
            .build()?;

        assert_eq!(
            built.url().as_str(),
            "http://localhost:3000/products/category/phones?limit=12&sort=createdAt&order=desc&search=phone"
        );
        assert_eq!(request.param("search"), Some("phone"));
        assert_eq!(request.param("cursor"), None);

        Ok(())
    }

    #[test]
    fn slugs_cannot_escape_their_path_segment() -> TestResult {
        let source = HttpCatalogSource::new(ApiClient::new(
            "http://localhost:3000",
            Duration::from_secs(1),
        )?);

        let url = source.page_url(&CatalogRoute::Category("tv/audio?x#y".to_string()));

        assert_eq!(
            url.as_str(),
            "http://localhost:3000/products/category/tv%2Faudio%3Fx%23y"
        );
        assert_eq!(
            source.page_url(&CatalogRoute::Unresolved(CategoryId::new("c9"))).as_str(),
            "http://localhost:3000/products"
        );

        Ok(())
    }
}
