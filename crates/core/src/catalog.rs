//! Catalog
//!
//! Product listing query state and the shapes the product endpoints return.

use std::{
    fmt::{self, Display, Formatter},
    num::NonZeroU32,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{CategoryId, ProductId};

/// Default number of products requested per page.
pub const DEFAULT_PAGE_SIZE: NonZeroU32 = match NonZeroU32::new(12) {
    Some(size) => size,
    None => NonZeroU32::MIN,
};

/// Errors raised when parsing catalog query values from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogParseError {
    /// Unknown sort field.
    #[error("unknown sort field `{0}` (expected createdAt, price or name)")]
    SortField(String),

    /// Unknown sort order.
    #[error("unknown sort order `{0}` (expected asc or desc)")]
    SortOrder(String),
}

/// Field the product listing is sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    /// Creation time
    #[default]
    CreatedAt,

    /// Unit price
    Price,

    /// Display name
    Name,
}

impl SortField {
    /// Wire name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "createdAt",
            Self::Price => "price",
            Self::Name => "name",
        }
    }
}

impl Display for SortField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = CatalogParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "createdAt" | "created_at" | "created" => Ok(Self::CreatedAt),
            "price" => Ok(Self::Price),
            "name" => Ok(Self::Name),
            other => Err(CatalogParseError::SortField(other.to_string())),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending
    Asc,

    /// Descending
    #[default]
    Desc,
}

impl SortOrder {
    /// Wire name of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = CatalogParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(CatalogParseError::SortOrder(other.to_string())),
        }
    }
}

/// Product category as listed by the categories endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: CategoryId,

    /// Display name
    pub name: String,

    /// URL slug used by the category listing endpoint
    pub slug: String,
}

/// Category reference embedded in product payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    /// Category identifier, when the server includes it
    #[serde(default, rename = "_id", alias = "id")]
    pub id: Option<CategoryId>,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    /// URL slug
    #[serde(default)]
    pub slug: Option<String>,
}

/// Product as it appears in a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    /// Product identifier
    #[serde(alias = "_id")]
    pub id: ProductId,

    /// Display name
    pub name: String,

    /// URL slug of the detail view
    pub slug: String,

    /// Unit price in minor units
    pub price: u64,

    /// Image URLs, first one is the thumbnail
    #[serde(default)]
    pub images: Vec<String>,

    /// Units in stock
    #[serde(default)]
    pub stock: u32,

    /// Whether the product can be bought
    #[serde(default)]
    pub in_stock: bool,

    /// Owning category
    #[serde(default)]
    pub category: Option<CategoryRef>,
}

/// Product as returned by the detail endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    /// Product identifier
    #[serde(alias = "_id")]
    pub id: ProductId,

    /// Display name
    pub name: String,

    /// URL slug
    pub slug: String,

    /// Unit price in minor units
    pub price: u64,

    /// Image URLs
    #[serde(default)]
    pub images: Vec<String>,

    /// Units in stock
    #[serde(default)]
    pub stock: u32,

    /// Whether the product can be bought
    #[serde(default)]
    pub in_stock: bool,

    /// Owning category
    #[serde(default)]
    pub category: Option<CategoryRef>,

    /// Long description
    #[serde(default)]
    pub description: Option<String>,
}

impl ProductDetail {
    /// First image, used as the cart thumbnail.
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// One page of listing results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPage {
    /// Products in server order
    #[serde(default)]
    pub products: Vec<ProductSummary>,

    /// Whether another page exists
    #[serde(default)]
    pub has_more: bool,

    /// Continuation token for the next page
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Partial update merged into a [`CatalogQuery`].
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    /// New search text
    pub search_text: Option<String>,

    /// New category selection; `Some(None)` selects all categories
    pub category_id: Option<Option<CategoryId>>,

    /// New sort field
    pub sort_field: Option<SortField>,

    /// New sort order
    pub sort_order: Option<SortOrder>,
}

impl CatalogFilter {
    /// Replaces the search text.
    #[must_use]
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    /// Restricts the listing to one category.
    #[must_use]
    pub fn category(mut self, id: CategoryId) -> Self {
        self.category_id = Some(Some(id));
        self
    }

    /// Removes any category restriction.
    #[must_use]
    pub fn all_categories(mut self) -> Self {
        self.category_id = Some(None);
        self
    }

    /// Replaces the sort field and direction.
    #[must_use]
    pub fn sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_field = Some(field);
        self.sort_order = Some(order);
        self
    }
}

/// Endpoint a listing request is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRoute {
    /// Unfiltered product listing
    All,

    /// Listing restricted to a category slug
    Category(String),

    /// A category was selected but could not be resolved to a slug; the
    /// unfiltered listing is used instead of failing the request.
    Unresolved(CategoryId),
}

/// Listing query owned by one catalog session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Raw search text; trimmed before use
    pub search_text: String,

    /// Selected category
    pub category_id: Option<CategoryId>,

    /// Sort field
    pub sort_field: SortField,

    /// Sort direction
    pub sort_order: SortOrder,

    /// Continuation token; `None` requests the first page
    pub cursor: Option<String>,

    /// Products per page
    pub page_size: NonZeroU32,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl CatalogQuery {
    /// Default query (no search, all categories, newest first).
    #[must_use]
    pub fn new(page_size: NonZeroU32) -> Self {
        Self {
            search_text: String::new(),
            category_id: None,
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
            cursor: None,
            page_size,
        }
    }

    /// Merges a partial filter and rewinds to the first page.
    pub fn apply(&mut self, filter: CatalogFilter) {
        if let Some(text) = filter.search_text {
            self.search_text = text;
        }

        if let Some(category) = filter.category_id {
            self.category_id = category;
        }

        if let Some(field) = filter.sort_field {
            self.sort_field = field;
        }

        if let Some(order) = filter.sort_order {
            self.sort_order = order;
        }

        self.cursor = None;
    }

    /// Restores defaults, keeping the page size.
    pub fn reset(&mut self) {
        *self = Self::new(self.page_size);
    }

    /// Trimmed search text, or `None` when there is nothing to search for.
    pub fn search_term(&self) -> Option<&str> {
        let trimmed = self.search_text.trim();

        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Resolves the selected category against the loaded category list.
    #[must_use]
    pub fn route(&self, categories: &[Category]) -> CatalogRoute {
        let Some(category_id) = &self.category_id else {
            return CatalogRoute::All;
        };

        categories
            .iter()
            .find(|category| &category.id == category_id && !category.slug.is_empty())
            .map_or_else(
                || CatalogRoute::Unresolved(category_id.clone()),
                |category| CatalogRoute::Category(category.slug.clone()),
            )
    }

    /// Query string parameters for the current page.
    ///
    /// Sort and page size are always sent; search and cursor only when set.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("limit", self.page_size.to_string()),
            ("sort", self.sort_field.as_str().to_string()),
            ("order", self.sort_order.as_str().to_string()),
        ];

        if let Some(term) = self.search_term() {
            params.push(("search", term.to_string()));
        }

        if let Some(cursor) = &self.cursor {
            params.push(("cursor", cursor.clone()));
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn categories() -> Vec<Category> {
        vec![
            Category {
                id: CategoryId::new("c1"),
                name: "Phones".to_string(),
                slug: "phones".to_string(),
            },
            Category {
                id: CategoryId::new("c2"),
                name: "Laptops".to_string(),
                slug: "laptops".to_string(),
            },
        ]
    }

    #[test]
    fn default_query_sorts_newest_first() {
        let query = CatalogQuery::default();

        assert_eq!(
            query.params(),
            vec![
                ("limit", "12".to_string()),
                ("sort", "createdAt".to_string()),
                ("order", "desc".to_string()),
            ]
        );
    }

    #[test]
    fn blank_search_text_is_not_sent() {
        let mut query = CatalogQuery::default();
        query.apply(CatalogFilter::default().search("   "));

        assert_eq!(query.search_term(), None);
        assert!(query.params().iter().all(|(key, _)| *key != "search"));
    }

    #[test]
    fn search_text_is_trimmed() {
        let mut query = CatalogQuery::default();
        query.apply(CatalogFilter::default().search("  phone  "));

        assert!(query.params().contains(&("search", "phone".to_string())));
    }

    #[test]
    fn apply_resets_cursor_and_keeps_untouched_fields() {
        let mut query = CatalogQuery::default();
        query.apply(CatalogFilter::default().sort(SortField::Price, SortOrder::Asc));
        query.cursor = Some("abc".to_string());

        query.apply(CatalogFilter::default().search("tv"));

        assert_eq!(query.cursor, None);
        assert_eq!(query.sort_field, SortField::Price);
        assert_eq!(query.sort_order, SortOrder::Asc);
        assert_eq!(query.search_text, "tv");
    }

    #[test]
    fn cursor_is_sent_when_present() {
        let mut query = CatalogQuery::default();
        query.cursor = Some("next-1".to_string());

        assert!(query.params().contains(&("cursor", "next-1".to_string())));
    }

    #[test]
    fn known_category_routes_to_slug_endpoint() {
        let mut query = CatalogQuery::default();
        query.apply(CatalogFilter::default().category(CategoryId::new("c2")));

        let route = query.route(&categories());

        assert_eq!(route, CatalogRoute::Category("laptops".to_string()));
    }

    #[test]
    fn unknown_category_falls_back_to_unfiltered_listing() {
        let mut query = CatalogQuery::default();
        query.apply(CatalogFilter::default().category(CategoryId::new("missing")));

        let route = query.route(&categories());

        assert_eq!(route, CatalogRoute::Unresolved(CategoryId::new("missing")));
    }

    #[test]
    fn category_falls_back_when_list_not_loaded() {
        let mut query = CatalogQuery::default();
        query.apply(CatalogFilter::default().category(CategoryId::new("c1")));

        assert_eq!(
            query.route(&[]),
            CatalogRoute::Unresolved(CategoryId::new("c1"))
        );
    }

    #[test]
    fn reset_keeps_page_size() -> TestResult {
        let page_size = NonZeroU32::try_from(24_u32)?;
        let mut query = CatalogQuery::new(page_size);
        query.apply(
            CatalogFilter::default()
                .search("tv")
                .category(CategoryId::new("c1")),
        );

        query.reset();

        assert_eq!(query, CatalogQuery::new(page_size));

        Ok(())
    }

    #[test]
    fn sort_values_parse_from_wire_names() -> TestResult {
        assert_eq!("createdAt".parse::<SortField>()?, SortField::CreatedAt);
        assert_eq!("price".parse::<SortField>()?, SortField::Price);
        assert_eq!("asc".parse::<SortOrder>()?, SortOrder::Asc);
        assert!(
            "sideways".parse::<SortOrder>().is_err(),
            "unknown sort order"
        );

        Ok(())
    }

    #[test]
    fn page_decodes_with_missing_fields() -> TestResult {
        let page: CatalogPage = serde_json::from_str(
            r#"{"products":[{"_id":"p1","name":"Phone","slug":"phone","price":1000}]}"#,
        )?;

        assert_eq!(page.products.len(), 1);
        assert!(!page.has_more, "has_more defaults to false");
        assert_eq!(page.next_cursor, None);

        Ok(())
    }
}
