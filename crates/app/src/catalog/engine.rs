//! Catalog query engine
//!
//! Owns the listing query and the accumulated result sequence for one
//! browsing session. Every fetch is tagged with a generation; a response that
//! arrives after a newer fetch has started is dropped.

use std::{
    fmt,
    num::NonZeroU32,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use storefront::{
    CatalogFilter, CatalogPage, CatalogQuery, Category, ProductDetail, ProductSummary,
    catalog::CatalogRoute,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    catalog::{
        errors::CatalogError,
        source::{CatalogSource, PageRequest},
    },
    messages,
};

/// Lifecycle of the listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CatalogStatus {
    /// Nothing requested yet
    #[default]
    Idle,

    /// A fetch is in flight
    Loading,

    /// The last fetch succeeded
    Ready,

    /// The last fetch failed; the next `set_filter` or `load_more` retries
    Error(String),
}

/// What happened to a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was applied to the result sequence.
    Applied {
        /// Products received in this page
        received: usize,
    },

    /// A newer fetch started while this one was in flight; its response was
    /// dropped.
    Superseded,

    /// Nothing was requested: a fetch is already in flight or there are no
    /// more pages.
    Skipped,
}

/// Read view published to subscribers after every state change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogView {
    /// Current query
    pub query: CatalogQuery,

    /// Known categories
    pub categories: Vec<Category>,

    /// Accumulated products, in fetch order
    pub products: Vec<ProductSummary>,

    /// Whether `load_more` can fetch another page
    pub has_more: bool,

    /// Listing status
    pub status: CatalogStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchMode {
    Replace,
    Append,
}

#[derive(Debug)]
struct Ticket {
    generation: u64,
    mode: FetchMode,
    request: PageRequest,
}

#[derive(Debug)]
struct CatalogState {
    query: CatalogQuery,
    categories: Vec<Category>,
    products: Vec<ProductSummary>,
    has_more: bool,
    status: CatalogStatus,
    generation: u64,
}

impl CatalogState {
    fn new(page_size: NonZeroU32) -> Self {
        Self {
            query: CatalogQuery::new(page_size),
            categories: Vec::new(),
            products: Vec::new(),
            has_more: true,
            status: CatalogStatus::Idle,
            generation: 0,
        }
    }

    fn begin(&mut self, mode: FetchMode) -> Ticket {
        self.generation += 1;
        self.status = CatalogStatus::Loading;

        let route = self.query.route(&self.categories);

        if let CatalogRoute::Unresolved(category_id) = &route {
            warn!(
                category_id = %category_id,
                "category not resolved to a slug, listing all products"
            );
        }

        Ticket {
            generation: self.generation,
            mode,
            request: PageRequest {
                route,
                params: self.query.params(),
            },
        }
    }

    fn apply(&mut self, mode: FetchMode, page: CatalogPage) -> usize {
        let received = page.products.len();

        match mode {
            FetchMode::Replace => self.products = page.products,
            FetchMode::Append => self.products.extend(page.products),
        }

        // A page claiming more results without a cursor would refetch page one.
        self.has_more = page.has_more && page.next_cursor.is_some();
        self.query.cursor = page.next_cursor;
        self.status = CatalogStatus::Ready;

        received
    }

    fn fail(&mut self, mode: FetchMode) {
        if mode == FetchMode::Replace {
            self.products.clear();
            self.has_more = true;
            self.query.cursor = None;
        }

        self.status = CatalogStatus::Error(messages::CATALOG_FAILED.to_string());
    }

    fn view(&self) -> CatalogView {
        CatalogView {
            query: self.query.clone(),
            categories: self.categories.clone(),
            products: self.products.clone(),
            has_more: self.has_more,
            status: self.status.clone(),
        }
    }
}

/// Drives filtered, cursor-paginated product listing.
pub struct CatalogEngine {
    source: Arc<dyn CatalogSource>,
    state: Mutex<CatalogState>,
    view: watch::Sender<CatalogView>,
}

impl fmt::Debug for CatalogEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEngine")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CatalogEngine {
    /// Engine in the `Idle` state with the default query.
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>, page_size: NonZeroU32) -> Self {
        let state = CatalogState::new(page_size);
        let (view, _receiver) = watch::channel(state.view());

        Self {
            source,
            state: Mutex::new(state),
            view,
        }
    }

    /// Merges a partial filter, rewinds to the first page and replaces the
    /// result sequence with it.
    ///
    /// # Errors
    ///
    /// Returns an error when the fetch fails and is still current; the
    /// listing is then in the `Error` state.
    pub async fn set_filter(&self, filter: CatalogFilter) -> Result<FetchOutcome, CatalogError> {
        let ticket = {
            let mut state = self.lock();

            state.query.apply(filter);

            let ticket = state.begin(FetchMode::Replace);
            self.publish(&state);
            ticket
        };

        self.run(ticket).await
    }

    /// Restores the default query and fetches its first page.
    ///
    /// # Errors
    ///
    /// As [`CatalogEngine::set_filter`].
    pub async fn reset_filters(&self) -> Result<FetchOutcome, CatalogError> {
        let ticket = {
            let mut state = self.lock();

            state.query.reset();

            let ticket = state.begin(FetchMode::Replace);
            self.publish(&state);
            ticket
        };

        self.run(ticket).await
    }

    /// Fetches the next page and appends it.
    ///
    /// Skipped while a fetch is in flight or when there are no more pages.
    ///
    /// # Errors
    ///
    /// As [`CatalogEngine::set_filter`].
    pub async fn load_more(&self) -> Result<FetchOutcome, CatalogError> {
        let ticket = {
            let mut state = self.lock();

            if state.status == CatalogStatus::Loading || !state.has_more {
                debug!(
                    status = ?state.status,
                    has_more = state.has_more,
                    "load more skipped"
                );

                return Ok(FetchOutcome::Skipped);
            }

            let ticket = state.begin(FetchMode::Append);
            self.publish(&state);
            ticket
        };

        self.run(ticket).await
    }

    /// Fetches the category list used to resolve category filters.
    ///
    /// On failure the previously known list is kept.
    ///
    /// # Errors
    ///
    /// Returns an error when the categories endpoint fails.
    pub async fn load_categories(&self) -> Result<usize, CatalogError> {
        match self.source.categories().await {
            Ok(categories) => {
                let mut state = self.lock();
                let count = categories.len();

                state.categories = categories;
                self.publish(&state);

                info!(count, "categories loaded");

                Ok(count)
            }
            Err(error) => {
                warn!(%error, "failed to load categories");

                Err(error.into())
            }
        }
    }

    /// Loads the category list unless it is already known, returning how
    /// many categories are available.
    ///
    /// A failed load leaves the list empty; category filters then fall back
    /// to the unfiltered listing.
    pub async fn ensure_categories(&self) -> usize {
        let known = self.lock().categories.len();

        if known > 0 {
            return known;
        }

        self.load_categories().await.unwrap_or_default()
    }

    /// Fetches one product's detail view.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown slug.
    pub async fn product(&self, slug: &str) -> Result<ProductDetail, CatalogError> {
        self.source
            .product(slug)
            .await
            .map_err(|error| CatalogError::for_product(slug, error))
    }

    /// Current view.
    pub fn view(&self) -> CatalogView {
        self.view.borrow().clone()
    }

    /// Subscribes to view changes.
    pub fn subscribe(&self) -> watch::Receiver<CatalogView> {
        self.view.subscribe()
    }

    async fn run(&self, ticket: Ticket) -> Result<FetchOutcome, CatalogError> {
        let result = self.source.products(&ticket.request).await;

        let mut state = self.lock();

        if state.generation != ticket.generation {
            debug!(
                generation = ticket.generation,
                current = state.generation,
                "discarding stale catalog response"
            );

            return Ok(FetchOutcome::Superseded);
        }

        match result {
            Ok(page) => {
                let received = state.apply(ticket.mode, page);
                self.publish(&state);

                debug!(
                    generation = ticket.generation,
                    received,
                    total = state.products.len(),
                    "catalog page applied"
                );

                Ok(FetchOutcome::Applied { received })
            }
            Err(error) => {
                state.fail(ticket.mode);
                self.publish(&state);

                warn!(generation = ticket.generation, %error, "catalog fetch failed");

                Err(error.into())
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &CatalogState) {
        self.view.send_replace(state.view());
    }
}
