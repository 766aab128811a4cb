//! App Context

use std::{num::NonZeroU32, sync::Arc};

use reqwest::StatusCode;
use rusty_money::iso::Currency;
use storefront::{
    OrderId,
    orders::{OrderDetail, OrderRecord},
    pricing::{self, PricingError},
};
use thiserror::Error;
use tracing::info;

use crate::{
    cart::{CartEngine, Hydration},
    catalog::{CatalogEngine, CatalogSource, HttpCatalogSource},
    checkout::CheckoutOrchestrator,
    config::ClientConfig,
    gateway::{CartGateway, HttpCartGateway},
    http::{ApiClient, GatewayError},
    messages,
    notifications::Notifier,
    session::{BearerToken, Session, SessionHandle},
    store::{CartStore, FileCartStore},
};

/// Errors raised while wiring the application.
#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to build http client")]
    Http(#[source] GatewayError),

    #[error(transparent)]
    Currency(#[from] PricingError),
}

/// Failures while reading past orders.
#[derive(Debug, Error)]
pub enum OrderHistoryError {
    /// Order history requires a signed-in user.
    #[error("not signed in")]
    NotAuthenticated,

    /// The server rejected the credential.
    #[error("session expired")]
    SessionExpired(#[source] GatewayError),

    /// No order with this id belongs to the user.
    #[error("order {0} not found")]
    NotFound(OrderId),

    /// Any other failure.
    #[error("failed to load orders")]
    Failed(#[source] GatewayError),
}

impl OrderHistoryError {
    fn from_gateway(error: GatewayError) -> Self {
        if error.is_auth() {
            Self::SessionExpired(error)
        } else {
            Self::Failed(error)
        }
    }

    /// Text shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => messages::NOT_AUTHENTICATED,
            Self::SessionExpired(_) => messages::SESSION_EXPIRED,
            Self::NotFound(_) => messages::ORDER_NOT_FOUND,
            Self::Failed(_) => messages::ORDERS_FAILED,
        }
    }
}

/// Collaborators shared by every storefront operation.
#[derive(Clone)]
pub struct AppContext {
    pub session: Arc<SessionHandle>,
    pub notifier: Notifier,
    pub catalog: Arc<CatalogEngine>,
    pub cart: Arc<CartEngine>,
    pub checkout: Arc<CheckoutOrchestrator>,
    pub gateway: Arc<dyn CartGateway>,
    pub currency: &'static Currency,
}

impl AppContext {
    /// Build application context from the client configuration.
    ///
    /// The session starts as a guest and the cart is not hydrated yet; see
    /// [`AppContext::sign_in`] and [`CartEngine::hydrate`].
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be built or the currency
    /// code is unknown.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AppInitError> {
        let api = ApiClient::new(&config.api_url, config.request_timeout())
            .map_err(AppInitError::Http)?;

        Ok(Self::from_parts(
            Arc::new(FileCartStore::new(&config.data_dir)),
            Arc::new(HttpCartGateway::new(api.clone())),
            Arc::new(HttpCatalogSource::new(api)),
            Session::guest(),
            Notifier::new(config.notification_ttl()),
            config.page_size,
            pricing::currency(&config.currency)?,
        ))
    }

    /// Wires the engines over the given collaborators.
    pub fn from_parts(
        store: Arc<dyn CartStore>,
        gateway: Arc<dyn CartGateway>,
        source: Arc<dyn CatalogSource>,
        session: Session,
        notifier: Notifier,
        page_size: NonZeroU32,
        currency: &'static Currency,
    ) -> Self {
        let session = Arc::new(SessionHandle::new(session));

        let cart = Arc::new(CartEngine::new(
            store,
            Arc::clone(&gateway),
            session.reader(),
            notifier.clone(),
        ));

        let checkout = Arc::new(CheckoutOrchestrator::new(
            Arc::clone(&cart),
            Arc::clone(&gateway),
            session.reader(),
            notifier.clone(),
        ));

        Self {
            catalog: Arc::new(CatalogEngine::new(source, page_size)),
            session,
            notifier,
            cart,
            checkout,
            gateway,
            currency,
        }
    }

    /// Replaces the session with a signed-in one and loads the server cart.
    pub async fn sign_in(&self, token: BearerToken) -> Hydration {
        self.session.replace(Session::authenticated(token));

        info!("signed in");

        self.cart.hydrate().await
    }

    /// Replaces the session with a guest one and empties the local cart. The
    /// server cart is left as it is.
    pub fn sign_out(&self) {
        self.session.replace(Session::guest());
        self.cart.reset_local();

        info!("signed out");
    }

    /// Lists past orders.
    ///
    /// # Errors
    ///
    /// Returns an error when signed out or when the request fails.
    pub async fn order_history(&self) -> Result<Vec<OrderRecord>, OrderHistoryError> {
        let token = self.credential()?;

        self.gateway
            .list_orders(&token)
            .await
            .map_err(OrderHistoryError::from_gateway)
    }

    /// Fetches one placed order with its lines, address and totals.
    ///
    /// # Errors
    ///
    /// Returns an error when signed out, when the order does not exist or
    /// when the request fails.
    pub async fn order_detail(&self, order: &OrderId) -> Result<OrderDetail, OrderHistoryError> {
        let token = self.credential()?;

        self.gateway
            .fetch_order(&token, order)
            .await
            .map_err(|error| match error.status() {
                Some(StatusCode::NOT_FOUND) => OrderHistoryError::NotFound(order.clone()),
                _ => OrderHistoryError::from_gateway(error),
            })
    }

    fn credential(&self) -> Result<BearerToken, OrderHistoryError> {
        self.session
            .current()
            .credential()
            .cloned()
            .ok_or(OrderHistoryError::NotAuthenticated)
    }

    /// Formats an amount in the configured currency.
    pub fn format_price(&self, amount: u64) -> String {
        pricing::format_price(amount, self.currency)
    }
}
