//! Checkout
//!
//! Validates the cart, submits the order and clears the cart once the server
//! accepts it. A failed checkout never touches the cart.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use smallvec::SmallVec;
use storefront::{
    OrderSummary, ProductId,
    orders::{OrderRecord, OrderRequest},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    cart::{CartEngine, RemoteSync},
    gateway::CartGateway,
    http::GatewayError,
    messages,
    notifications::Notifier,
    session::SessionReader,
};

/// Reasons a checkout did not place an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// Ordering requires a signed-in user.
    #[error("not signed in")]
    NotAuthenticated,

    /// Lines that are out of stock or exceed the available stock.
    #[error("{} cart line(s) exceed available stock", .0.len())]
    StockConflict(SmallVec<[ProductId; 4]>),

    /// Another checkout is still running.
    #[error("checkout already in progress")]
    InProgress,

    /// The server rejected the credential.
    #[error("session expired")]
    SessionExpired(#[source] GatewayError),

    /// Any other submission failure.
    #[error("order submission failed")]
    Failed(#[source] GatewayError),

    /// The server answered without accepting the order.
    #[error("order was not accepted")]
    Rejected,
}

impl CheckoutError {
    /// Text shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyCart => messages::EMPTY_CART,
            Self::NotAuthenticated => messages::NOT_AUTHENTICATED,
            Self::StockConflict(_) => messages::STOCK_CONFLICT,
            Self::InProgress => messages::CHECKOUT_IN_PROGRESS,
            Self::SessionExpired(_) => messages::SESSION_EXPIRED,
            Self::Failed(_) | Self::Rejected => messages::CHECKOUT_FAILED,
        }
    }

    /// Whether the failure happened before any network call.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::EmptyCart | Self::NotAuthenticated | Self::StockConflict(_) | Self::InProgress
        )
    }
}

/// A placed order.
#[derive(Debug)]
pub struct CheckoutReceipt {
    /// Order returned by the server, when it sent one
    pub order: Option<OrderRecord>,

    /// Totals that were submitted
    pub summary: OrderSummary,

    /// Server-side clear of the cart that follows the order
    pub cart_cleared: RemoteSync,
}

/// Validates and submits orders.
pub struct CheckoutOrchestrator {
    cart: Arc<CartEngine>,
    gateway: Arc<dyn CartGateway>,
    session: SessionReader,
    notifier: Notifier,
    in_progress: AtomicBool,
}

impl fmt::Debug for CheckoutOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutOrchestrator")
            .field("in_progress", &self.in_progress)
            .finish_non_exhaustive()
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CheckoutOrchestrator {
    /// Orchestrator checking out `cart`.
    pub fn new(
        cart: Arc<CartEngine>,
        gateway: Arc<dyn CartGateway>,
        session: SessionReader,
        notifier: Notifier,
    ) -> Self {
        Self {
            cart,
            gateway,
            session,
            notifier,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Places an order for the current cart.
    ///
    /// Preconditions are checked in order (non-empty cart, signed in, stock)
    /// and the first failure is returned without any network call.
    ///
    /// # Errors
    ///
    /// Returns the failed precondition, or the submission failure with the
    /// cart left as it was.
    pub async fn checkout(&self) -> Result<CheckoutReceipt, CheckoutError> {
        let result = self.place_order().await;

        match &result {
            Ok(receipt) => {
                self.notifier.success(messages::ORDER_PLACED);

                info!(
                    order_id = ?receipt.order.as_ref().map(|order| order.id.to_string()),
                    total = receipt.summary.grand_total,
                    "order placed"
                );
            }
            Err(error) => {
                self.notifier.error(error.user_message());

                warn!(%error, "checkout failed");
            }
        }

        result
    }

    async fn place_order(&self) -> Result<CheckoutReceipt, CheckoutError> {
        let cart = self.cart.snapshot();

        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let Some(token) = self.session.credential() else {
            return Err(CheckoutError::NotAuthenticated);
        };

        let conflicts = cart.stock_conflicts();

        if !conflicts.is_empty() {
            return Err(CheckoutError::StockConflict(conflicts));
        }

        let _in_flight = InFlight::acquire(&self.in_progress).ok_or(CheckoutError::InProgress)?;

        let order = OrderRequest::for_cart(&cart);
        let summary = OrderSummary::for_cart(&cart);

        let receipt = self
            .gateway
            .submit_order(&token, &order)
            .await
            .map_err(|error| {
                if error.is_auth() {
                    CheckoutError::SessionExpired(error)
                } else {
                    CheckoutError::Failed(error)
                }
            })?;

        if !receipt.success {
            return Err(CheckoutError::Rejected);
        }

        Ok(CheckoutReceipt {
            order: receipt.order,
            summary,
            cart_cleared: self.cart.clear(),
        })
    }
}
