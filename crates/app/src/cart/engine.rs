//! Cart synchronization engine
//!
//! Owns the in-memory cart. Mutations apply locally, persist the full
//! snapshot and notify subscribers before any network call; the matching
//! gateway call then runs in the background. A failed call never rolls the
//! local change back. Only [`CartEngine::hydrate`] replaces the cart
//! wholesale.

use std::{
    fmt,
    future::Future,
    num::NonZeroU32,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use storefront::{
    Cart, CartError, CartLine, OrderSummary, ProductDetail, ProductId,
    quantity::parse_quantity_input,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    cart::sync::{RemoteSync, SyncStatus},
    gateway::CartGateway,
    http::GatewayError,
    messages,
    notifications::Notifier,
    session::{BearerToken, SessionReader},
    store::{CartStore, StoreError},
};

/// Result of a single-line mutation.
#[derive(Debug)]
pub enum CartUpdate {
    /// The line now holds `quantity` units.
    Applied {
        /// Quantity after clamping
        quantity: u32,

        /// Server confirmation
        sync: RemoteSync,
    },

    /// The line was removed.
    Removed {
        /// The removed line
        line: CartLine,

        /// Server confirmation
        sync: RemoteSync,
    },

    /// The requested value equals the current one; nothing was sent.
    Unchanged {
        /// Current quantity
        quantity: u32,
    },

    /// The product has no line; nothing happened.
    NotInCart,
}

impl CartUpdate {
    /// Server confirmation, when one was started.
    pub fn into_sync(self) -> Option<RemoteSync> {
        match self {
            Self::Applied { sync, .. } | Self::Removed { sync, .. } => Some(sync),
            Self::Unchanged { .. } | Self::NotInCart => None,
        }
    }
}

/// Where the hydrated cart came from.
#[derive(Debug)]
pub enum Hydration {
    /// No credential; the stored guest cart is used.
    Guest,

    /// The server cart replaced the local one.
    Server,

    /// The server could not be reached; the stored cart is kept.
    LocalFallback(GatewayError),
}

/// How `add_line` moved an existing quantity.
enum LineChange {
    Added(u32),
    Lowered,
}

/// Owns the cart and keeps the store and the server in step with it.
pub struct CartEngine {
    cart: Mutex<Cart>,
    store: Arc<dyn CartStore>,
    gateway: Arc<dyn CartGateway>,
    session: SessionReader,
    notifier: Notifier,
    snapshots: watch::Sender<Cart>,
}

impl fmt::Debug for CartEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartEngine")
            .field("cart", &self.cart)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl CartEngine {
    /// Engine with an empty cart; call [`CartEngine::hydrate`] to load it.
    pub fn new(
        store: Arc<dyn CartStore>,
        gateway: Arc<dyn CartGateway>,
        session: SessionReader,
        notifier: Notifier,
    ) -> Self {
        let (snapshots, _receiver) = watch::channel(Cart::new());

        Self {
            cart: Mutex::new(Cart::new()),
            store,
            gateway,
            session,
            notifier,
            snapshots,
        }
    }

    /// Loads the stored cart, then, when signed in, replaces it with the
    /// server cart and persists the result.
    pub async fn hydrate(&self) -> Hydration {
        let stored = self.load_stored();

        {
            let mut cart = self.lock();
            *cart = stored;
            self.commit(&cart);
        }

        let Some(token) = self.session.credential() else {
            debug!("no credential, using stored guest cart");

            return Hydration::Guest;
        };

        match self.gateway.fetch_cart(&token).await {
            Ok(lines) => {
                let mut cart = self.lock();
                *cart = Cart::from_lines(lines);
                self.commit(&cart);

                info!(lines = cart.len(), "cart replaced from server");

                Hydration::Server
            }
            Err(error) => {
                warn!(%error, "failed to fetch server cart, keeping stored cart");

                Hydration::LocalFallback(error)
            }
        }
    }

    /// Sets a line's quantity, clamped to its stock limit. Zero removes the
    /// line.
    pub fn set_quantity(&self, product: &ProductId, quantity: u32) -> CartUpdate {
        let Some(requested) = NonZeroU32::new(quantity) else {
            return self.remove(product);
        };

        let (applied, message) = {
            let mut cart = self.lock();

            let Some(previous) = cart.get(product).map(|line| line.quantity) else {
                debug!(product_id = %product, "set quantity on a product not in the cart");

                return CartUpdate::NotInCart;
            };

            let applied = match cart.set_quantity(product, requested) {
                Ok(applied) => applied,
                Err(error) => {
                    debug!(product_id = %product, %error, "set quantity rejected");

                    return CartUpdate::NotInCart;
                }
            };

            if applied == previous {
                return CartUpdate::Unchanged { quantity: applied };
            }

            self.commit(&cart);

            (applied, cart.get(product).map(messages::quantity_updated))
        };

        if let Some(message) = message {
            self.notifier.success(message);
        }

        let product = product.clone();

        let sync = self.confirm("update", true, move |gateway, token| async move {
            gateway.update_quantity(&token, &product, applied).await
        });

        CartUpdate::Applied {
            quantity: applied,
            sync,
        }
    }

    /// Applies free-text quantity input. Input that is not a non-negative
    /// number keeps the current quantity.
    pub fn set_quantity_input(&self, product: &ProductId, input: &str) -> CartUpdate {
        let Some(previous) = self.lock().get(product).map(|line| line.quantity) else {
            return CartUpdate::NotInCart;
        };

        self.set_quantity(product, parse_quantity_input(input, previous))
    }

    /// Removes a product's line.
    pub fn remove(&self, product: &ProductId) -> CartUpdate {
        let line = {
            let mut cart = self.lock();

            let Some(line) = cart.remove(product) else {
                debug!(product_id = %product, "remove on a product not in the cart");

                return CartUpdate::NotInCart;
            };

            self.commit(&cart);
            line
        };

        self.notifier.success(messages::removed(&line));

        let product = product.clone();

        let sync = self.confirm("remove", true, move |gateway, token| async move {
            gateway.remove_item(&token, &product).await
        });

        CartUpdate::Removed { line, sync }
    }

    /// Empties the cart. A failed server call is not reported.
    pub fn clear(&self) -> RemoteSync {
        self.clear_local();
        self.notifier.success(messages::CART_CLEARED);

        self.confirm("clear", false, |gateway, token| async move {
            gateway.clear(&token).await
        })
    }

    /// Adds units of a product from its detail view, summing with an
    /// existing line.
    ///
    /// The existing line also takes the product's current stock figures, so
    /// a stock drop can lower its quantity; the server is then sent the new
    /// quantity instead of an added delta.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for a zero quantity.
    pub fn add_line(&self, product: &ProductDetail, quantity: u32) -> Result<CartUpdate, CartError> {
        let incoming = CartLine::from_product(product, quantity)?;

        let (change, applied, message) = {
            let mut cart = self.lock();

            let before = cart.get(&product.id).cloned();
            let previous = before.as_ref().map_or(0, |line| line.quantity);
            let applied = cart.add(incoming)?;

            if applied == previous {
                if cart.get(&product.id) != before.as_ref() {
                    debug!(product_id = %product.id, "stock figures refreshed");

                    self.commit(&cart);
                }

                debug!(product_id = %product.id, applied, "line already at its limit");

                return Ok(CartUpdate::Unchanged { quantity: applied });
            }

            self.commit(&cart);

            let line = cart.get(&product.id);

            if applied > previous {
                (
                    LineChange::Added(applied - previous),
                    applied,
                    line.map(messages::added),
                )
            } else {
                info!(
                    product_id = %product.id,
                    previous,
                    applied,
                    "line lowered to available stock"
                );

                (
                    LineChange::Lowered,
                    applied,
                    line.map(messages::quantity_updated),
                )
            }
        };

        if let Some(message) = message {
            self.notifier.success(message);
        }

        let product_id = product.id.clone();

        let sync = match change {
            LineChange::Added(added) => {
                self.confirm("add", true, move |gateway, token| async move {
                    gateway.add_item(&token, &product_id, added).await
                })
            }
            LineChange::Lowered => {
                self.confirm("update", true, move |gateway, token| async move {
                    gateway.update_quantity(&token, &product_id, applied).await
                })
            }
        };

        Ok(CartUpdate::Applied {
            quantity: applied,
            sync,
        })
    }

    /// Empties the cart locally without telling the server, used on sign-out.
    pub fn reset_local(&self) {
        self.clear_local();
    }

    /// `Σ unit_price × quantity` over the current lines.
    pub fn total(&self) -> u64 {
        self.lock().total()
    }

    /// `Σ quantity` over the current lines.
    pub fn count(&self) -> u64 {
        self.lock().count()
    }

    /// Copy of the current cart.
    pub fn snapshot(&self) -> Cart {
        self.lock().clone()
    }

    /// Subtotal, shipping and grand total of the current cart.
    pub fn summary(&self) -> OrderSummary {
        OrderSummary::for_cart(&self.lock())
    }

    /// Subscribes to cart snapshots, published after every change.
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.snapshots.subscribe()
    }

    fn clear_local(&self) {
        let mut cart = self.lock();

        cart.clear();
        self.commit(&cart);
    }

    fn load_stored(&self) -> Cart {
        match self.store.load() {
            Ok(lines) => Cart::from_lines(lines),
            Err(StoreError::Corrupt(error)) => {
                warn!(%error, "stored cart is corrupt, starting empty");

                Cart::new()
            }
            Err(error) => {
                warn!(%error, "failed to read stored cart, starting empty");

                Cart::new()
            }
        }
    }

    /// Persists the full snapshot and publishes it. Called with the cart
    /// locked so writes land in mutation order.
    fn commit(&self, cart: &Cart) {
        if let Err(error) = self.store.save(cart.lines()) {
            warn!(%error, "failed to persist cart");
        }

        self.snapshots.send_replace(cart.clone());
    }

    fn confirm<F, Fut>(&self, action: &'static str, report_failure: bool, call: F) -> RemoteSync
    where
        F: FnOnce(Arc<dyn CartGateway>, BearerToken) -> Fut,
        Fut: Future<Output = Result<(), GatewayError>> + Send + 'static,
    {
        let Some(token) = self.session.credential() else {
            return RemoteSync::local_only();
        };

        let confirmation = call(Arc::clone(&self.gateway), token);
        let notifier = self.notifier.clone();

        RemoteSync::spawn(async move {
            match confirmation.await {
                Ok(()) => {
                    debug!(action, "cart change confirmed");

                    SyncStatus::Confirmed
                }
                Err(error) => {
                    warn!(action, %error, "cart change not confirmed, keeping local state");

                    if report_failure {
                        notifier.error(messages::CART_SYNC_FAILED);
                    }

                    SyncStatus::Failed(error)
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use testresult::TestResult;

    use super::*;
    use crate::{
        gateway::MockCartGateway,
        notifications::NotificationKind,
        session::{Session, SessionHandle},
        store::MemoryCartStore,
    };

    const STORED: &str = r#"[
        {"productId":"p1","name":"Phone","unitPrice":100000,"quantity":2,"availableStock":5,"inStock":true},
        {"productId":"p2","name":"Case","unitPrice":250000,"quantity":1,"availableStock":3,"inStock":true}
    ]"#;

    struct Harness {
        engine: CartEngine,
        store: Arc<MemoryCartStore>,
        notifier: Notifier,
        _session: SessionHandle,
    }

    fn stored_cart() -> Vec<CartLine> {
        serde_json::from_str(STORED).unwrap_or_default()
    }

    fn harness(gateway: MockCartGateway, store: MemoryCartStore, signed_in: bool) -> Harness {
        let session = if signed_in {
            SessionHandle::new(
                BearerToken::new("token")
                    .map(Session::authenticated)
                    .unwrap_or_default(),
            )
        } else {
            SessionHandle::default()
        };

        let store = Arc::new(store);
        let notifier = Notifier::default();

        let engine = CartEngine::new(
            Arc::clone(&store) as Arc<dyn CartStore>,
            Arc::new(gateway),
            session.reader(),
            notifier.clone(),
        );

        Harness {
            engine,
            store,
            notifier,
            _session: session,
        }
    }

    fn stored_lines(store: &MemoryCartStore) -> TestResult<Vec<CartLine>> {
        Ok(serde_json::from_str(&store.raw().ok_or("store is empty")?)?)
    }

    fn detail(id: &str, price: u64, stock: u32) -> ProductDetail {
        ProductDetail {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            slug: id.to_string(),
            price,
            images: vec![format!("{id}.png")],
            stock,
            in_stock: stock > 0,
            category: None,
            description: None,
        }
    }

    fn server_error() -> GatewayError {
        GatewayError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: String::new(),
        }
    }

    #[tokio::test]
    async fn guest_hydrate_uses_stored_cart_without_network() {
        let mut gateway = MockCartGateway::new();
        gateway.expect_fetch_cart().never();

        let h = harness(gateway, MemoryCartStore::with_raw(STORED), false);

        let hydration = h.engine.hydrate().await;

        assert!(
            matches!(hydration, Hydration::Guest),
            "expected guest hydration, got {hydration:?}"
        );
        assert_eq!(h.engine.total(), 450_000);
        assert_eq!(h.engine.count(), 3);
    }

    #[tokio::test]
    async fn signed_in_hydrate_replaces_local_with_server_cart() -> TestResult {
        let mut gateway = MockCartGateway::new();

        gateway.expect_fetch_cart().once().return_once(|_| {
            let lines: Vec<CartLine> = serde_json::from_str(
                r#"[{"productId":"p9","name":"Lamp","unitPrice":70000,"quantity":4,"availableStock":9,"inStock":true}]"#,
            )
            .unwrap_or_default();

            Ok(lines)
        });

        let h = harness(gateway, MemoryCartStore::with_raw(STORED), true);

        let hydration = h.engine.hydrate().await;

        assert!(
            matches!(hydration, Hydration::Server),
            "expected server hydration, got {hydration:?}"
        );

        let stored = stored_lines(&h.store)?;

        assert_eq!(stored.len(), 1);
        assert_eq!(stored.first().map(|line| line.product_id.as_str()), Some("p9"));
        assert_eq!(h.engine.total(), 280_000);

        Ok(())
    }

    #[tokio::test]
    async fn failed_server_fetch_keeps_stored_cart() {
        let mut gateway = MockCartGateway::new();
        gateway
            .expect_fetch_cart()
            .once()
            .return_once(|_| Err(server_error()));

        let h = harness(gateway, MemoryCartStore::with_raw(STORED), true);

        let hydration = h.engine.hydrate().await;

        assert!(
            matches!(hydration, Hydration::LocalFallback(_)),
            "expected local fallback, got {hydration:?}"
        );
        assert_eq!(h.engine.count(), 3);
    }

    #[tokio::test]
    async fn corrupt_store_hydrates_empty() {
        let h = harness(
            MockCartGateway::new(),
            MemoryCartStore::with_raw("{not json"),
            false,
        );

        h.engine.hydrate().await;

        assert!(h.engine.snapshot().is_empty(), "cart should be empty");
    }

    #[tokio::test]
    async fn set_quantity_clamps_to_stock_and_persists() -> TestResult {
        let mut gateway = MockCartGateway::new();

        gateway
            .expect_update_quantity()
            .once()
            .withf(|_, product, quantity| product.as_str() == "p1" && *quantity == 5)
            .return_once(|_, _, _| Ok(()));

        gateway
            .expect_fetch_cart()
            .once()
            .return_once(|_| Ok(stored_cart()));

        let h = harness(gateway, MemoryCartStore::new(), true);
        h.engine.hydrate().await;

        let update = h.engine.set_quantity(&ProductId::new("p1"), 40);

        let CartUpdate::Applied { quantity, sync } = update else {
            return Err(format!("expected applied, got {update:?}").into());
        };

        assert_eq!(quantity, 5);
        assert!(sync.settled().await.is_confirmed(), "update should confirm");

        let stored = stored_lines(&h.store)?;

        assert_eq!(stored.first().map(|line| line.quantity), Some(5));

        Ok(())
    }

    #[tokio::test]
    async fn failed_update_keeps_local_value() -> TestResult {
        let mut gateway = MockCartGateway::new();

        gateway
            .expect_fetch_cart()
            .once()
            .return_once(|_| Ok(stored_cart()));
        gateway
            .expect_update_quantity()
            .once()
            .return_once(|_, _, _| Err(server_error()));

        let h = harness(gateway, MemoryCartStore::new(), true);
        h.engine.hydrate().await;

        let update = h.engine.set_quantity(&ProductId::new("p2"), 3);
        let sync = update.into_sync().ok_or("expected a remote call")?;

        assert!(
            matches!(sync.settled().await, SyncStatus::Failed(_)),
            "update should fail"
        );
        assert_eq!(
            h.engine.snapshot().get(&ProductId::new("p2")).map(|line| line.quantity),
            Some(3)
        );
        assert_eq!(
            h.notifier.current().map(|n| n.kind),
            Some(NotificationKind::Error)
        );

        Ok(())
    }

    #[tokio::test]
    async fn zero_quantity_removes_the_line() {
        let h = harness(
            MockCartGateway::new(),
            MemoryCartStore::with_raw(STORED),
            false,
        );
        h.engine.hydrate().await;

        let update = h.engine.set_quantity(&ProductId::new("p1"), 0);

        assert!(
            matches!(update, CartUpdate::Removed { ref line, .. } if line.quantity == 2),
            "expected removal, got {update:?}"
        );
        assert_eq!(h.engine.count(), 1);
    }

    #[tokio::test]
    async fn unknown_product_is_a_no_op() {
        let mut gateway = MockCartGateway::new();
        gateway.expect_update_quantity().never();
        gateway.expect_remove_item().never();

        gateway
            .expect_fetch_cart()
            .once()
            .return_once(|_| Ok(stored_cart()));

        let h = harness(gateway, MemoryCartStore::new(), true);
        h.engine.hydrate().await;

        let missing = ProductId::new("nope");

        assert!(
            matches!(h.engine.set_quantity(&missing, 3), CartUpdate::NotInCart),
            "set quantity should be a no-op"
        );
        assert!(
            matches!(h.engine.remove(&missing), CartUpdate::NotInCart),
            "remove should be a no-op"
        );
        assert_eq!(h.engine.count(), 3);
    }

    #[tokio::test]
    async fn invalid_input_keeps_previous_quantity() {
        let mut gateway = MockCartGateway::new();
        gateway.expect_update_quantity().never();

        let h = harness(gateway, MemoryCartStore::with_raw(STORED), false);
        h.engine.hydrate().await;

        let p1 = ProductId::new("p1");

        for input in ["abc", "-3", ""] {
            let update = h.engine.set_quantity_input(&p1, input);

            assert!(
                matches!(update, CartUpdate::Unchanged { quantity: 2 }),
                "input {input:?} should keep quantity, got {update:?}"
            );
        }

        assert!(
            matches!(h.engine.set_quantity_input(&p1, " 4 "), CartUpdate::Applied { quantity: 4, .. }),
            "numeric input should apply"
        );
    }

    #[tokio::test]
    async fn remove_notifies_and_tolerates_gateway_failure() -> TestResult {
        let mut gateway = MockCartGateway::new();

        gateway
            .expect_fetch_cart()
            .once()
            .return_once(|_| Ok(stored_cart()));
        gateway
            .expect_remove_item()
            .once()
            .withf(|_, product| product.as_str() == "p2")
            .return_once(|_, _| Err(server_error()));

        let h = harness(gateway, MemoryCartStore::new(), true);
        h.engine.hydrate().await;

        let update = h.engine.remove(&ProductId::new("p2"));

        let CartUpdate::Removed { line, sync } = update else {
            return Err(format!("expected removal, got {update:?}").into());
        };

        assert_eq!(line.name, "Case");
        assert_eq!(
            h.notifier.current().map(|n| n.message),
            Some("Removed Case from your cart".to_string())
        );

        assert!(
            matches!(sync.settled().await, SyncStatus::Failed(_)),
            "remove should fail remotely"
        );
        assert_eq!(h.engine.count(), 2);
        assert_eq!(stored_lines(&h.store)?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn clear_is_silent_on_gateway_failure() -> TestResult {
        let mut gateway = MockCartGateway::new();

        gateway
            .expect_fetch_cart()
            .once()
            .return_once(|_| Ok(stored_cart()));
        gateway
            .expect_clear()
            .once()
            .return_once(|_| Err(server_error()));

        let h = harness(gateway, MemoryCartStore::new(), true);
        h.engine.hydrate().await;

        let status = h.engine.clear().settled().await;

        assert!(matches!(status, SyncStatus::Failed(_)), "clear should fail remotely");
        assert!(h.engine.snapshot().is_empty(), "cart stays empty");
        assert_eq!(stored_lines(&h.store)?.len(), 0);
        assert_eq!(
            h.notifier.current().map(|n| n.kind),
            Some(NotificationKind::Success)
        );

        Ok(())
    }

    #[tokio::test]
    async fn guest_add_line_is_local_only() -> TestResult {
        let mut gateway = MockCartGateway::new();
        gateway.expect_add_item().never();

        let h = harness(gateway, MemoryCartStore::new(), false);

        let update = h.engine.add_line(&detail("p1", 100_000, 5), 2)?;

        let CartUpdate::Applied { quantity, sync } = update else {
            return Err(format!("expected applied, got {update:?}").into());
        };

        assert_eq!(quantity, 2);
        assert!(!sync.is_remote(), "guest add must not reach the gateway");
        assert!(
            matches!(sync.settled().await, SyncStatus::LocalOnly),
            "guest add is local only"
        );

        Ok(())
    }

    #[tokio::test]
    async fn add_line_sums_and_sends_only_the_added_units() -> TestResult {
        let mut gateway = MockCartGateway::new();

        gateway
            .expect_add_item()
            .once()
            .withf(|_, _, quantity| *quantity == 2)
            .return_once(|_, _, _| Ok(()));
        gateway
            .expect_add_item()
            .once()
            .withf(|_, _, quantity| *quantity == 1)
            .return_once(|_, _, _| Ok(()));

        let h = harness(gateway, MemoryCartStore::new(), true);
        let lamp = detail("p1", 100_000, 3);

        let first = h.engine.add_line(&lamp, 2)?.into_sync().ok_or("no sync")?;
        first.settled().await;

        let second = h.engine.add_line(&lamp, 4)?;

        let CartUpdate::Applied { quantity, sync } = second else {
            return Err(format!("expected applied, got {second:?}").into());
        };

        assert_eq!(quantity, 3);
        assert!(sync.settled().await.is_confirmed(), "add should confirm");

        let third = h.engine.add_line(&lamp, 1)?;

        assert!(
            matches!(third, CartUpdate::Unchanged { quantity: 3 }),
            "line at its limit, got {third:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn add_line_after_stock_drop_lowers_and_persists_the_line() -> TestResult {
        let mut gateway = MockCartGateway::new();

        gateway
            .expect_add_item()
            .once()
            .withf(|_, _, quantity| *quantity == 3)
            .return_once(|_, _, _| Ok(()));
        gateway
            .expect_update_quantity()
            .once()
            .withf(|_, product, quantity| product.as_str() == "p1" && *quantity == 2)
            .return_once(|_, _, _| Ok(()));

        let h = harness(gateway, MemoryCartStore::new(), true);

        let first = h.engine.add_line(&detail("p1", 100_000, 3), 3)?;
        first.into_sync().ok_or("no sync")?.settled().await;

        let mut snapshots = h.engine.subscribe();
        snapshots.mark_unchanged();

        let update = h.engine.add_line(&detail("p1", 100_000, 2), 1)?;

        let CartUpdate::Applied { quantity, sync } = update else {
            return Err(format!("expected applied, got {update:?}").into());
        };

        assert_eq!(quantity, 2);
        assert!(sync.settled().await.is_confirmed(), "update should confirm");

        let stored = stored_lines(&h.store)?;
        let line = stored.first().ok_or("no stored line")?;

        assert_eq!(line.quantity, 2);
        assert_eq!(line.available_stock, 2);
        assert_eq!(Some(line), h.engine.snapshot().get(&ProductId::new("p1")));
        assert!(snapshots.has_changed()?, "lowered line should be published");

        Ok(())
    }

    #[tokio::test]
    async fn add_line_refreshing_stock_only_is_persisted_without_a_call() -> TestResult {
        let mut gateway = MockCartGateway::new();
        gateway.expect_add_item().never();
        gateway.expect_update_quantity().never();

        let h = harness(gateway, MemoryCartStore::new(), false);

        h.engine.add_line(&detail("p1", 100_000, 2), 2)?;

        let mut snapshots = h.engine.subscribe();
        snapshots.mark_unchanged();

        let sold_out = ProductDetail {
            in_stock: false,
            ..detail("p1", 100_000, 2)
        };

        let update = h.engine.add_line(&sold_out, 1)?;

        assert!(
            matches!(update, CartUpdate::Unchanged { quantity: 2 }),
            "quantity already at stock, got {update:?}"
        );

        let stored = stored_lines(&h.store)?;

        assert!(
            stored.first().is_some_and(|line| !line.in_stock),
            "stored line should carry the refreshed stock flag"
        );
        assert!(snapshots.has_changed()?, "refreshed line should be published");

        Ok(())
    }

    #[tokio::test]
    async fn totals_follow_every_mutation() -> TestResult {
        let h = harness(MockCartGateway::new(), MemoryCartStore::new(), false);

        h.engine.add_line(&detail("p1", 100_000, 10), 2)?;
        h.engine.add_line(&detail("p2", 250_000, 10), 1)?;

        assert_eq!(h.engine.total(), 450_000);
        assert_eq!(h.engine.summary().grand_total, 480_000);

        h.engine.set_quantity(&ProductId::new("p2"), 3);

        assert_eq!(h.engine.total(), 950_000);
        assert_eq!(h.engine.summary().shipping, 0);

        h.engine.remove(&ProductId::new("p1"));

        assert_eq!(h.engine.total(), 750_000);
        assert_eq!(h.engine.count(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn subscribers_see_each_snapshot() -> TestResult {
        let h = harness(MockCartGateway::new(), MemoryCartStore::new(), false);
        let mut snapshots = h.engine.subscribe();

        h.engine.add_line(&detail("p1", 100_000, 10), 1)?;

        assert!(snapshots.has_changed()?, "snapshot should be published");
        assert_eq!(snapshots.borrow_and_update().count(), 1);

        h.engine.reset_local();

        assert!(snapshots.borrow_and_update().is_empty(), "reset publishes empty cart");

        Ok(())
    }
}
