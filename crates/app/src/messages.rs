//! User-facing messages.

use storefront::CartLine;

/// Shown in place of an empty cart.
pub const EMPTY_CART: &str = "Your cart is empty";
/// An action needs a signed-in user.
pub const NOT_AUTHENTICATED: &str = "Please sign in to continue";
/// Checkout blocked by a line exceeding its stock.
pub const STOCK_CONFLICT: &str =
    "Some items in your cart are out of stock or exceed the available quantity";
/// The server rejected the credential.
pub const SESSION_EXPIRED: &str = "Your session has expired, please sign in again";
/// Order placement failed for any other reason.
pub const CHECKOUT_FAILED: &str = "Something went wrong while placing your order";
/// A second checkout was started while one is running.
pub const CHECKOUT_IN_PROGRESS: &str = "Your order is already being placed";
/// Checkout succeeded.
pub const ORDER_PLACED: &str = "Your order has been placed";
/// The cart was emptied on request.
pub const CART_CLEARED: &str = "Your cart has been cleared";
/// A cart change could not be confirmed by the server.
pub const CART_SYNC_FAILED: &str = "Could not reach the store; your cart is saved on this device";
/// A catalog page or the category list failed to load.
pub const CATALOG_FAILED: &str = "Could not load products";
/// Order history could not be fetched.
pub const ORDERS_FAILED: &str = "Could not load your orders";
/// The requested order does not exist.
pub const ORDER_NOT_FOUND: &str = "This order could not be found";
/// The requested product does not exist.
pub const PRODUCT_NOT_FOUND: &str = "This product is no longer available";

/// Confirms that `line` left the cart.
pub fn removed(line: &CartLine) -> String {
    format!("Removed {} from your cart", line.name)
}

/// Confirms that `line` was added to the cart.
pub fn added(line: &CartLine) -> String {
    format!("Added {} to your cart", line.name)
}

/// Reports the new quantity of `line`.
pub fn quantity_updated(line: &CartLine) -> String {
    format!("{} quantity set to {}", line.name, line.quantity)
}
