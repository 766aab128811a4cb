//! Remote cart gateway
//!
//! Stateless translation over the backend cart and order endpoints. Every
//! operation requires a credential; guest callers branch before reaching the
//! gateway, so nothing here silently no-ops.

mod wire;

use async_trait::async_trait;
use mockall::automock;
use reqwest::Method;
use storefront::{
    CartLine, OrderId, ProductId,
    orders::{OrderDetail, OrderReceipt, OrderRecord, OrderRequest},
};

use crate::{
    http::{ApiClient, GatewayError},
    session::BearerToken,
};

use wire::{CartItemRequest, CartResponse, OrdersResponse};

/// HTTP implementation of [`CartGateway`].
#[derive(Debug, Clone)]
pub struct HttpCartGateway {
    api: ApiClient,
}

impl HttpCartGateway {
    /// Gateway sending requests through `api`.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CartGateway for HttpCartGateway {
    async fn fetch_cart(&self, token: &BearerToken) -> Result<Vec<CartLine>, GatewayError> {
        let response: CartResponse = self
            .api
            .execute_json(self.api.request(Method::GET, "cart", Some(token)))
            .await?;

        Ok(response.items.into_iter().map(CartLine::from).collect())
    }

    async fn add_item(
        &self,
        token: &BearerToken,
        product: &ProductId,
        quantity: u32,
    ) -> Result<(), GatewayError> {
        let request = self
            .api
            .request(Method::POST, "cart/add", Some(token))
            .json(&CartItemRequest {
                product_id: product,
                quantity,
            });

        self.api.execute(request).await?;

        Ok(())
    }

    async fn update_quantity(
        &self,
        token: &BearerToken,
        product: &ProductId,
        quantity: u32,
    ) -> Result<(), GatewayError> {
        let request = self
            .api
            .request(Method::PUT, "cart/update", Some(token))
            .json(&CartItemRequest {
                product_id: product,
                quantity,
            });

        self.api.execute(request).await?;

        Ok(())
    }

    async fn remove_item(
        &self,
        token: &BearerToken,
        product: &ProductId,
    ) -> Result<(), GatewayError> {
        let url = self.api.endpoint(&["cart", "remove", product.as_str()]);

        self.api
            .execute(self.api.request_to(Method::DELETE, url, Some(token)))
            .await?;

        Ok(())
    }

    async fn clear(&self, token: &BearerToken) -> Result<(), GatewayError> {
        self.api
            .execute(self.api.request(Method::DELETE, "cart/clear", Some(token)))
            .await?;

        Ok(())
    }

    async fn submit_order(
        &self,
        token: &BearerToken,
        order: &OrderRequest,
    ) -> Result<OrderReceipt, GatewayError> {
        let request = self
            .api
            .request(Method::POST, "orders", Some(token))
            .json(order);

        self.api.execute_json(request).await
    }

    async fn list_orders(&self, token: &BearerToken) -> Result<Vec<OrderRecord>, GatewayError> {
        let response: OrdersResponse = self
            .api
            .execute_json(self.api.request(Method::GET, "orders", Some(token)))
            .await?;

        Ok(response.orders)
    }

    async fn fetch_order(
        &self,
        token: &BearerToken,
        order: &OrderId,
    ) -> Result<OrderDetail, GatewayError> {
        let url = self.api.endpoint(&["orders", order.as_str()]);

        self.api
            .execute_json(self.api.request_to(Method::GET, url, Some(token)))
            .await
    }
}

/// Backend cart and order endpoints.
#[automock]
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Fetches the server-side cart.
    async fn fetch_cart(&self, token: &BearerToken) -> Result<Vec<CartLine>, GatewayError>;

    /// Adds units of a product; the server sums with any existing line.
    async fn add_item(
        &self,
        token: &BearerToken,
        product: &ProductId,
        quantity: u32,
    ) -> Result<(), GatewayError>;

    /// Sets the quantity of a product already in the server cart.
    async fn update_quantity(
        &self,
        token: &BearerToken,
        product: &ProductId,
        quantity: u32,
    ) -> Result<(), GatewayError>;

    /// Removes a product from the server cart.
    async fn remove_item(&self, token: &BearerToken, product: &ProductId)
    -> Result<(), GatewayError>;

    /// Empties the server cart.
    async fn clear(&self, token: &BearerToken) -> Result<(), GatewayError>;

    /// Places an order.
    async fn submit_order(
        &self,
        token: &BearerToken,
        order: &OrderRequest,
    ) -> Result<OrderReceipt, GatewayError>;

    /// Lists previously placed orders, newest first as the server returns them.
    async fn list_orders(&self, token: &BearerToken) -> Result<Vec<OrderRecord>, GatewayError>;

    /// Fetches one placed order with its lines and address.
    async fn fetch_order(
        &self,
        token: &BearerToken,
        order: &OrderId,
    ) -> Result<OrderDetail, GatewayError>;
}
