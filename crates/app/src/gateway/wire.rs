//! Cart endpoint wire shapes.

use serde::{Deserialize, Serialize};
use storefront::{CartLine, ProductId, orders::OrderRecord};

/// `GET cart` response.
#[derive(Debug, Deserialize)]
pub(crate) struct CartResponse {
    #[serde(default)]
    pub items: Vec<CartItemResponse>,
}

/// One entry of the server cart.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartItemResponse {
    pub product_id: ProductId,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub price: u64,

    #[serde(default)]
    pub discount_price: Option<u64>,

    #[serde(default)]
    pub discount_percent: Option<u32>,

    pub quantity: u32,

    #[serde(default)]
    pub available_stock: u32,

    #[serde(default)]
    pub in_stock: bool,
}

impl From<CartItemResponse> for CartLine {
    fn from(item: CartItemResponse) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name,
            slug: item.slug,
            image_url: item.image.filter(|url| !url.is_empty()),
            unit_price: item.price,
            discount_price: item.discount_price,
            discount_percent: item.discount_percent,
            quantity: item.quantity,
            available_stock: item.available_stock,
            in_stock: item.in_stock,
        }
    }
}

/// Body of `POST cart/add` and `PUT cart/update`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CartItemRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

/// `GET orders` response.
#[derive(Debug, Deserialize)]
pub(crate) struct OrdersResponse {
    #[serde(default)]
    pub orders: Vec<OrderRecord>,
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn server_items_map_to_cart_lines() -> TestResult {
        let response: CartResponse = serde_json::from_str(
            r#"{"items":[{"productId":"p1","name":"Phone","slug":"phone","image":"a.png",
                "price":100000,"discountPrice":90000,"discountPercent":10,"quantity":2,
                "availableStock":5,"inStock":true}]}"#,
        )?;

        let lines: Vec<CartLine> = response.items.into_iter().map(CartLine::from).collect();
        let line = lines.first().ok_or("no line")?;

        assert_eq!(line.product_id, ProductId::new("p1"));
        assert_eq!(line.image_url.as_deref(), Some("a.png"));
        assert_eq!(line.unit_price, 100_000);
        assert_eq!(line.discount_price, Some(90_000));
        assert_eq!(line.quantity, 2);
        assert_eq!(line.available_stock, 5);
        assert!(line.in_stock, "stock flag");

        Ok(())
    }

    #[test]
    fn empty_image_is_dropped() -> TestResult {
        let item: CartItemResponse =
            serde_json::from_str(r#"{"productId":"p1","image":"","quantity":1}"#)?;

        assert_eq!(CartLine::from(item).image_url, None);

        Ok(())
    }

    #[test]
    fn item_request_uses_camel_case() -> TestResult {
        let product = ProductId::new("p9");

        let json = serde_json::to_string(&CartItemRequest {
            product_id: &product,
            quantity: 3,
        })?;

        assert_eq!(json, r#"{"productId":"p9","quantity":3}"#);

        Ok(())
    }
}
