//! Checkout service: turn a cart into an order.

use serde::Deserialize;
use tracing::{info, instrument};

use atelier_core::order::{Order, ShippingAddress};
use atelier_core::{CartId, CoreError, CurrencyCode, OrderId};

use crate::store::{CommerceStore, PlaceOrder, StoreResult};

/// A checkout request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Checkout {
    pub shipping_address: ShippingAddress,
    /// Cart version the customer reviewed. Checkout fails with a conflict if
    /// the cart changed since.
    #[serde(default)]
    pub expected_cart_version: Option<i64>,
}

/// Order placement and lookup.
pub struct CheckoutService<'a> {
    store: &'a dyn CommerceStore,
    currency: CurrencyCode,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn CommerceStore, currency: CurrencyCode) -> Self {
        Self { store, currency }
    }

    /// Place an order from the cart's current lines at their frozen prices.
    ///
    /// On success the cart is empty; on any error it is unchanged.
    ///
    /// # Errors
    ///
    /// - `CoreError::Validation` for a bad address or an empty cart
    /// - `CoreError::NotFound` for an unknown cart or a line whose product or
    ///   variant no longer exists
    /// - `CoreError::Conflict` for a stale `expected_cart_version`
    /// - `StoreError::Persistence` for storage failures
    #[instrument(skip(self, checkout), fields(cart_id = %cart_id))]
    pub async fn place_order(&self, cart_id: CartId, checkout: Checkout) -> StoreResult<Order> {
        checkout.shipping_address.validate()?;

        let order = self
            .store
            .place_order(
                cart_id,
                PlaceOrder {
                    shipping_address: checkout.shipping_address,
                    expected_cart_version: checkout.expected_cart_version,
                    currency: self.currency,
                },
            )
            .await?;

        info!(
            order_id = %order.id,
            lines = order.lines.len(),
            total = %order.total,
            "Order placed"
        );
        Ok(order)
    }

    /// Get a placed order.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` for an unknown order.
    pub async fn get_order(&self, order_id: OrderId) -> StoreResult<Order> {
        Ok(self
            .store
            .order(order_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("order {order_id}")))?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::services::{AddToCart, CartService};
    use crate::store::{InMemoryStore, NewCategory, NewProduct, StoreError};

    fn address() -> ShippingAddress {
        ShippingAddress {
            recipient: "Grace Hopper".to_owned(),
            line1: "1 Harbor Street".to_owned(),
            line2: Some("Unit 4".to_owned()),
            city: "Arlington".to_owned(),
            region: Some("VA".to_owned()),
            postal_code: "22201".to_owned(),
            country_code: "US".to_owned(),
            phone: None,
        }
    }

    async fn cart_with_chair(store: &InMemoryStore) -> CartId {
        let category = store
            .create_category(NewCategory {
                name: "Chairs".to_owned(),
                slug: "chairs".to_owned(),
            })
            .await
            .unwrap();
        let chair = store
            .create_product(NewProduct {
                category_id: category.id,
                name: "Reading Chair".to_owned(),
                slug: "reading-chair".to_owned(),
                base_price: Decimal::new(45_000, 2),
                base_dimensions: None,
                is_configurable: false,
            })
            .await
            .unwrap();

        let carts = CartService::new(store, CurrencyCode::USD);
        let cart = carts.create_cart().await.unwrap();
        carts
            .add_to_cart(
                cart.id,
                AddToCart {
                    product_id: chair.id,
                    variant_id: None,
                    quantity: 3,
                    configuration: None,
                },
            )
            .await
            .unwrap();
        cart.id
    }

    #[tokio::test]
    async fn test_place_and_get_order() {
        let store = InMemoryStore::new();
        let cart_id = cart_with_chair(&store).await;
        let service = CheckoutService::new(&store, CurrencyCode::USD);

        let order = service
            .place_order(
                cart_id,
                Checkout {
                    shipping_address: address(),
                    expected_cart_version: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(order.total.to_string(), "1350.00");
        assert_eq!(service.get_order(order.id).await.unwrap(), order);
    }

    #[tokio::test]
    async fn test_invalid_address_leaves_cart() {
        let store = InMemoryStore::new();
        let cart_id = cart_with_chair(&store).await;
        let service = CheckoutService::new(&store, CurrencyCode::USD);

        let mut shipping_address = address();
        shipping_address.line1 = String::new();
        let err = service
            .place_order(
                cart_id,
                Checkout {
                    shipping_address,
                    expected_cart_version: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(CoreError::Validation(_))));

        let cart = store.cart(cart_id).await.unwrap().unwrap();
        assert_eq!(cart.lines.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let store = InMemoryStore::new();
        let cart = store.create_cart().await.unwrap();
        let service = CheckoutService::new(&store, CurrencyCode::USD);

        let err = service
            .place_order(
                cart.id,
                Checkout {
                    shipping_address: address(),
                    expected_cart_version: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unknown_order_not_found() {
        let store = InMemoryStore::new();
        let service = CheckoutService::new(&store, CurrencyCode::USD);

        let err = service.get_order(OrderId::new(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(CoreError::NotFound(_))));
    }
}
