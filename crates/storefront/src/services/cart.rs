//! Cart service.
//!
//! Prices a new line once, at add time, with the same engine the configurator
//! preview uses. The store then either inserts the line with that price or
//! merges the quantity into an identical existing line, whose price stays.

use serde::Deserialize;
use tracing::{info, instrument};

use atelier_core::cart::{self, Cart, CartLine};
use atelier_core::pricing;
use atelier_core::{
    CartId, CartLineId, ConfigurationRecord, CoreError, CurrencyCode, ProductId, VariantId,
};

use super::configurator::normalize_configuration;
use crate::store::{CommerceStore, NewCartLine, StoreResult};

/// An add-to-cart request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddToCart {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: i64,
    #[serde(default)]
    pub configuration: Option<ConfigurationRecord>,
}

/// Cart operations.
pub struct CartService<'a> {
    store: &'a dyn CommerceStore,
    currency: CurrencyCode,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn CommerceStore, currency: CurrencyCode) -> Self {
        Self { store, currency }
    }

    /// Create an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Persistence` if the cart cannot be stored.
    #[instrument(skip(self))]
    pub async fn create_cart(&self) -> StoreResult<Cart> {
        let cart = self.store.create_cart().await?;
        info!(cart_id = %cart.id, "Cart created");
        Ok(cart)
    }

    /// Get a cart with its lines.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` for an unknown cart.
    pub async fn get_cart(&self, cart_id: CartId) -> StoreResult<Cart> {
        Ok(self
            .store
            .cart(cart_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("cart {cart_id}")))?)
    }

    /// Add a product (optionally configured) to a cart.
    ///
    /// # Errors
    ///
    /// - `CoreError::Validation` for a bad quantity or configuration, or a
    ///   variant of another product
    /// - `CoreError::NotFound` for an unknown cart, product or variant
    /// - `StoreError::Persistence` for storage failures
    #[instrument(
        skip(self, request),
        fields(cart_id = %cart_id, product_id = %request.product_id, quantity = request.quantity)
    )]
    pub async fn add_to_cart(&self, cart_id: CartId, request: AddToCart) -> StoreResult<CartLine> {
        cart::validate_add_quantity(request.quantity)?;
        let configuration = normalize_configuration(request.configuration)?;

        let product = self
            .store
            .product(request.product_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("product {}", request.product_id)))?;

        if let Some(variant_id) = request.variant_id {
            let variant = self
                .store
                .variant(variant_id)
                .await?
                .ok_or_else(|| CoreError::not_found(format!("variant {variant_id}")))?;
            if variant.product_id != product.id {
                return Err(CoreError::validation(format!(
                    "variant {variant_id} does not belong to product {}",
                    product.id
                ))
                .into());
            }
        }

        let parts = self.store.parts(product.id).await?;
        let breakdown =
            pricing::compute_price(&product, &parts, configuration.as_ref(), self.currency)?;

        let line = self
            .store
            .add_line(
                cart_id,
                NewCartLine {
                    product_id: product.id,
                    variant_id: request.variant_id,
                    configuration,
                    quantity: request.quantity,
                    unit_price: breakdown.price,
                },
            )
            .await?;

        info!(
            line_id = %line.id,
            quantity = line.quantity,
            unit_price = %line.unit_price,
            "Cart line saved"
        );
        Ok(line)
    }

    /// Set a line's quantity. Zero removes the line and returns `None`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for a negative quantity and
    /// `CoreError::NotFound` for an unknown cart or line.
    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    pub async fn update_cart_line(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
        quantity: i64,
    ) -> StoreResult<Option<CartLine>> {
        self.store.update_line(cart_id, line_id, quantity).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` for an unknown cart or line.
    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    pub async fn remove_cart_line(&self, cart_id: CartId, line_id: CartLineId) -> StoreResult<()> {
        self.store.remove_line(cart_id, line_id).await
    }
}
