//! Persistence seam for the catalog, carts and orders.
//!
//! Services talk to a [`CommerceStore`] trait object. Two implementations ship:
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx, used in production
//! - [`InMemoryStore`] - a mutex-guarded map store for development and tests
//!
//! Both give every mutating operation all-or-nothing semantics: either the
//! whole change is visible afterwards or none of it is.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use atelier_core::cart::{Cart, CartLine};
use atelier_core::catalog::{Category, ConfigurablePart, Product, ProductVariant};
use atelier_core::order::{Order, ShippingAddress};
use atelier_core::types::configuration::MAX_PART_NAME_LENGTH;
use atelier_core::{
    CartId, CartLineId, CategoryId, ConfigurationRecord, CoreError, CurrencyCode, Dimensions,
    OrderId, PartId, PartKind, ProductId, VariantId,
};

use crate::db::RepositoryError;

pub use memory::{Fault, InMemoryStore};
pub use postgres::PgStore;

/// Errors returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Deterministic domain failure (not found, validation, conflict).
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Storage failure. The operation was rolled back.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl StoreError {
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }
}

impl From<RepositoryError> for StoreError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => Self::Domain(CoreError::NotFound(what)),
            RepositoryError::Validation(msg) => Self::Domain(CoreError::Validation(msg)),
            RepositoryError::Conflict(msg) => Self::Domain(CoreError::Conflict(msg)),
            RepositoryError::Database(e) => Self::Persistence(e.to_string()),
            RepositoryError::DataCorruption(msg) => Self::Persistence(msg),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A category to insert.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
}

/// A product to insert.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    pub base_price: Decimal,
    pub base_dimensions: Option<Dimensions>,
    pub is_configurable: bool,
}

/// A variant to insert.
#[derive(Debug, Clone)]
pub struct NewVariant {
    pub product_id: ProductId,
    pub name: String,
    pub sku: Option<String>,
}

/// A configurable part to insert.
#[derive(Debug, Clone)]
pub struct NewPart {
    pub product_id: ProductId,
    pub kind: PartKind,
    pub name: String,
    pub price_modifier: Decimal,
}

/// An add-to-cart request that has already been validated and priced.
///
/// `unit_price` is only stored when the request creates a new line. A request
/// that merges into an existing line leaves that line's price untouched.
#[derive(Debug, Clone)]
pub struct NewCartLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub configuration: Option<ConfigurationRecord>,
    pub quantity: i64,
    pub unit_price: Decimal,
}

/// Everything needed to turn a cart into an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub shipping_address: ShippingAddress,
    /// When set, the cart's version must still match.
    pub expected_cart_version: Option<i64>,
    pub currency: CurrencyCode,
}

/// Check a new product before either store writes it.
pub(crate) fn validate_new_product(product: &NewProduct) -> Result<(), CoreError> {
    if product.name.trim().is_empty() || product.slug.trim().is_empty() {
        return Err(CoreError::validation("product name and slug are required"));
    }
    if product.base_price < Decimal::ZERO {
        return Err(CoreError::validation("base price may not be negative"));
    }
    if let Some(dims) = product.base_dimensions {
        dims.validate()?;
    }
    Ok(())
}

/// Check a new part before either store writes it.
pub(crate) fn validate_new_part(part: &NewPart) -> Result<(), CoreError> {
    let name = part.name.trim();
    if name.is_empty() {
        return Err(CoreError::validation(format!("{} part name is required", part.kind)));
    }
    if name.chars().count() > MAX_PART_NAME_LENGTH {
        return Err(CoreError::validation(format!(
            "part name must be at most {MAX_PART_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Persistence operations used by the storefront services.
#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// Check the backing storage is reachable.
    async fn ping(&self) -> StoreResult<()>;

    // Catalog

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category>;

    async fn create_product(&self, product: NewProduct) -> StoreResult<Product>;

    async fn create_variant(&self, variant: NewVariant) -> StoreResult<ProductVariant>;

    /// Insert a part. The product must exist and be configurable.
    async fn create_part(&self, part: NewPart) -> StoreResult<ConfigurablePart>;

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    async fn variant(&self, id: VariantId) -> StoreResult<Option<ProductVariant>>;

    /// All parts of a product, in ascending id order.
    async fn parts(&self, product_id: ProductId) -> StoreResult<Vec<ConfigurablePart>>;

    /// Back-office price edit. Existing cart and order lines keep their prices.
    async fn update_product_base_price(
        &self,
        id: ProductId,
        base_price: Decimal,
    ) -> StoreResult<Product>;

    /// Back-office modifier edit. Existing cart and order lines keep their prices.
    async fn update_part_price_modifier(
        &self,
        id: PartId,
        price_modifier: Decimal,
    ) -> StoreResult<ConfigurablePart>;

    // Carts

    async fn create_cart(&self) -> StoreResult<Cart>;

    async fn cart(&self, id: CartId) -> StoreResult<Option<Cart>>;

    /// Merge into a matching line or insert a new one. Returns the resulting line.
    async fn add_line(&self, cart_id: CartId, line: NewCartLine) -> StoreResult<CartLine>;

    /// Set a line's quantity. Returns `None` when the update removed the line.
    async fn update_line(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
        quantity: i64,
    ) -> StoreResult<Option<CartLine>>;

    async fn remove_line(&self, cart_id: CartId, line_id: CartLineId) -> StoreResult<()>;

    // Orders

    /// Materialize the cart into an order and clear its lines, atomically.
    async fn place_order(&self, cart_id: CartId, request: PlaceOrder) -> StoreResult<Order>;

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_map_to_domain() {
        let err: StoreError = RepositoryError::NotFound("cart 3".to_owned()).into();
        assert!(matches!(err, StoreError::Domain(CoreError::NotFound(_))));

        let err: StoreError = RepositoryError::Conflict("stale".to_owned()).into();
        assert!(matches!(err, StoreError::Domain(CoreError::Conflict(_))));

        let err: StoreError = RepositoryError::DataCorruption("bad kind".to_owned()).into();
        assert!(matches!(err, StoreError::Persistence(_)));
    }
}
