//! [`CommerceStore`] backed by `PostgreSQL`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use atelier_core::cart::{Cart, CartLine};
use atelier_core::catalog::{Category, ConfigurablePart, Product, ProductVariant};
use atelier_core::order::Order;
use atelier_core::{CartId, CartLineId, CurrencyCode, OrderId, PartId, ProductId, VariantId};

use super::{
    CommerceStore, NewCartLine, NewCategory, NewPart, NewProduct, NewVariant, PlaceOrder,
    StoreResult, validate_new_part, validate_new_product,
};
use crate::db::{CartRepository, CatalogRepository, OrderRepository, RepositoryError};

/// Store that delegates to the sqlx repositories.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    currency: CurrencyCode,
}

impl PgStore {
    /// Store quoting cart prices in the default currency.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            currency: CurrencyCode::default(),
        }
    }

    /// Currency cart line prices are read back in.
    ///
    /// Price columns keep two decimal places; lines are rescaled to this
    /// currency's scale so both stores report the same amounts.
    #[must_use]
    pub fn with_currency(mut self, currency: CurrencyCode) -> Self {
        self.currency = currency;
        self
    }

    fn rescale(&self, line: CartLine) -> CartLine {
        rescale_line(self.currency, line)
    }

    const fn catalog(&self) -> CatalogRepository<'_> {
        CatalogRepository::new(&self.pool)
    }

    const fn carts(&self) -> CartRepository<'_> {
        CartRepository::new(&self.pool)
    }

    const fn orders(&self) -> OrderRepository<'_> {
        OrderRepository::new(&self.pool)
    }
}

/// Round a line's unit price to `currency`'s scale.
fn rescale_line(currency: CurrencyCode, line: CartLine) -> CartLine {
    CartLine {
        unit_price: currency.round(line.unit_price),
        ..line
    }
}

#[async_trait]
impl CommerceStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn create_category(&self, category: NewCategory) -> StoreResult<Category> {
        Ok(self.catalog().create_category(&category).await?)
    }

    async fn create_product(&self, product: NewProduct) -> StoreResult<Product> {
        validate_new_product(&product)?;
        Ok(self.catalog().create_product(&product).await?)
    }

    async fn create_variant(&self, variant: NewVariant) -> StoreResult<ProductVariant> {
        Ok(self.catalog().create_variant(&variant).await?)
    }

    async fn create_part(&self, part: NewPart) -> StoreResult<ConfigurablePart> {
        validate_new_part(&part)?;
        Ok(self.catalog().create_part(&part).await?)
    }

    async fn product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.catalog().get_product(id).await?)
    }

    async fn variant(&self, id: VariantId) -> StoreResult<Option<ProductVariant>> {
        Ok(self.catalog().get_variant(id).await?)
    }

    async fn parts(&self, product_id: ProductId) -> StoreResult<Vec<ConfigurablePart>> {
        Ok(self.catalog().list_parts(product_id).await?)
    }

    async fn update_product_base_price(
        &self,
        id: ProductId,
        base_price: Decimal,
    ) -> StoreResult<Product> {
        Ok(self.catalog().update_product_base_price(id, base_price).await?)
    }

    async fn update_part_price_modifier(
        &self,
        id: PartId,
        price_modifier: Decimal,
    ) -> StoreResult<ConfigurablePart> {
        Ok(self
            .catalog()
            .update_part_price_modifier(id, price_modifier)
            .await?)
    }

    async fn create_cart(&self) -> StoreResult<Cart> {
        Ok(self.carts().create().await?)
    }

    async fn cart(&self, id: CartId) -> StoreResult<Option<Cart>> {
        Ok(self.carts().get(id).await?.map(|cart| Cart {
            lines: cart.lines.into_iter().map(|l| self.rescale(l)).collect(),
            ..cart
        }))
    }

    async fn add_line(&self, cart_id: CartId, line: NewCartLine) -> StoreResult<CartLine> {
        let line = self.carts().add_line(cart_id, &line).await?;
        Ok(self.rescale(line))
    }

    async fn update_line(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
        quantity: i64,
    ) -> StoreResult<Option<CartLine>> {
        let line = self.carts().update_line(cart_id, line_id, quantity).await?;
        Ok(line.map(|l| self.rescale(l)))
    }

    async fn remove_line(&self, cart_id: CartId, line_id: CartLineId) -> StoreResult<()> {
        Ok(self.carts().remove_line(cart_id, line_id).await?)
    }

    async fn place_order(&self, cart_id: CartId, request: PlaceOrder) -> StoreResult<Order> {
        Ok(self.orders().place(cart_id, &request).await?)
    }

    async fn order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        Ok(self.orders().get(id).await?)
    }
}
