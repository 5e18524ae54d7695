//! Order repository: placement and lookup.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::{info, instrument};

use atelier_core::order::{self, Order, OrderLine, ShippingAddress};
use atelier_core::{
    CartId, ConfigurationRecord, CurrencyCode, OrderId, OrderLineId, OrderStatus, ProductId,
    VariantId,
};

use super::RepositoryError;
use super::carts::fetch_lines;
use crate::store::PlaceOrder;

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    cart_id: CartId,
    status: String,
    currency: String,
    shipping_address: Json<ShippingAddress>,
    total: Decimal,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    id: OrderLineId,
    order_id: OrderId,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    configuration: Option<Json<ConfigurationRecord>>,
    quantity: i32,
    unit_price: Decimal,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative quantity {} on order line {}",
                row.quantity, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            configuration: row.configuration.map(|Json(c)| c),
            quantity,
            unit_price: row.unit_price,
        })
    }
}

fn assemble(row: OrderRow, lines: Vec<OrderLine>) -> Result<Order, RepositoryError> {
    let status = OrderStatus::from_str(&row.status).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
    })?;
    let currency = CurrencyCode::from_str(&row.currency).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid order currency in database: {e}"))
    })?;

    // NUMERIC columns come back at their declared scale; show the currency's
    let lines = lines
        .into_iter()
        .map(|line| OrderLine {
            unit_price: currency.round(line.unit_price),
            ..line
        })
        .collect();

    Ok(Order {
        id: row.id,
        cart_id: row.cart_id,
        status,
        currency,
        shipping_address: row.shipping_address.0,
        total: currency.round(row.total),
        lines,
        created_at: row.created_at,
    })
}

/// Repository for orders.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Turn a cart into an order in one transaction.
    ///
    /// Locks the cart, checks its version, verifies every referenced product
    /// and variant still exists, copies the lines with their frozen prices,
    /// and clears the cart. Any error drops the transaction uncommitted.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::NotFound` for an unknown cart or a dangling reference
    /// - `RepositoryError::Conflict` when `expected_cart_version` is stale
    /// - `RepositoryError::Validation` for an empty cart
    /// - `RepositoryError::Database` for storage failures
    #[instrument(skip(self, request), fields(cart_id = %cart_id))]
    pub async fn place(
        &self,
        cart_id: CartId,
        request: &PlaceOrder,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let version = sqlx::query_scalar::<_, i64>(
            r"
            SELECT version
            FROM storefront.cart
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(cart_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("cart {cart_id}")))?;

        if let Some(expected) = request.expected_cart_version
            && expected != version
        {
            return Err(RepositoryError::Conflict(format!(
                "cart {cart_id} changed (expected version {expected}, found {version})"
            )));
        }

        let lines = fetch_lines(&mut tx, cart_id).await?;

        let product_ids: Vec<i32> = lines.iter().map(|l| l.product_id.as_i32()).collect();
        let missing_product = sqlx::query_scalar::<_, ProductId>(
            r"
            SELECT requested.id
            FROM UNNEST($1::INTEGER[]) AS requested(id)
            LEFT JOIN storefront.product p ON p.id = requested.id
            WHERE p.id IS NULL
            LIMIT 1
            ",
        )
        .bind(&product_ids)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(id) = missing_product {
            return Err(RepositoryError::NotFound(format!("product {id}")));
        }

        let variant_ids: Vec<i32> = lines
            .iter()
            .filter_map(|l| l.variant_id.map(|v| v.as_i32()))
            .collect();
        let missing_variant = sqlx::query_scalar::<_, VariantId>(
            r"
            SELECT requested.id
            FROM UNNEST($1::INTEGER[]) AS requested(id)
            LEFT JOIN storefront.product_variant v ON v.id = requested.id
            WHERE v.id IS NULL
            LIMIT 1
            ",
        )
        .bind(&variant_ids)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(id) = missing_variant {
            return Err(RepositoryError::NotFound(format!("variant {id}")));
        }

        let materialized = order::materialize(&lines, request.currency)?;

        let order_row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO storefront."order" (cart_id, status, currency, shipping_address, total)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, cart_id, status, currency, shipping_address, total, created_at
            "#,
        )
        .bind(cart_id)
        .bind(OrderStatus::Pending.as_str())
        .bind(request.currency.code())
        .bind(Json(&request.shipping_address))
        .bind(materialized.total)
        .fetch_one(&mut *tx)
        .await?;

        let mut order_lines = Vec::with_capacity(materialized.lines.len());
        for line in materialized.lines {
            let quantity = i32::try_from(line.quantity).map_err(|_| {
                RepositoryError::Validation(format!("quantity {} is out of range", line.quantity))
            })?;

            let row = sqlx::query_as::<_, OrderLineRow>(
                r"
                INSERT INTO storefront.order_line
                    (order_id, product_id, variant_id, configuration, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, order_id, product_id, variant_id, configuration, quantity, unit_price
                ",
            )
            .bind(order_row.id)
            .bind(line.product_id)
            .bind(line.variant_id)
            .bind(line.configuration.as_ref().map(Json))
            .bind(quantity)
            .bind(line.unit_price)
            .fetch_one(&mut *tx)
            .await?;
            order_lines.push(row.try_into()?);
        }

        sqlx::query("DELETE FROM storefront.cart_line WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
            UPDATE storefront.cart
            SET version = version + 1, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(cart_id)
        .execute(&mut *tx)
        .await?;

        let placed = assemble(order_row, order_lines)?;
        tx.commit().await?;

        info!(order_id = %placed.id, total = %placed.total, "Order placed");
        Ok(placed)
    }

    /// Get an order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored status or
    /// currency is unknown.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, cart_id, status, currency, shipping_address, total, created_at
            FROM storefront."order"
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT id, order_id, product_id, variant_id, configuration, quantity, unit_price
            FROM storefront.order_line
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(TryInto::try_into)
        .collect::<Result<Vec<_>, _>>()?;

        assemble(row, lines).map(Some)
    }
}
