//! Cart repository.
//!
//! Every line mutation runs in one transaction that first bumps the cart's
//! `version`. The `UPDATE ... RETURNING` takes the cart row lock, so
//! concurrent mutations of the same cart queue up behind each other.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use atelier_core::cart::{self, Cart, CartLine, MAX_LINE_QUANTITY, UpdatePlan};
use atelier_core::{CartId, CartLineId, ConfigurationRecord, ProductId, VariantId};

use super::{RepositoryError, map_write_error};
use crate::store::NewCartLine;

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct CartLineRow {
    id: CartLineId,
    cart_id: CartId,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    configuration: Option<Json<ConfigurationRecord>>,
    quantity: i32,
    unit_price: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative quantity {} on cart line {}",
                row.quantity, row.id
            ))
        })?;

        Ok(Self {
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            configuration: row.configuration.map(|Json(c)| c),
            quantity,
            unit_price: row.unit_price,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const LINE_COLUMNS: &str = "id, cart_id, product_id, variant_id, configuration, quantity, \
     unit_price, created_at, updated_at";

/// Load a cart's lines in ascending id order.
pub(crate) async fn fetch_lines(
    conn: &mut sqlx::PgConnection,
    cart_id: CartId,
) -> Result<Vec<CartLine>, RepositoryError> {
    let rows = sqlx::query_as::<_, CartLineRow>(&format!(
        "SELECT {LINE_COLUMNS} FROM storefront.cart_line WHERE cart_id = $1 ORDER BY id"
    ))
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(TryInto::try_into).collect()
}

/// Bump the cart version, taking the row lock for the rest of the transaction.
async fn lock_cart(
    tx: &mut Transaction<'_, Postgres>,
    cart_id: CartId,
) -> Result<i64, RepositoryError> {
    sqlx::query_scalar::<_, i64>(
        r"
        UPDATE storefront.cart
        SET version = version + 1, updated_at = NOW()
        WHERE id = $1
        RETURNING version
        ",
    )
    .bind(cart_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| RepositoryError::NotFound(format!("cart {cart_id}")))
}

fn quantity_param(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Validation(format!("quantity {quantity} is out of range")))
}

/// Repository for carts and their lines.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO storefront.cart DEFAULT VALUES
            RETURNING id, version, created_at, updated_at
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(Cart {
            id: row.id,
            version: row.version,
            lines: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    /// Get a cart with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;

        let Some(row) = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, version, created_at, updated_at
            FROM storefront.cart
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        else {
            return Ok(None);
        };

        let lines = fetch_lines(&mut conn, id).await?;

        Ok(Some(Cart {
            id: row.id,
            version: row.version,
            lines,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    /// Add to a cart, merging into the line with the same product, variant and
    /// configuration.
    ///
    /// The merge is a single upsert against the line identity index. Its
    /// conflict branch only raises the quantity; `unit_price` keeps the value
    /// written by the first add.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown cart, product or
    /// variant and `RepositoryError::Validation` for a bad or overflowing
    /// quantity.
    #[instrument(skip(self, line), fields(cart_id = %cart_id, product_id = %line.product_id))]
    pub async fn add_line(
        &self,
        cart_id: CartId,
        line: &NewCartLine,
    ) -> Result<CartLine, RepositoryError> {
        let quantity = quantity_param(cart::validate_add_quantity(line.quantity)?)?;
        let configuration_key = ConfigurationRecord::merge_key(line.configuration.as_ref())?;

        let mut tx = self.pool.begin().await?;
        lock_cart(&mut tx, cart_id).await?;

        let row = sqlx::query_as::<_, CartLineRow>(&format!(
            r"
            INSERT INTO storefront.cart_line
                (cart_id, product_id, variant_id, configuration, configuration_key, quantity, unit_price)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (cart_id, product_id, COALESCE(variant_id, 0), configuration_key)
            DO UPDATE SET
                quantity = storefront.cart_line.quantity + EXCLUDED.quantity,
                updated_at = NOW()
            RETURNING {LINE_COLUMNS}
            "
        ))
        .bind(cart_id)
        .bind(line.product_id)
        .bind(line.variant_id)
        .bind(line.configuration.as_ref().map(Json))
        .bind(&configuration_key)
        .bind(quantity)
        .bind(line.unit_price)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match map_write_error(e, "cart line") {
            RepositoryError::Validation(_) => RepositoryError::Validation(format!(
                "line quantity may not exceed {MAX_LINE_QUANTITY}"
            )),
            other => other,
        })?;

        tx.commit().await?;
        row.try_into()
    }

    /// Set a line's quantity; zero deletes it. Returns `None` when deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart or line does not exist
    /// and `RepositoryError::Validation` for a negative or oversized quantity.
    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    pub async fn update_line(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
        quantity: i64,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let plan = cart::plan_update(quantity)?;

        let mut tx = self.pool.begin().await?;
        lock_cart(&mut tx, cart_id).await?;

        let updated = match plan {
            UpdatePlan::Remove => {
                delete_line(&mut tx, cart_id, line_id).await?;
                None
            }
            UpdatePlan::SetQuantity(quantity) => {
                let row = sqlx::query_as::<_, CartLineRow>(&format!(
                    r"
                    UPDATE storefront.cart_line
                    SET quantity = $3, updated_at = NOW()
                    WHERE id = $1 AND cart_id = $2
                    RETURNING {LINE_COLUMNS}
                    "
                ))
                .bind(line_id)
                .bind(cart_id)
                .bind(quantity_param(quantity)?)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| RepositoryError::NotFound(format!("cart line {line_id}")))?;
                Some(row.try_into()?)
            }
        };

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart or line does not exist.
    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    pub async fn remove_line(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_cart(&mut tx, cart_id).await?;
        delete_line(&mut tx, cart_id, line_id).await?;
        tx.commit().await?;
        Ok(())
    }
}

async fn delete_line(
    tx: &mut Transaction<'_, Postgres>,
    cart_id: CartId,
    line_id: CartLineId,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        DELETE FROM storefront.cart_line
        WHERE id = $1 AND cart_id = $2
        ",
    )
    .bind(line_id)
    .bind(cart_id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound(format!("cart line {line_id}")));
    }
    Ok(())
}
