//! Catalog repository: categories, products, variants and configurable parts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use atelier_core::catalog::{Category, ConfigurablePart, Product, ProductVariant};
use atelier_core::{CategoryId, Dimensions, PartId, PartKind, ProductId, VariantId};

use super::{RepositoryError, map_write_error};
use crate::store::{NewCategory, NewPart, NewProduct, NewVariant};

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    category_id: CategoryId,
    name: String,
    slug: String,
    base_price: Decimal,
    base_length: Option<Decimal>,
    base_width: Option<Decimal>,
    base_height: Option<Decimal>,
    is_configurable: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let base_dimensions = match (row.base_length, row.base_width, row.base_height) {
            (Some(length), Some(width), Some(height)) => Some(Dimensions {
                length,
                width,
                height,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            category_id: row.category_id,
            name: row.name,
            slug: row.slug,
            base_price: row.base_price,
            base_dimensions,
            is_configurable: row.is_configurable,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VariantRow {
    id: VariantId,
    product_id: ProductId,
    name: String,
    sku: Option<String>,
}

impl From<VariantRow> for ProductVariant {
    fn from(row: VariantRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            name: row.name,
            sku: row.sku,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PartRow {
    id: PartId,
    product_id: ProductId,
    kind: String,
    name: String,
    price_modifier: Decimal,
}

impl TryFrom<PartRow> for ConfigurablePart {
    type Error = RepositoryError;

    fn try_from(row: PartRow) -> Result<Self, Self::Error> {
        let kind = PartKind::parse(&row.kind).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid part kind in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            kind,
            name: row.name,
            price_modifier: row.price_modifier,
        })
    }
}

const PRODUCT_COLUMNS: &str = "id, category_id, name, slug, base_price, base_length, base_width, \
     base_height, is_configurable, created_at, updated_at";

/// Repository for catalog reads and back-office writes.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create_category(&self, category: &NewCategory) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO storefront.category (name, slug)
            VALUES ($1, $2)
            RETURNING id, name, slug
            ",
        )
        .bind(&category.name)
        .bind(&category.slug)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, &format!("category {}", category.slug)))?;

        Ok(row.into())
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken and
    /// `RepositoryError::NotFound` if the category does not exist.
    pub async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let dims = product.base_dimensions;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO storefront.product
                (category_id, name, slug, base_price, base_length, base_width, base_height, is_configurable)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(product.category_id)
        .bind(&product.name)
        .bind(&product.slug)
        .bind(product.base_price)
        .bind(dims.map(|d| d.length))
        .bind(dims.map(|d| d.width))
        .bind(dims.map(|d| d.height))
        .bind(product.is_configurable)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, &format!("product {}", product.slug)))?;

        Ok(row.into())
    }

    /// Insert a variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the SKU is taken and
    /// `RepositoryError::NotFound` if the product does not exist.
    pub async fn create_variant(
        &self,
        variant: &NewVariant,
    ) -> Result<ProductVariant, RepositoryError> {
        let row = sqlx::query_as::<_, VariantRow>(
            r"
            INSERT INTO storefront.product_variant (product_id, name, sku)
            VALUES ($1, $2, $3)
            RETURNING id, product_id, name, sku
            ",
        )
        .bind(variant.product_id)
        .bind(&variant.name)
        .bind(&variant.sku)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_write_error(e, &format!("variant {}", variant.name)))?;

        Ok(row.into())
    }

    /// Insert a configurable part after checking its product is configurable.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown product and
    /// `RepositoryError::Validation` for a non-configurable one.
    #[instrument(skip(self, part), fields(product_id = %part.product_id, kind = %part.kind))]
    pub async fn create_part(&self, part: &NewPart) -> Result<ConfigurablePart, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let is_configurable: Option<bool> = sqlx::query_scalar(
            r"
            SELECT is_configurable
            FROM storefront.product
            WHERE id = $1
            FOR SHARE
            ",
        )
        .bind(part.product_id)
        .fetch_optional(&mut *tx)
        .await?;

        match is_configurable {
            None => {
                return Err(RepositoryError::NotFound(format!(
                    "product {}",
                    part.product_id
                )));
            }
            Some(false) => {
                return Err(RepositoryError::Validation(format!(
                    "product {} is not configurable",
                    part.product_id
                )));
            }
            Some(true) => {}
        }

        let row = sqlx::query_as::<_, PartRow>(
            r"
            INSERT INTO storefront.configurable_part (product_id, kind, name, price_modifier)
            VALUES ($1, $2, $3, $4)
            RETURNING id, product_id, kind, name, price_modifier
            ",
        )
        .bind(part.product_id)
        .bind(part.kind.as_str())
        .bind(part.name.trim())
        .bind(part.price_modifier)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, &format!("{} part {}", part.kind, part.name)))?;

        tx.commit().await?;
        row.try_into()
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Get a variant by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_variant(
        &self,
        id: VariantId,
    ) -> Result<Option<ProductVariant>, RepositoryError> {
        let row = sqlx::query_as::<_, VariantRow>(
            r"
            SELECT id, product_id, name, sku
            FROM storefront.product_variant
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// All parts of a product in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if a stored kind is unknown.
    pub async fn list_parts(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ConfigurablePart>, RepositoryError> {
        let rows = sqlx::query_as::<_, PartRow>(
            r"
            SELECT id, product_id, kind, name, price_modifier
            FROM storefront.configurable_part
            WHERE product_id = $1
            ORDER BY id
            ",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Change a product's base price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update_product_base_price(
        &self,
        id: ProductId,
        base_price: Decimal,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE storefront.product
            SET base_price = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(base_price)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_write_error(e, &format!("product {id}")))?
        .ok_or_else(|| RepositoryError::NotFound(format!("product {id}")))?;

        Ok(row.into())
    }

    /// Change a part's price modifier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the part does not exist.
    pub async fn update_part_price_modifier(
        &self,
        id: PartId,
        price_modifier: Decimal,
    ) -> Result<ConfigurablePart, RepositoryError> {
        let row = sqlx::query_as::<_, PartRow>(
            r"
            UPDATE storefront.configurable_part
            SET price_modifier = $2
            WHERE id = $1
            RETURNING id, product_id, kind, name, price_modifier
            ",
        )
        .bind(id)
        .bind(price_modifier)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("part {id}")))?;

        row.try_into()
    }
}
