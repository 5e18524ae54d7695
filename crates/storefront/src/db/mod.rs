//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `category`, `product`, `product_variant`, `configurable_part` - Catalog
//! - `cart` - Carts, with a `version` bumped by every line mutation
//! - `cart_line` - Lines with frozen unit price and canonical configuration key
//! - `order`, `order_line` - Placed orders, copied verbatim from cart lines
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p atelier-cli -- migrate
//! ```

pub mod carts;
pub mod catalog;
pub mod orders;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use catalog::CatalogRepository;
pub use orders::OrderRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Input rejected by a constraint or a domain rule.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Constraint violation (e.g., duplicate slug) or stale cart version.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl From<atelier_core::CoreError> for RepositoryError {
    fn from(err: atelier_core::CoreError) -> Self {
        match err {
            atelier_core::CoreError::NotFound(what) => Self::NotFound(what),
            atelier_core::CoreError::Validation(msg) => Self::Validation(msg),
            atelier_core::CoreError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

/// Translate constraint violations raised by a write into domain errors.
///
/// `subject` names the row being written, e.g. `"product harbor-sofa"`.
pub(crate) fn map_write_error(e: sqlx::Error, subject: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(format!("{subject} already exists"));
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::NotFound(format!("reference of {subject}"));
        }
        if db_err.is_check_violation() {
            return RepositoryError::Validation(format!("{subject} violates {}", constraint_name(&**db_err)));
        }
    }
    RepositoryError::Database(e)
}

fn constraint_name(err: &dyn sqlx::error::DatabaseError) -> String {
    err.constraint().unwrap_or("a constraint").to_owned()
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
