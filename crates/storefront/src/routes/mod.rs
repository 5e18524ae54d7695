//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                  - Liveness check
//! GET    /health/ready                            - Readiness check (store reachable)
//!
//! # Configurator
//! GET    /api/products/{id}/configurator          - Option names per part kind
//! POST   /api/products/{id}/configurator/price    - Price a configuration
//!
//! # Cart
//! POST   /api/carts                               - Create a cart
//! GET    /api/carts/{cart_id}                     - Cart with lines and subtotal
//! POST   /api/carts/{cart_id}/lines               - Add (or merge) a line
//! PATCH  /api/carts/{cart_id}/lines/{line_id}     - Set quantity (0 removes)
//! DELETE /api/carts/{cart_id}/lines/{line_id}     - Remove a line
//! POST   /api/carts/{cart_id}/checkout            - Place an order
//!
//! # Orders
//! GET    /api/orders/{order_id}                   - Placed order
//! ```

pub mod cart;
pub mod configurator;
pub mod health;
pub mod orders;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
    routing::{get, patch, post},
};

use crate::error::AppError;
use crate::state::AppState;

/// JSON body extractor whose rejections render as [`AppError::BadRequest`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections render as [`AppError::BadRequest`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Create the configurator routes router.
pub fn configurator_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}/configurator", get(configurator::options))
        .route("/{id}/configurator/price", post(configurator::price))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/{cart_id}", get(cart::show))
        .route("/{cart_id}/lines", post(cart::add_line))
        .route(
            "/{cart_id}/lines/{line_id}",
            patch(cart::update_line).delete(cart::remove_line),
        )
        .route("/{cart_id}/checkout", post(cart::checkout))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new().route("/{order_id}", get(orders::show))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/products", configurator_routes())
        .route("/api/carts", post(cart::create))
        .nest("/api/carts", cart_routes())
        .nest("/api/orders", order_routes())
}
