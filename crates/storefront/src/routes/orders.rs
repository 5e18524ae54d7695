//! Order route handlers.

use axum::{Json, extract::State};
use tracing::instrument;

use atelier_core::OrderId;
use atelier_core::order::Order;

use super::ApiPath;
use crate::error::{AppError, Result};
use crate::services::CheckoutService;
use crate::state::AppState;

/// Show a placed order.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(order_id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    let service = CheckoutService::new(state.store(), state.currency());
    let order = service
        .get_order(order_id)
        .await
        .map_err(|e| AppError::from_store("load order", e))?;
    Ok(Json(order))
}
