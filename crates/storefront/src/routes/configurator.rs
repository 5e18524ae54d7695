//! Configurator route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use atelier_core::catalog::ConfiguratorOptions;
use atelier_core::pricing::PriceBreakdown;
use atelier_core::{ConfigurationRecord, ProductId};

use super::{ApiJson, ApiPath};
use crate::error::{AppError, Result};
use crate::services::ConfiguratorService;
use crate::state::AppState;

/// Body of a price preview request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PriceRequest {
    #[serde(default)]
    pub configuration: Option<ConfigurationRecord>,
}

/// List the configurator options of a product.
#[instrument(skip(state))]
pub async fn options(
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<ConfiguratorOptions>> {
    let service = ConfiguratorService::new(state.store(), state.currency());
    let options = service
        .get_options(product_id)
        .await
        .map_err(|e| AppError::from_store("load configurator", e))?;
    Ok(Json(options))
}

/// Price a configuration of a product.
#[instrument(skip(state, request))]
pub async fn price(
    State(state): State<AppState>,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(request): ApiJson<PriceRequest>,
) -> Result<Json<PriceBreakdown>> {
    let service = ConfiguratorService::new(state.store(), state.currency());
    let breakdown = service
        .calculate_price(product_id, request.configuration)
        .await
        .map_err(|e| AppError::from_store("price configuration", e))?;
    Ok(Json(breakdown))
}
