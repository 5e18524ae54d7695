//! Cart route handlers.
//!
//! Cart mutations report storage failures as "could not update cart" and
//! checkout failures as "could not place order". Details go to Sentry only.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use atelier_core::cart::{Cart, CartLine};
use atelier_core::order::Order;
use atelier_core::{
    CartId, CartLineId, ConfigurationRecord, CoreError, CurrencyCode, ProductId, VariantId,
};

use super::{ApiJson, ApiPath};
use crate::error::{AppError, Result};
use crate::services::{AddToCart, CartService, Checkout, CheckoutService};
use crate::state::AppState;

const UPDATE_CART: &str = "update cart";
const PLACE_ORDER: &str = "place order";

/// Cart line as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub configuration: Option<ConfigurationRecord>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl TryFrom<CartLine> for CartLineView {
    type Error = AppError;

    fn try_from(line: CartLine) -> Result<Self> {
        Ok(Self {
            line_total: line.line_total().map_err(overflowed)?,
            id: line.id,
            product_id: line.product_id,
            variant_id: line.variant_id,
            configuration: line.configuration,
            quantity: line.quantity,
            unit_price: line.unit_price,
        })
    }
}

/// Cart as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: CartId,
    pub version: i64,
    pub lines: Vec<CartLineView>,
    pub subtotal: Decimal,
    pub item_count: u64,
    pub currency: CurrencyCode,
}

impl CartView {
    fn new(cart: Cart, currency: CurrencyCode) -> Result<Self> {
        Ok(Self {
            subtotal: currency.round(cart.subtotal().map_err(overflowed)?),
            item_count: cart.item_count(),
            id: cart.id,
            version: cart.version,
            lines: cart
                .lines
                .into_iter()
                .map(CartLineView::try_from)
                .collect::<Result<_>>()?,
            currency,
        })
    }
}

/// Stored prices are bounded, so a total that overflows is a server fault.
fn overflowed(err: CoreError) -> AppError {
    AppError::Internal(err.to_string())
}

/// Body of a quantity update.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateLineRequest {
    pub quantity: i64,
}

/// Create an empty cart.
#[instrument(skip(state))]
pub async fn create(State(state): State<AppState>) -> Result<(StatusCode, Json<CartView>)> {
    let service = CartService::new(state.store(), state.currency());
    let cart = service
        .create_cart()
        .await
        .map_err(|e| AppError::from_store("create cart", e))?;
    Ok((StatusCode::CREATED, Json(CartView::new(cart, state.currency())?)))
}

/// Show a cart with its lines, line totals and subtotal.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(cart_id): ApiPath<CartId>,
) -> Result<Json<CartView>> {
    let service = CartService::new(state.store(), state.currency());
    let cart = service
        .get_cart(cart_id)
        .await
        .map_err(|e| AppError::from_store("load cart", e))?;
    Ok(Json(CartView::new(cart, state.currency())?))
}

/// Add a line, or raise the quantity of an identical one.
#[instrument(skip(state, request))]
pub async fn add_line(
    State(state): State<AppState>,
    ApiPath(cart_id): ApiPath<CartId>,
    ApiJson(request): ApiJson<AddToCart>,
) -> Result<Json<CartLineView>> {
    let service = CartService::new(state.store(), state.currency());
    let line = service
        .add_to_cart(cart_id, request)
        .await
        .map_err(|e| AppError::from_store(UPDATE_CART, e))?;
    Ok(Json(CartLineView::try_from(line)?))
}

/// Set a line's quantity. Responds 204 when the update removed the line.
#[instrument(skip(state, request))]
pub async fn update_line(
    State(state): State<AppState>,
    ApiPath((cart_id, line_id)): ApiPath<(CartId, CartLineId)>,
    ApiJson(request): ApiJson<UpdateLineRequest>,
) -> Result<Response> {
    let service = CartService::new(state.store(), state.currency());
    let updated = service
        .update_cart_line(cart_id, line_id, request.quantity)
        .await
        .map_err(|e| AppError::from_store(UPDATE_CART, e))?;

    Ok(match updated {
        Some(line) => Json(CartLineView::try_from(line)?).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// Remove a line.
#[instrument(skip(state))]
pub async fn remove_line(
    State(state): State<AppState>,
    ApiPath((cart_id, line_id)): ApiPath<(CartId, CartLineId)>,
) -> Result<StatusCode> {
    let service = CartService::new(state.store(), state.currency());
    service
        .remove_cart_line(cart_id, line_id)
        .await
        .map_err(|e| AppError::from_store(UPDATE_CART, e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Place an order from the cart.
#[instrument(skip(state, checkout))]
pub async fn checkout(
    State(state): State<AppState>,
    ApiPath(cart_id): ApiPath<CartId>,
    ApiJson(checkout): ApiJson<Checkout>,
) -> Result<(StatusCode, Json<Order>)> {
    let service = CheckoutService::new(state.store(), state.currency());
    let order = service
        .place_order(cart_id, checkout)
        .await
        .map_err(|e| AppError::from_store(PLACE_ORDER, e))?;
    Ok((StatusCode::CREATED, Json(order)))
}
