//! The JSON API end to end through the router.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use atelier_integration_tests::{Fixture, decimal, send, shipping_address};
use atelier_storefront::state::AppState;
use atelier_storefront::store::Fault;

async fn new_cart(state: &AppState) -> i64 {
    let (status, body) = send(state, "POST", "/api/carts", None).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

fn metal_sofa(fixture: &Fixture, quantity: i64) -> Value {
    json!({
        "productId": fixture.sofa.id,
        "quantity": quantity,
        "configuration": { "legType": "Metal" },
    })
}

#[tokio::test]
async fn test_health() {
    let fixture = Fixture::new().await;
    let state = fixture.state();

    let (status, _) = send(&state, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&state, "GET", "/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_configurator_options_and_price() {
    let fixture = Fixture::new().await;
    let state = fixture.state();
    let sofa = fixture.sofa.id;

    let (status, body) =
        send(&state, "GET", &format!("/api/products/{sofa}/configurator"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["legTypes"], json!(["Wood", "Metal"]));
    assert_eq!(body["materials"], json!(["Linen"]));

    let (status, body) = send(
        &state,
        "POST",
        &format!("/api/products/{sofa}/configurator/price"),
        Some(json!({ "configuration": { "legType": "Metal" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["price"]), Decimal::new(134_900, 2));
    assert_eq!(decimal(&body["basePrice"]), Decimal::new(129_900, 2));
}

#[tokio::test]
async fn test_plain_product_has_empty_options() {
    let fixture = Fixture::new().await;
    let state = fixture.state();

    let (status, body) = send(
        &state,
        "GET",
        &format!("/api/products/{}/configurator", fixture.throw.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["legTypes"], json!([]));
}

#[tokio::test]
async fn test_add_merge_update_and_checkout() {
    let fixture = Fixture::new().await;
    let state = fixture.state();
    let cart = new_cart(&state).await;

    let (status, line) = send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/lines"),
        Some(metal_sofa(&fixture, 1)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&line["unitPrice"]), Decimal::new(134_900, 2));
    let line_id = line["id"].as_i64().unwrap();

    // Same configuration again merges
    let (status, merged) = send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/lines"),
        Some(metal_sofa(&fixture, 1)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merged["id"].as_i64().unwrap(), line_id);
    assert_eq!(merged["quantity"], 2);
    assert_eq!(decimal(&merged["lineTotal"]), Decimal::new(269_800, 2));

    let (status, view) = send(&state, "GET", &format!("/api/carts/{cart}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&view["subtotal"]), Decimal::new(269_800, 2));
    assert_eq!(view["itemCount"], 2);
    let version = view["version"].as_i64().unwrap();

    let (status, order) = send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/checkout"),
        Some(json!({
            "shippingAddress": shipping_address(),
            "expectedCartVersion": version,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(decimal(&order["total"]), Decimal::new(269_800, 2));

    let order_id = order["id"].as_i64().unwrap();
    let (status, fetched) = send(&state, "GET", &format!("/api/orders/{order_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, order);

    let (_, view) = send(&state, "GET", &format!("/api/carts/{cart}"), None).await;
    assert_eq!(view["lines"], json!([]));
}

#[tokio::test]
async fn test_update_to_zero_responds_no_content() {
    let fixture = Fixture::new().await;
    let state = fixture.state();
    let cart = new_cart(&state).await;

    let (_, line) = send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/lines"),
        Some(metal_sofa(&fixture, 3)),
    )
    .await;
    let line_id = line["id"].as_i64().unwrap();

    let (status, updated) = send(
        &state,
        "PATCH",
        &format!("/api/carts/{cart}/lines/{line_id}"),
        Some(json!({ "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["quantity"], 1);

    let (status, _) = send(
        &state,
        "PATCH",
        &format!("/api/carts/{cart}/lines/{line_id}"),
        Some(json!({ "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &state,
        "DELETE",
        &format!("/api/carts/{cart}/lines/{line_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_client_errors() {
    let fixture = Fixture::new().await;
    let state = fixture.state();
    let cart = new_cart(&state).await;

    // Unknown cart
    let (status, _) = send(&state, "GET", "/api/carts/999999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Unknown product
    let (status, _) = send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/lines"),
        Some(json!({ "productId": 999_999, "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Zero quantity on add
    let (status, _) = send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/lines"),
        Some(metal_sofa(&fixture, 0)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown configuration field
    let (status, _) = send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/lines"),
        Some(json!({
            "productId": fixture.sofa.id,
            "quantity": 1,
            "configuration": { "cushions": "Feather" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Non-numeric path segment
    let (status, _) = send(&state, "GET", "/api/carts/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Empty cart checkout
    let (status, _) = send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/checkout"),
        Some(json!({ "shippingAddress": shipping_address() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_dimensions_rejected_and_cart_stays_readable() {
    let fixture = Fixture::new().await;
    let state = fixture.state();
    let cart = new_cart(&state).await;

    let (status, _) = send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/lines"),
        Some(json!({
            "productId": fixture.sofa.id,
            "quantity": 9_999,
            "configuration": {
                "dimensions": {
                    "length": "8670000000000000000000000",
                    "width": "95",
                    "height": "85",
                },
            },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, view) = send(&state, "GET", &format!("/api/carts/{cart}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["lines"], json!([]));
    assert_eq!(decimal(&view["subtotal"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_stale_version_checkout_conflicts() {
    let fixture = Fixture::new().await;
    let state = fixture.state();
    let cart = new_cart(&state).await;

    send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/lines"),
        Some(metal_sofa(&fixture, 1)),
    )
    .await;
    let (_, view) = send(&state, "GET", &format!("/api/carts/{cart}"), None).await;
    let reviewed = view["version"].as_i64().unwrap();

    send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/lines"),
        Some(metal_sofa(&fixture, 1)),
    )
    .await;

    let (status, _) = send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/checkout"),
        Some(json!({
            "shippingAddress": shipping_address(),
            "expectedCartVersion": reviewed,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_storage_failures_name_the_action() {
    let fixture = Fixture::new().await;
    let state = fixture.state();
    let cart = new_cart(&state).await;

    fixture.store.inject_fault(Fault::NextCartWrite).unwrap();
    let (status, body) = send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/lines"),
        Some(metal_sofa(&fixture, 1)),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, Value::String("could not update cart".to_string()));

    let (_, view) = send(&state, "GET", &format!("/api/carts/{cart}"), None).await;
    assert_eq!(view["lines"], json!([]));

    send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/lines"),
        Some(metal_sofa(&fixture, 1)),
    )
    .await;
    fixture.store.inject_fault(Fault::OrderAfterLines(0)).unwrap();
    let (status, body) = send(
        &state,
        "POST",
        &format!("/api/carts/{cart}/checkout"),
        Some(json!({ "shippingAddress": shipping_address() })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, Value::String("could not place order".to_string()));

    let (_, view) = send(&state, "GET", &format!("/api/carts/{cart}"), None).await;
    assert_eq!(view["itemCount"], 1);
}
