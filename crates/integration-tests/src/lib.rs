//! Integration tests for Atelier.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p atelier-integration-tests
//! ```
//!
//! Most tests run against the in-memory store, through either the service
//! layer or the full router (`tower::ServiceExt::oneshot`), so no database is
//! required. The `postgres_store` tests are ignored unless run with
//! `--ignored` and a `DATABASE_URL`.
//!
//! # Test Categories
//!
//! - `cart_merge` - Line identity, quantity merging, concurrency and frozen prices
//! - `checkout` - Order materialization and rollback
//! - `http_api` - Status codes and bodies of the JSON API
//! - `postgres_store` - Upsert merge, cart lock and transactional checkout in SQL

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

use atelier_core::catalog::{ConfigurablePart, Product};
use atelier_core::order::ShippingAddress;
use atelier_core::{Dimensions, PartKind, VariantId};
use atelier_storefront::config::StorefrontConfig;
use atelier_storefront::state::AppState;
use atelier_storefront::store::{
    CommerceStore, InMemoryStore, NewCategory, NewPart, NewProduct, NewVariant,
};

/// A seeded store with one configurable sofa and one plain product.
pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    /// Harbor Sofa, 1299.00, configurable, 240 x 95 x 85.
    pub sofa: Product,
    /// Wood legs, +0.00.
    pub wood_legs: ConfigurablePart,
    /// Metal legs, +50.00.
    pub metal_legs: ConfigurablePart,
    /// Linen, +120.00.
    pub linen: ConfigurablePart,
    pub sofa_variant: VariantId,
    /// Wool Throw, 89.00, not configurable.
    pub throw: Product,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());

        let category = store
            .create_category(NewCategory {
                name: "Sofas".to_string(),
                slug: "sofas".to_string(),
            })
            .await
            .unwrap();

        let sofa = store
            .create_product(NewProduct {
                category_id: category.id,
                name: "Harbor Sofa".to_string(),
                slug: "harbor-sofa".to_string(),
                base_price: Decimal::new(129_900, 2),
                base_dimensions: Some(
                    Dimensions::new(Decimal::from(240), Decimal::from(95), Decimal::from(85))
                        .unwrap(),
                ),
                is_configurable: true,
            })
            .await
            .unwrap();

        let part = |kind, name: &str, modifier| NewPart {
            product_id: sofa.id,
            kind,
            name: name.to_string(),
            price_modifier: modifier,
        };
        let wood_legs = store
            .create_part(part(PartKind::LegType, "Wood", Decimal::ZERO))
            .await
            .unwrap();
        let metal_legs = store
            .create_part(part(PartKind::LegType, "Metal", Decimal::new(5_000, 2)))
            .await
            .unwrap();
        let linen = store
            .create_part(part(PartKind::Material, "Linen", Decimal::new(12_000, 2)))
            .await
            .unwrap();

        let sofa_variant = store
            .create_variant(NewVariant {
                product_id: sofa.id,
                name: "Standard".to_string(),
                sku: Some("HARBOR-STD".to_string()),
            })
            .await
            .unwrap()
            .id;

        let throw = store
            .create_product(NewProduct {
                category_id: category.id,
                name: "Wool Throw".to_string(),
                slug: "wool-throw".to_string(),
                base_price: Decimal::new(8_900, 2),
                base_dimensions: None,
                is_configurable: false,
            })
            .await
            .unwrap();

        Self {
            store,
            sofa,
            wood_legs,
            metal_legs,
            linen,
            sofa_variant,
            throw,
        }
    }

    /// Application state over this fixture's store.
    #[must_use]
    pub fn state(&self) -> AppState {
        let store: Arc<dyn CommerceStore> = self.store.clone();
        AppState::new(StorefrontConfig::default(), store)
    }
}

/// A valid shipping address.
#[must_use]
pub fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        recipient: "Ada Lovelace".to_string(),
        line1: "12 Workshop Lane".to_string(),
        line2: None,
        city: "Portland".to_string(),
        region: Some("OR".to_string()),
        postal_code: "97201".to_string(),
        country_code: "US".to_string(),
        phone: None,
    }
}

/// Send one request through a fresh router and return status and body.
///
/// The body is parsed as JSON when possible and returned as a string value
/// otherwise (plain-text errors, empty 204 bodies).
pub async fn send(
    state: &AppState,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = atelier_storefront::app(state.clone())
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
    (status, value)
}

/// Read a decimal serialized as a JSON string.
#[must_use]
pub fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}
