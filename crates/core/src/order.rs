//! Orders and the cart-to-order materializer.
//!
//! [`materialize`] copies cart lines into order lines verbatim. It never calls
//! the pricing engine: the unit price a customer saw in their cart is the
//! price they pay, whatever happens to the catalog afterwards.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::CartLine;
use crate::error::CoreError;
use crate::types::{
    CartId, ConfigurationRecord, CurrencyCode, OrderId, OrderLineId, OrderStatus, ProductId,
    VariantId,
};

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShippingAddress {
    pub recipient: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// Check required fields are present and the country code is two letters.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` naming the first bad field.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (field, value) in [
            ("recipient", &self.recipient),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postalCode", &self.postal_code),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::validation(format!(
                    "shipping address {field} is required"
                )));
            }
        }

        let country = self.country_code.trim();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::validation(
                "shipping address countryCode must be a two-letter code",
            ));
        }

        Ok(())
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub cart_id: CartId,
    pub status: OrderStatus,
    pub currency: CurrencyCode,
    pub shipping_address: ShippingAddress,
    /// Stored at placement; never recalculated from the catalog.
    pub total: Decimal,
    pub lines: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

/// A frozen copy of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub configuration: Option<ConfigurationRecord>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl OrderLine {
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the product overflows.
    pub fn line_total(&self) -> Result<Decimal, CoreError> {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| CoreError::validation("order total overflowed"))
    }
}

/// An order line before it has been assigned ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub configuration: Option<ConfigurationRecord>,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Order lines and total derived from a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedOrder {
    pub lines: Vec<NewOrderLine>,
    pub total: Decimal,
}

/// Convert cart lines into order lines, copying price and configuration.
///
/// # Errors
///
/// Returns `CoreError::Validation` for an empty cart or a total that
/// overflows.
pub fn materialize(
    cart_lines: &[CartLine],
    currency: CurrencyCode,
) -> Result<MaterializedOrder, CoreError> {
    if cart_lines.is_empty() {
        return Err(CoreError::validation("cannot place an order for an empty cart"));
    }

    let mut total = Decimal::ZERO;
    let mut lines = Vec::with_capacity(cart_lines.len());

    for line in cart_lines {
        let line_total = line.line_total()?;
        total = total
            .checked_add(line_total)
            .ok_or_else(|| CoreError::validation("order total overflowed"))?;

        lines.push(NewOrderLine {
            product_id: line.product_id,
            variant_id: line.variant_id,
            configuration: line.configuration.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
        });
    }

    Ok(MaterializedOrder {
        lines,
        total: currency.round(total),
    })
}
