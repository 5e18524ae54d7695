//! Configurator pricing engine.
//!
//! [`compute_price`] is a pure function of the product, its parts and the
//! customer's configuration. The same function prices the live configurator
//! preview and the unit price frozen onto a cart line, so the two can never
//! disagree.
//!
//! # Algorithm
//!
//! 1. Start from the product's base price.
//! 2. For each kind in [`PartKind::PRICING_ORDER`], add the modifier of the
//!    selected part. A selection with no matching part adds nothing. When the
//!    catalog holds several parts with the same kind and name, the lowest part
//!    id wins.
//! 3. If the configuration carries dimensions and the product has base
//!    dimensions, apply the volume rule:
//!    `price += (new_volume / base_volume - 1) * price * 0.5`.
//! 4. Clamp at zero.
//! 5. Round to the currency's display scale.
//! 6. Reject prices at or above [`MAX_UNIT_PRICE`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{ConfigurablePart, Product};
use crate::error::CoreError;
use crate::types::{ConfigurationRecord, CurrencyCode, PartId, PartKind};

/// Share of the relative volume change passed on to the price.
pub const SIZE_PRICE_ELASTICITY: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Exclusive upper bound of a unit price. Matches the `NUMERIC(12,2)` columns
/// unit prices are stored in.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_410_065_408, 2, 0, false, 0);

/// A part selection and what it contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedModifier {
    pub kind: PartKind,
    pub name: String,
    /// The catalog part that matched, or `None` for an unknown selection.
    pub part_id: Option<PartId>,
    pub amount: Decimal,
}

/// Result of pricing a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    /// Final unit price, clamped and rounded.
    pub price: Decimal,
    pub base_price: Decimal,
    pub modifiers: Vec<AppliedModifier>,
    /// Amount added (or removed) by the size rule, rounded for display.
    pub size_adjustment: Decimal,
    pub currency: CurrencyCode,
}

/// Price a configuration of a product.
///
/// Parts belonging to other products are ignored. A configuration on a
/// non-configurable product is still priced on a best-effort basis.
///
/// # Errors
///
/// Returns `CoreError::Validation` if the product's base dimensions are not
/// positive, the arithmetic overflows, or the price reaches
/// [`MAX_UNIT_PRICE`].
pub fn compute_price(
    product: &Product,
    parts: &[ConfigurablePart],
    configuration: Option<&ConfigurationRecord>,
    currency: CurrencyCode,
) -> Result<PriceBreakdown, CoreError> {
    let mut price = product.base_price;
    let mut modifiers = Vec::new();
    let mut size_adjustment = Decimal::ZERO;

    if let Some(config) = configuration {
        for kind in PartKind::PRICING_ORDER {
            let Some(name) = config.selection(kind) else {
                continue;
            };

            let matched = find_part(parts, product, kind, name);
            let amount = matched.map_or(Decimal::ZERO, |p| p.price_modifier);
            price = price.checked_add(amount).ok_or_else(overflow)?;

            modifiers.push(AppliedModifier {
                kind,
                name: name.to_owned(),
                part_id: matched.map(|p| p.id),
                amount,
            });
        }

        if let (Some(requested), Some(base)) = (config.dimensions, product.base_dimensions) {
            let base_volume = base.volume().ok_or_else(overflow)?;
            if base_volume <= Decimal::ZERO {
                return Err(CoreError::validation(format!(
                    "product {} has non-positive base dimensions",
                    product.id
                )));
            }
            let requested_volume = requested.volume().ok_or_else(overflow)?;
            let multiplier = requested_volume
                .checked_div(base_volume)
                .ok_or_else(overflow)?;

            size_adjustment = (multiplier - Decimal::ONE)
                .checked_mul(price)
                .and_then(|d| d.checked_mul(SIZE_PRICE_ELASTICITY))
                .ok_or_else(overflow)?;
            price = price.checked_add(size_adjustment).ok_or_else(overflow)?;
        }
    }

    let price = currency.round(price.max(Decimal::ZERO));
    if price >= MAX_UNIT_PRICE {
        return Err(CoreError::validation(format!(
            "configured price {price} exceeds the maximum unit price"
        )));
    }

    Ok(PriceBreakdown {
        price,
        base_price: product.base_price,
        modifiers,
        size_adjustment: currency.round(size_adjustment),
        currency,
    })
}

/// First matching part by ascending id.
fn find_part<'a>(
    parts: &'a [ConfigurablePart],
    product: &Product,
    kind: PartKind,
    name: &str,
) -> Option<&'a ConfigurablePart> {
    parts
        .iter()
        .filter(|p| p.product_id == product.id && p.kind == kind && p.name == name)
        .min_by_key(|p| p.id)
}

fn overflow() -> CoreError {
    CoreError::validation("price computation overflowed")
}
