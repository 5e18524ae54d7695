//! Cart lines and the rules for adding, updating and removing them.
//!
//! A cart line is identified for merging by its [`LineKey`]: product, optional
//! variant and the canonical configuration. Adding a key that already has a
//! line increments that line's quantity and keeps its frozen unit price.
//! Adding a new key creates a line priced once, at creation.
//!
//! ```text
//! absent ──add(q)──▶ present(q, p)
//! present(n) ──add(k)──▶ present(n + k, p)
//! present(n) ──update(m > 0)──▶ present(m, p)
//! present(n) ──update(0) / remove──▶ absent
//! ```
//!
//! The functions here only plan a transition. Stores apply the plan inside a
//! transaction that holds the cart lock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{CartId, CartLineId, ConfigurationRecord, ProductId, VariantId};

/// Largest quantity a single line may hold.
pub const MAX_LINE_QUANTITY: u32 = 9_999;

/// A shopping cart and its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    /// Bumped by every line mutation.
    pub version: i64,
    pub lines: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Sum of `unit_price * quantity` over all lines.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the sum overflows.
    pub fn subtotal(&self) -> Result<Decimal, CoreError> {
        self.lines.iter().try_fold(Decimal::ZERO, |acc, line| {
            acc.checked_add(line.line_total()?)
                .ok_or_else(|| CoreError::validation("cart subtotal overflowed"))
        })
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Look up a line by id.
    #[must_use]
    pub fn line(&self, line_id: CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }
}

/// One line of a cart with its frozen unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartLineId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub configuration: Option<ConfigurationRecord>,
    pub quantity: u32,
    /// Price captured when the line was created. Never recomputed.
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    /// `unit_price * quantity`, computed at display time.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the product overflows.
    pub fn line_total(&self) -> Result<Decimal, CoreError> {
        self.unit_price
            .checked_mul(Decimal::from(self.quantity))
            .ok_or_else(|| {
                CoreError::validation(format!("cart line {} total overflowed", self.id))
            })
    }

    /// Merge key of this line.
    ///
    /// # Errors
    ///
    /// Propagates configuration serialization failures.
    pub fn key(&self) -> Result<LineKey, CoreError> {
        LineKey::new(self.product_id, self.variant_id, self.configuration.as_ref())
    }
}

/// Identity of a cart line for merging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineKey {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    /// Canonical configuration JSON, empty when unconfigured.
    pub configuration: String,
}

impl LineKey {
    /// Build the key for a product, variant and configuration.
    ///
    /// # Errors
    ///
    /// Propagates configuration serialization failures.
    pub fn new(
        product_id: ProductId,
        variant_id: Option<VariantId>,
        configuration: Option<&ConfigurationRecord>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            product_id,
            variant_id,
            configuration: ConfigurationRecord::merge_key(configuration)?,
        })
    }
}

/// What an add-to-cart request does to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPlan {
    /// Raise an existing line to `quantity`; its unit price stays as is.
    Increment { line_id: CartLineId, quantity: u32 },
    /// Create a new line priced now.
    Insert { quantity: u32 },
}

/// What a quantity update does to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePlan {
    SetQuantity(u32),
    Remove,
}

/// Validate the quantity of an add-to-cart request.
///
/// # Errors
///
/// Returns `CoreError::Validation` unless `1 <= quantity <= MAX_LINE_QUANTITY`.
pub fn validate_add_quantity(quantity: i64) -> Result<u32, CoreError> {
    if quantity < 1 {
        return Err(CoreError::validation(format!(
            "quantity must be at least 1 (got {quantity})"
        )));
    }
    bounded_quantity(quantity)
}

/// Plan an add-to-cart against the cart's current lines.
///
/// # Errors
///
/// Returns `CoreError::Validation` for a non-positive quantity or when the
/// merged quantity would exceed [`MAX_LINE_QUANTITY`].
pub fn plan_add(lines: &[CartLine], key: &LineKey, quantity: i64) -> Result<AddPlan, CoreError> {
    let quantity = validate_add_quantity(quantity)?;

    for line in lines {
        if &line.key()? == key {
            let merged = line.quantity.saturating_add(quantity);
            if merged > MAX_LINE_QUANTITY {
                return Err(CoreError::validation(format!(
                    "line quantity may not exceed {MAX_LINE_QUANTITY}"
                )));
            }
            return Ok(AddPlan::Increment {
                line_id: line.id,
                quantity: merged,
            });
        }
    }

    Ok(AddPlan::Insert { quantity })
}

/// Plan an explicit quantity update. Zero removes the line.
///
/// # Errors
///
/// Returns `CoreError::Validation` for a negative quantity or one above
/// [`MAX_LINE_QUANTITY`].
pub fn plan_update(quantity: i64) -> Result<UpdatePlan, CoreError> {
    if quantity < 0 {
        return Err(CoreError::validation(format!(
            "quantity may not be negative (got {quantity})"
        )));
    }
    if quantity == 0 {
        return Ok(UpdatePlan::Remove);
    }
    bounded_quantity(quantity).map(UpdatePlan::SetQuantity)
}

fn bounded_quantity(quantity: i64) -> Result<u32, CoreError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q <= MAX_LINE_QUANTITY)
        .ok_or_else(|| {
            CoreError::validation(format!("line quantity may not exceed {MAX_LINE_QUANTITY}"))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::PartKind;

    fn line(id: i32, config: Option<ConfigurationRecord>, quantity: u32) -> CartLine {
        CartLine {
            id: CartLineId::new(id),
            cart_id: CartId::new(1),
            product_id: ProductId::new(1),
            variant_id: None,
            configuration: config,
            quantity,
            unit_price: Decimal::new(134_900, 2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn metal() -> ConfigurationRecord {
        ConfigurationRecord::default().with_selection(PartKind::LegType, "Metal")
    }

    #[test]
    fn test_first_add_inserts() {
        let key = LineKey::new(ProductId::new(1), None, Some(&metal())).unwrap();
        assert_eq!(plan_add(&[], &key, 1).unwrap(), AddPlan::Insert { quantity: 1 });
    }

    #[test]
    fn test_identical_add_increments() {
        let lines = vec![line(7, Some(metal()), 1)];
        let key = LineKey::new(ProductId::new(1), None, Some(&metal())).unwrap();
        assert_eq!(
            plan_add(&lines, &key, 2).unwrap(),
            AddPlan::Increment {
                line_id: CartLineId::new(7),
                quantity: 3
            }
        );
    }

    #[test]
    fn test_different_configuration_inserts() {
        let lines = vec![line(7, Some(metal()), 1)];
        let wood = ConfigurationRecord::default().with_selection(PartKind::LegType, "Wood");
        let key = LineKey::new(ProductId::new(1), None, Some(&wood)).unwrap();
        assert_eq!(plan_add(&lines, &key, 1).unwrap(), AddPlan::Insert { quantity: 1 });
    }

    #[test]
    fn test_variant_distinguishes_lines() {
        let lines = vec![line(7, None, 1)];
        let key = LineKey::new(ProductId::new(1), Some(VariantId::new(3)), None).unwrap();
        assert_eq!(plan_add(&lines, &key, 1).unwrap(), AddPlan::Insert { quantity: 1 });
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let key = LineKey::new(ProductId::new(1), None, None).unwrap();
        assert!(matches!(plan_add(&[], &key, 0), Err(CoreError::Validation(_))));
        assert!(matches!(plan_add(&[], &key, -4), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_merge_rejects_overflowing_quantity() {
        let lines = vec![line(7, None, MAX_LINE_QUANTITY)];
        let key = LineKey::new(ProductId::new(1), None, None).unwrap();
        assert!(plan_add(&lines, &key, 1).is_err());
    }

    #[test]
    fn test_overflowing_totals_are_errors() {
        let mut huge = line(1, None, MAX_LINE_QUANTITY);
        huge.unit_price = Decimal::MAX;
        assert!(huge.line_total().is_err());

        let cart = Cart {
            id: CartId::new(1),
            version: 1,
            lines: vec![huge],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(cart.subtotal().is_err());
    }

    #[test]
    fn test_update_plans() {
        assert_eq!(plan_update(0).unwrap(), UpdatePlan::Remove);
        assert_eq!(plan_update(5).unwrap(), UpdatePlan::SetQuantity(5));
        assert!(plan_update(-1).is_err());
        assert!(plan_update(i64::from(MAX_LINE_QUANTITY) + 1).is_err());
    }

    #[test]
    fn test_line_total_and_subtotal() {
        let cart = Cart {
            id: CartId::new(1),
            version: 2,
            lines: vec![line(1, Some(metal()), 2), line(2, None, 1)],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(cart.lines[0].line_total().unwrap(), Decimal::new(269_800, 2));
        assert_eq!(cart.subtotal().unwrap(), Decimal::new(404_700, 2));
        assert_eq!(cart.item_count(), 3);
        assert!(cart.line(CartLineId::new(2)).is_some());
        assert!(cart.line(CartLineId::new(3)).is_none());
    }
}
