//! Catalog types and the configurator option listing.
//!
//! Products and their configurable parts are owned by the back-office. The
//! configurator only reads them: [`ConfiguratorOptions::from_parts`] groups the
//! part names a customer may choose from, and the pricing engine looks up the
//! selected parts' modifiers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, Dimensions, PartId, PartKind, ProductId, VariantId};

/// A product category (tables, sofas, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
    /// Price before any configuration is applied.
    pub base_price: Decimal,
    /// Reference size the base price is quoted for.
    pub base_dimensions: Option<Dimensions>,
    /// Whether customers may customize dimensions and parts.
    pub is_configurable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchasable variant of a product (e.g. a fixed colourway).
///
/// Variants are carried on cart and order lines as a reference. They do not
/// alter the configured price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub sku: Option<String>,
}

/// One selectable option of a configurable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurablePart {
    pub id: PartId,
    pub product_id: ProductId,
    pub kind: PartKind,
    pub name: String,
    /// Signed amount added to the price when this part is selected.
    pub price_modifier: Decimal,
}

/// Distinct part names per kind, as offered by the configurator UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfiguratorOptions {
    pub materials: Vec<String>,
    pub finishes: Vec<String>,
    pub frame_types: Vec<String>,
    pub leg_types: Vec<String>,
    pub tabletop_types: Vec<String>,
}

impl ConfiguratorOptions {
    /// Options for a product with nothing to configure.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Group part names by kind.
    ///
    /// Parts are visited in ascending id order and duplicate names within a
    /// kind are listed once, at the position of their lowest id.
    #[must_use]
    pub fn from_parts(parts: &[ConfigurablePart]) -> Self {
        let mut sorted: Vec<&ConfigurablePart> = parts.iter().collect();
        sorted.sort_by_key(|p| p.id);

        let mut options = Self::empty();
        for part in sorted {
            let names = options.names_mut(part.kind);
            if !names.iter().any(|n| n == &part.name) {
                names.push(part.name.clone());
            }
        }
        options
    }

    /// Option names offered for a kind.
    #[must_use]
    pub fn names(&self, kind: PartKind) -> &[String] {
        match kind {
            PartKind::Material => &self.materials,
            PartKind::Finish => &self.finishes,
            PartKind::Frame => &self.frame_types,
            PartKind::LegType => &self.leg_types,
            PartKind::TabletopType => &self.tabletop_types,
        }
    }

    /// True when no kind has any option.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        PartKind::PRICING_ORDER.iter().all(|k| self.names(*k).is_empty())
    }

    fn names_mut(&mut self, kind: PartKind) -> &mut Vec<String> {
        match kind {
            PartKind::Material => &mut self.materials,
            PartKind::Finish => &mut self.finishes,
            PartKind::Frame => &mut self.frame_types,
            PartKind::LegType => &mut self.leg_types,
            PartKind::TabletopType => &mut self.tabletop_types,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(id: i32, kind: PartKind, name: &str) -> ConfigurablePart {
        ConfigurablePart {
            id: PartId::new(id),
            product_id: ProductId::new(1),
            kind,
            name: name.to_string(),
            price_modifier: Decimal::ZERO,
        }
    }

    #[test]
    fn test_from_parts_groups_by_kind() {
        let parts = vec![
            part(1, PartKind::LegType, "Metal"),
            part(2, PartKind::LegType, "Wood"),
            part(3, PartKind::Finish, "Matte"),
            part(4, PartKind::Material, "Oak"),
            part(5, PartKind::Frame, "Steel"),
            part(6, PartKind::TabletopType, "Glass"),
        ];

        let options = ConfiguratorOptions::from_parts(&parts);
        assert_eq!(options.leg_types, vec!["Metal", "Wood"]);
        assert_eq!(options.finishes, vec!["Matte"]);
        assert_eq!(options.materials, vec!["Oak"]);
        assert_eq!(options.frame_types, vec!["Steel"]);
        assert_eq!(options.tabletop_types, vec!["Glass"]);
    }

    #[test]
    fn test_from_parts_dedupes_in_id_order() {
        let parts = vec![
            part(9, PartKind::Material, "Walnut"),
            part(3, PartKind::Material, "Oak"),
            part(5, PartKind::Material, "Walnut"),
        ];

        let options = ConfiguratorOptions::from_parts(&parts);
        assert_eq!(options.materials, vec!["Oak", "Walnut"]);
    }

    #[test]
    fn test_empty_options() {
        let options = ConfiguratorOptions::from_parts(&[]);
        assert!(options.is_empty());
        assert_eq!(options, ConfiguratorOptions::empty());
    }

    #[test]
    fn test_options_serialize_camel_case() {
        let json = serde_json::to_value(ConfiguratorOptions::empty()).unwrap_or_default();
        assert!(json.get("frameTypes").is_some());
        assert!(json.get("tabletopTypes").is_some());
    }
}
