//! Configurator service: option listing and price preview.

use tracing::{debug, instrument};

use atelier_core::catalog::ConfiguratorOptions;
use atelier_core::pricing::{self, PriceBreakdown};
use atelier_core::{ConfigurationRecord, CoreError, CurrencyCode, ProductId};

use crate::store::{CommerceStore, StoreResult};

/// Canonicalize a submitted configuration. A record with nothing selected is
/// treated as no configuration at all.
///
/// # Errors
///
/// Returns `CoreError::Validation` for blank names or non-positive dimensions.
pub fn normalize_configuration(
    configuration: Option<ConfigurationRecord>,
) -> Result<Option<ConfigurationRecord>, CoreError> {
    match configuration {
        Some(record) => {
            let record = record.canonicalize()?;
            Ok((!record.is_empty()).then_some(record))
        }
        None => Ok(None),
    }
}

/// Read-only configurator operations.
pub struct ConfiguratorService<'a> {
    store: &'a dyn CommerceStore,
    currency: CurrencyCode,
}

impl<'a> ConfiguratorService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn CommerceStore, currency: CurrencyCode) -> Self {
        Self { store, currency }
    }

    /// Option names per part kind.
    ///
    /// An unknown or non-configurable product has no options; that is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Persistence` if the store cannot be read.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_options(&self, product_id: ProductId) -> StoreResult<ConfiguratorOptions> {
        match self.store.product(product_id).await? {
            Some(product) if product.is_configurable => {
                let parts = self.store.parts(product_id).await?;
                Ok(ConfiguratorOptions::from_parts(&parts))
            }
            _ => Ok(ConfiguratorOptions::empty()),
        }
    }

    /// Price a configuration without touching any cart.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` for an unknown product and
    /// `CoreError::Validation` for a malformed configuration.
    #[instrument(skip(self, configuration), fields(product_id = %product_id))]
    pub async fn calculate_price(
        &self,
        product_id: ProductId,
        configuration: Option<ConfigurationRecord>,
    ) -> StoreResult<PriceBreakdown> {
        let configuration = normalize_configuration(configuration)?;

        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or_else(|| CoreError::not_found(format!("product {product_id}")))?;
        let parts = self.store.parts(product_id).await?;

        let breakdown =
            pricing::compute_price(&product, &parts, configuration.as_ref(), self.currency)?;
        debug!(price = %breakdown.price, "Configuration priced");
        Ok(breakdown)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use atelier_core::{Dimensions, PartKind};

    use super::*;
    use crate::store::{InMemoryStore, NewCategory, NewPart, NewProduct, StoreError};

    async fn sofa_store() -> (InMemoryStore, ProductId) {
        let store = InMemoryStore::new();
        let category = store
            .create_category(NewCategory {
                name: "Sofas".to_owned(),
                slug: "sofas".to_owned(),
            })
            .await
            .unwrap();
        let product = store
            .create_product(NewProduct {
                category_id: category.id,
                name: "Harbor Sofa".to_owned(),
                slug: "harbor-sofa".to_owned(),
                base_price: Decimal::new(129_900, 2),
                base_dimensions: Some(
                    Dimensions::new(Decimal::from(240), Decimal::from(95), Decimal::from(85))
                        .unwrap(),
                ),
                is_configurable: true,
            })
            .await
            .unwrap();
        for (kind, name, modifier) in [
            (PartKind::LegType, "Metal", Decimal::from(50)),
            (PartKind::LegType, "Wood", Decimal::ZERO),
            (PartKind::Material, "Linen", Decimal::from(120)),
        ] {
            store
                .create_part(NewPart {
                    product_id: product.id,
                    kind,
                    name: name.to_owned(),
                    price_modifier: modifier,
                })
                .await
                .unwrap();
        }
        (store, product.id)
    }

    #[test]
    fn test_empty_configuration_normalizes_to_none() {
        assert_eq!(
            normalize_configuration(Some(ConfigurationRecord::default())).unwrap(),
            None
        );
        let metal = ConfigurationRecord::default().with_selection(PartKind::LegType, " Metal ");
        assert_eq!(
            normalize_configuration(Some(metal))
                .unwrap()
                .unwrap()
                .leg_type
                .as_deref(),
            Some("Metal")
        );
    }

    #[tokio::test]
    async fn test_options_grouped_by_kind() {
        let (store, product_id) = sofa_store().await;
        let service = ConfiguratorService::new(&store, CurrencyCode::USD);

        let options = service.get_options(product_id).await.unwrap();
        assert_eq!(options.leg_types, vec!["Metal", "Wood"]);
        assert_eq!(options.materials, vec!["Linen"]);
        assert!(options.finishes.is_empty());
    }

    #[tokio::test]
    async fn test_options_for_unknown_product_are_empty() {
        let (store, _) = sofa_store().await;
        let service = ConfiguratorService::new(&store, CurrencyCode::USD);

        let options = service.get_options(ProductId::new(999)).await.unwrap();
        assert!(options.is_empty());
    }

    #[tokio::test]
    async fn test_calculate_price_scenario() {
        let (store, product_id) = sofa_store().await;
        let service = ConfiguratorService::new(&store, CurrencyCode::USD);
        let configuration = ConfigurationRecord::default()
            .with_dimensions(
                Dimensions::new(Decimal::from(240), Decimal::from(95), Decimal::from(85)).unwrap(),
            )
            .with_selection(PartKind::LegType, "Metal");

        let breakdown = service
            .calculate_price(product_id, Some(configuration))
            .await
            .unwrap();
        assert_eq!(breakdown.price.to_string(), "1349.00");
        assert_eq!(breakdown.size_adjustment, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_calculate_price_unknown_product() {
        let (store, _) = sofa_store().await;
        let service = ConfiguratorService::new(&store, CurrencyCode::USD);

        let err = service
            .calculate_price(ProductId::new(999), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(CoreError::NotFound(_))));
    }
}
