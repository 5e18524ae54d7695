//! Seed the catalog from a YAML file.
//!
//! The file lists categories with their products, and each product's variants
//! and configurable parts (see `crates/cli/seeds/catalog.yaml`). Everything is
//! inserted through the same store operations the storefront uses, so the
//! configurable-product rule for parts applies here too.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use atelier_core::{Dimensions, PartKind};
use atelier_storefront::db;
use atelier_storefront::store::{
    CommerceStore, NewCategory, NewPart, NewProduct, NewVariant, PgStore, StoreResult,
};

use super::migrate::database_url;

/// Top level of a catalog seed file.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CatalogSeed {
    pub categories: Vec<CategorySeed>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategorySeed {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductSeed {
    pub name: String,
    pub slug: String,
    pub base_price: Decimal,
    #[serde(default)]
    pub base_dimensions: Option<Dimensions>,
    #[serde(default)]
    pub configurable: bool,
    #[serde(default)]
    pub variants: Vec<VariantSeed>,
    #[serde(default)]
    pub parts: Vec<PartSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VariantSeed {
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PartSeed {
    pub kind: PartKind,
    pub name: String,
    pub price_modifier: Decimal,
}

/// Counts of inserted rows.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub products: usize,
    pub variants: usize,
    pub parts: usize,
}

/// Problems that can be spotted before touching the database.
pub fn validate_seed(seed: &CatalogSeed) -> Vec<String> {
    let mut errors = Vec::new();

    for category in &seed.categories {
        for product in &category.products {
            if !product.configurable && !product.parts.is_empty() {
                errors.push(format!(
                    "{}: parts listed on a non-configurable product",
                    product.slug
                ));
            }
            if product.base_price < Decimal::ZERO {
                errors.push(format!("{}: negative base price", product.slug));
            }
            if let Some(dims) = product.base_dimensions
                && let Err(e) = dims.validate()
            {
                errors.push(format!("{}: {e}", product.slug));
            }
        }
    }

    errors
}

/// Insert a parsed catalog into a store.
///
/// # Errors
///
/// Stops at the first store error (e.g. a slug that already exists).
pub async fn seed_catalog(
    store: &dyn CommerceStore,
    seed: CatalogSeed,
) -> StoreResult<SeedSummary> {
    let mut summary = SeedSummary::default();

    for category in seed.categories {
        let created = store
            .create_category(NewCategory {
                name: category.name,
                slug: category.slug,
            })
            .await?;
        summary.categories += 1;

        for product in category.products {
            let product_row = store
                .create_product(NewProduct {
                    category_id: created.id,
                    name: product.name,
                    slug: product.slug,
                    base_price: product.base_price,
                    base_dimensions: product.base_dimensions,
                    is_configurable: product.configurable,
                })
                .await?;
            summary.products += 1;

            for variant in product.variants {
                store
                    .create_variant(NewVariant {
                        product_id: product_row.id,
                        name: variant.name,
                        sku: variant.sku,
                    })
                    .await?;
                summary.variants += 1;
            }

            for part in product.parts {
                store
                    .create_part(NewPart {
                        product_id: product_row.id,
                        kind: part.kind,
                        name: part.name,
                        price_modifier: part.price_modifier,
                    })
                    .await?;
                summary.parts += 1;
            }

            info!(product = %product_row.slug, id = %product_row.id, "Seeded product");
        }
    }

    Ok(summary)
}

/// Seed the catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if environment variables are missing, the file cannot be
/// read or parsed, validation fails, or a database operation fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url()?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;

    let errors = validate_seed(&seed);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let store = PgStore::new(pool);
    let summary = seed_catalog(&store, seed).await?;

    info!("Seeding complete!");
    info!("  Categories: {}", summary.categories);
    info!("  Products: {}", summary.products);
    info!("  Variants: {}", summary.variants);
    info!("  Parts: {}", summary.parts);

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use atelier_core::ProductId;
    use atelier_storefront::store::InMemoryStore;

    use super::*;

    const DEMO: &str = include_str!("../../seeds/catalog.yaml");

    #[test]
    fn test_demo_catalog_parses_and_validates() {
        let seed: CatalogSeed = serde_yaml::from_str(DEMO).unwrap();
        assert_eq!(seed.categories.len(), 3);
        assert!(validate_seed(&seed).is_empty());

        let sofa = &seed.categories[0].products[0];
        assert_eq!(sofa.base_price, Decimal::new(129_900, 2));
        assert!(sofa.parts.iter().any(|p| p.kind == PartKind::LegType && p.name == "Metal"));
    }

    #[test]
    fn test_parts_on_plain_product_flagged() {
        let seed: CatalogSeed = serde_yaml::from_str(
            r#"
categories:
  - name: Stools
    slug: stools
    products:
      - name: Stool
        slug: stool
        basePrice: "40"
        parts:
          - { kind: finish, name: Oiled, priceModifier: "5" }
"#,
        )
        .unwrap();
        assert_eq!(validate_seed(&seed).len(), 1);
    }

    #[tokio::test]
    async fn test_seed_demo_into_memory_store() {
        let store = InMemoryStore::new();
        let seed: CatalogSeed = serde_yaml::from_str(DEMO).unwrap();

        let summary = seed_catalog(&store, seed).await.unwrap();
        assert_eq!(
            summary,
            SeedSummary {
                categories: 3,
                products: 3,
                variants: 3,
                parts: 11,
            }
        );

        let mut parts = Vec::new();
        for id in 1..=20 {
            parts.extend(store.parts(ProductId::new(id)).await.unwrap());
        }
        assert_eq!(parts.len(), 11);
    }
}
