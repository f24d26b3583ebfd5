//! Catalog seeding from YAML.
//!
//! ```yaml
//! categories:
//!   - name: Mugs
//!     description: Stoneware and enamel
//!     products:
//!       - title: Speckled Mug
//!         price: "14.00"
//!         stock: 40
//!         sku: MUG-SPK
//!         invoice_item_ref: "1042"
//! products:
//!   - title: Gift Card
//!     price: "25.00"
//!     stock: 1000
//!     sku: GIFT-25
//! ```
//!
//! Seeding is repeatable: categories that already exist are reused and
//! products whose sku is taken are skipped.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use bazaar_core::CategoryId;
use bazaar_storefront::db::CatalogStore;
use bazaar_storefront::models::{NewCategory, NewProduct};
use bazaar_storefront::services::{CatalogError, CatalogService};

use super::connect;

/// Top-level YAML document.
#[derive(Debug, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
    /// Uncategorized products.
    #[serde(default)]
    pub products: Vec<NewProduct>,
}

#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub products: Vec<NewProduct>,
}

/// What a seed run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub products: usize,
    pub skipped: usize,
}

/// Seed the catalog from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a record fails
/// validation, or the database is unreachable.
pub async fn catalog(file_path: &str) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Parse before connecting to the database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: CatalogSeed = serde_yaml::from_str(&content)?;
    info!(
        categories = seed.categories.len(),
        "Parsed catalog file"
    );

    let store = connect().await?;
    Ok(apply(&store, seed).await?)
}

/// Insert everything in `seed` that is not already present.
///
/// # Errors
///
/// Returns the first validation or storage error.
pub async fn apply<S: CatalogStore + ?Sized>(
    store: &S,
    seed: CatalogSeed,
) -> Result<SeedSummary, CatalogError> {
    let catalog = CatalogService::new(store);
    let mut summary = SeedSummary::default();

    for category in seed.categories {
        let id = ensure_category(&catalog, &category, &mut summary).await?;
        for mut product in category.products {
            product.category_id = Some(id);
            insert_product(&catalog, product, &mut summary).await?;
        }
    }
    for product in seed.products {
        insert_product(&catalog, product, &mut summary).await?;
    }

    Ok(summary)
}

async fn ensure_category<S: CatalogStore + ?Sized>(
    catalog: &CatalogService<'_, S>,
    seed: &CategorySeed,
    summary: &mut SeedSummary,
) -> Result<CategoryId, CatalogError> {
    let existing = catalog
        .list_categories()
        .await?
        .into_iter()
        .find(|c| c.name == seed.name.trim());
    if let Some(category) = existing {
        info!(name = %category.name, "Category exists, reusing");
        return Ok(category.id);
    }

    let created = catalog
        .create_category(NewCategory {
            name: seed.name.clone(),
            description: seed.description.clone(),
        })
        .await?;
    summary.categories += 1;
    Ok(created.id)
}

async fn insert_product<S: CatalogStore + ?Sized>(
    catalog: &CatalogService<'_, S>,
    product: NewProduct,
    summary: &mut SeedSummary,
) -> Result<(), CatalogError> {
    let sku = product.sku.clone();
    match catalog.create_product(product).await {
        Ok(_) => summary.products += 1,
        Err(CatalogError::Conflict(_)) => {
            warn!(sku = %sku, "Product exists, skipping");
            summary.skipped += 1;
        }
        Err(e) => return Err(e),
    }
    Ok(())
}
