//! Catalog browsing and management.

use thiserror::Error;
use tracing::instrument;

use bazaar_core::{CategoryId, ProductId};

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{Category, NewCategory, NewProduct, Product, ProductFilter, ProductUpdate};

/// Maximum number of related products returned.
pub const RELATED_LIMIT: i64 = 4;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Category not found")]
    CategoryNotFound,

    /// Request data failed validation.
    #[error("{0}")]
    Invalid(String),

    /// Unique sku or category name already taken.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::NotFound => Self::ProductNotFound,
            other => Self::Repository(other),
        }
    }
}

/// Catalog service.
pub struct CatalogService<'a, S: CatalogStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: CatalogStore + ?Sized> CatalogService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// List products matching `filter`, in id order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, CatalogError> {
        Ok(self.store.list_products(filter).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the product does not exist.
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.store
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound)
    }

    /// Up to [`RELATED_LIMIT`] other products from the same category.
    ///
    /// Uncategorized products have no related products: "no category" is
    /// not treated as a shared category, so they are never grouped together.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the product does not exist.
    pub async fn related_products(&self, id: ProductId) -> Result<Vec<Product>, CatalogError> {
        let product = self.get_product(id).await?;
        let Some(category_id) = product.category_id else {
            return Ok(Vec::new());
        };

        Ok(self
            .store
            .products_in_category(category_id, id, RELATED_LIMIT)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for blank fields, negative stock or an
    /// unknown category, and `CatalogError::Conflict` for a duplicate sku.
    #[instrument(skip(self, product), fields(sku = %product.sku))]
    pub async fn create_product(&self, mut product: NewProduct) -> Result<Product, CatalogError> {
        product.title = required("title", &product.title)?;
        product.sku = required("sku", &product.sku)?;
        if product.stock < 0 {
            return Err(CatalogError::Invalid("stock cannot be negative".to_string()));
        }
        self.ensure_category(product.category_id).await?;

        let created = self.store.create_product(product).await?;
        tracing::info!(product_id = %created.id, "Product created");
        Ok(created)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ProductNotFound` if the product does not exist,
    /// plus the validation errors of [`CatalogService::create_product`].
    #[instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        id: ProductId,
        mut update: ProductUpdate,
    ) -> Result<Product, CatalogError> {
        if let Some(title) = update.title.as_deref() {
            update.title = Some(required("title", title)?);
        }
        if let Some(sku) = update.sku.as_deref() {
            update.sku = Some(required("sku", sku)?);
        }
        if update.stock.is_some_and(|stock| stock < 0) {
            return Err(CatalogError::Invalid("stock cannot be negative".to_string()));
        }
        self.ensure_category(update.category_id).await?;

        Ok(self.store.update_product(id, update).await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.store.list_categories().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::CategoryNotFound` if the category does not exist.
    pub async fn get_category(&self, id: CategoryId) -> Result<Category, CatalogError> {
        self.store
            .get_category(id)
            .await?
            .ok_or(CatalogError::CategoryNotFound)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for a blank name and
    /// `CatalogError::Conflict` if the name is taken.
    pub async fn create_category(&self, mut category: NewCategory) -> Result<Category, CatalogError> {
        category.name = required("name", &category.name)?;
        Ok(self.store.create_category(category).await?)
    }

    async fn ensure_category(&self, id: Option<CategoryId>) -> Result<(), CatalogError> {
        let Some(id) = id else {
            return Ok(());
        };
        match self.store.get_category(id).await? {
            Some(_) => Ok(()),
            None => Err(CatalogError::Invalid(format!("category {id} does not exist"))),
        }
    }
}

fn required(field: &str, value: &str) -> Result<String, CatalogError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CatalogError::Invalid(format!("{field} cannot be empty")));
    }
    Ok(value.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::Money;

    use super::*;
    use crate::db::MemoryStore;

    fn new_product(sku: &str, category_id: Option<CategoryId>) -> NewProduct {
        NewProduct {
            title: format!("Product {sku}"),
            description: None,
            price: Money::parse("2.50").unwrap(),
            stock: 3,
            sku: sku.to_string(),
            images: Vec::new(),
            category_id,
            invoice_item_ref: None,
        }
    }

    #[tokio::test]
    async fn test_related_products_same_category_excluding_self() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        let mugs = catalog
            .create_category(NewCategory {
                name: "Mugs".to_string(),
                description: None,
            })
            .await
            .unwrap();

        let first = catalog
            .create_product(new_product("M-0", Some(mugs.id)))
            .await
            .unwrap();
        for i in 1..=5 {
            catalog
                .create_product(new_product(&format!("M-{i}"), Some(mugs.id)))
                .await
                .unwrap();
        }
        catalog.create_product(new_product("OTHER", None)).await.unwrap();

        let related = catalog.related_products(first.id).await.unwrap();
        assert_eq!(related.len(), 4);
        assert!(related.iter().all(|p| p.id != first.id));
        assert!(related.iter().all(|p| p.category_id == Some(mugs.id)));
    }

    #[tokio::test]
    async fn test_uncategorized_product_has_no_related() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        let lone = catalog.create_product(new_product("A", None)).await.unwrap();
        catalog.create_product(new_product("B", None)).await.unwrap();

        assert!(catalog.related_products(lone.id).await.unwrap().is_empty());
        assert!(matches!(
            catalog.related_products(ProductId::new(999)).await,
            Err(CatalogError::ProductNotFound)
        ));
    }

    #[tokio::test]
    async fn test_create_product_validation() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);

        let mut negative = new_product("NEG", None);
        negative.stock = -1;
        assert!(matches!(
            catalog.create_product(negative).await,
            Err(CatalogError::Invalid(_))
        ));
        assert!(matches!(
            catalog
                .create_product(new_product("X", Some(CategoryId::new(42))))
                .await,
            Err(CatalogError::Invalid(_))
        ));

        catalog.create_product(new_product("DUP", None)).await.unwrap();
        assert!(matches!(
            catalog.create_product(new_product("DUP", None)).await,
            Err(CatalogError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let store = MemoryStore::new();
        let catalog = CatalogService::new(&store);
        assert!(matches!(
            catalog
                .update_product(ProductId::new(7), ProductUpdate::default())
                .await,
            Err(CatalogError::ProductNotFound)
        ));
    }
}
