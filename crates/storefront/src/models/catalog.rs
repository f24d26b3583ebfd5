//! Catalog domain types: categories and products.

use serde::{Deserialize, Serialize};

use bazaar_core::{CategoryId, Money, ProductId};

/// Default and maximum page size for product listings.
pub const MAX_PAGE_SIZE: i64 = 100;

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
}

/// Request body for creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: Option<String>,
    /// Current unit price. Orders snapshot this at checkout.
    pub price: Money,
    /// Units available. Never negative.
    pub stock: i32,
    pub sku: String,
    pub images: Vec<String>,
    pub category_id: Option<CategoryId>,
    /// Item reference in the external invoicing system.
    pub invoice_item_ref: Option<String>,
}

/// Request body for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub description: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub stock: i32,
    pub sku: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub category_id: Option<CategoryId>,
    pub invoice_item_ref: Option<String>,
}

/// Partial update for a product. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<i32>,
    pub sku: Option<String>,
    pub images: Option<Vec<String>>,
    pub category_id: Option<CategoryId>,
    pub invoice_item_ref: Option<String>,
}

impl ProductUpdate {
    /// Apply this update to an existing product.
    pub fn apply_to(self, product: &mut Product) {
        if let Some(title) = self.title {
            product.title = title;
        }
        if let Some(description) = self.description {
            product.description = Some(description);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(sku) = self.sku {
            product.sku = sku;
        }
        if let Some(images) = self.images {
            product.images = images;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = Some(category_id);
        }
        if let Some(reference) = self.invoice_item_ref {
            product.invoice_item_ref = Some(reference);
        }
    }
}

/// Product listing query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    /// Case-insensitive substring match on the title.
    pub search: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl ProductFilter {
    /// Number of rows to skip (never negative).
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    /// Page size, clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn page_size(&self) -> i64 {
        self.limit.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    /// Whether a product passes the category and search filters.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if self.category_id.is_some() && product.category_id != self.category_id {
            return false;
        }
        self.search.as_deref().is_none_or(|needle| {
            product
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(title: &str, category: Option<i32>) -> Product {
        Product {
            id: ProductId::new(1),
            title: title.to_string(),
            description: None,
            price: Money::parse("1.00").unwrap(),
            stock: 1,
            sku: "SKU-1".to_string(),
            images: Vec::new(),
            category_id: category.map(CategoryId::new),
            invoice_item_ref: None,
        }
    }

    #[test]
    fn test_page_size_is_clamped() {
        let filter = ProductFilter {
            limit: Some(5000),
            skip: Some(-4),
            ..ProductFilter::default()
        };
        assert_eq!(filter.page_size(), MAX_PAGE_SIZE);
        assert_eq!(filter.offset(), 0);
        assert_eq!(ProductFilter::default().page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_matches_category_and_search() {
        let filter = ProductFilter {
            category_id: Some(CategoryId::new(2)),
            search: Some("MUG".to_string()),
            ..ProductFilter::default()
        };
        assert!(filter.matches(&product("Coffee mug", Some(2))));
        assert!(!filter.matches(&product("Coffee mug", Some(3))));
        assert!(!filter.matches(&product("Teapot", Some(2))));
        assert!(ProductFilter::default().matches(&product("Anything", None)));
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut p = product("Old", None);
        ProductUpdate {
            title: Some("New".to_string()),
            stock: Some(9),
            ..ProductUpdate::default()
        }
        .apply_to(&mut p);
        assert_eq!(p.title, "New");
        assert_eq!(p.stock, 9);
        assert_eq!(p.sku, "SKU-1");
    }
}
