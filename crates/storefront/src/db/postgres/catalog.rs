use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use bazaar_core::{CategoryId, ProductId};

use super::{PgStore, ProductRow, product_columns, unique_violation};
use crate::db::{CatalogStore, RepositoryError};
use crate::models::{Category, NewCategory, NewProduct, Product, ProductFilter, ProductUpdate};

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    description: Option<String>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
        }
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut query: QueryBuilder<'_, Postgres> = QueryBuilder::new(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products p WHERE TRUE"
        ));

        if let Some(category_id) = filter.category_id {
            query.push(" AND p.category_id = ").push_bind(category_id);
        }
        if let Some(search) = filter.search.as_deref() {
            query
                .push(" AND p.title ILIKE ")
                .push_bind(like_pattern(search));
        }
        query
            .push(" ORDER BY p.id LIMIT ")
            .push_bind(filter.page_size())
            .push(" OFFSET ")
            .push_bind(filter.offset());

        let rows: Vec<ProductRow> = query.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn products_in_category(
        &self,
        category_id: CategoryId,
        exclude: ProductId,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products p WHERE p.category_id = $1 AND p.id <> $2 ORDER BY p.id LIMIT $3"
        ))
        .bind(category_id)
        .bind(exclude)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(concat!(
            "INSERT INTO products AS p ",
            "(title, description, price, stock, sku, images, category_id, invoice_item_ref) ",
            "VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING ",
            product_columns!()
        ))
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(&product.sku)
        .bind(&product.images)
        .bind(product.category_id)
        .bind(&product.invoice_item_ref)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_violation("sku"))?;

        Ok(row.into())
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<ProductRow> = sqlx::query_as(concat!(
            "SELECT ",
            product_columns!(),
            " FROM products p WHERE p.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut product: Product = current.ok_or(RepositoryError::NotFound)?.into();
        update.apply_to(&mut product);

        let row: ProductRow = sqlx::query_as(concat!(
            "UPDATE products AS p SET title = $2, description = $3, price = $4, stock = $5, ",
            "sku = $6, images = $7, category_id = $8, invoice_item_ref = $9 ",
            "WHERE p.id = $1 RETURNING ",
            product_columns!()
        ))
        .bind(id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(&product.sku)
        .bind(&product.images)
        .bind(product.category_id)
        .bind(&product.invoice_item_ref)
        .fetch_one(&mut *tx)
        .await
        .map_err(unique_violation("sku"))?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name, description FROM categories ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, name, description FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Category::from))
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category, RepositoryError> {
        let row: CategoryRow = sqlx::query_as(
            r"
            INSERT INTO categories (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description
            ",
        )
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await
        .map_err(unique_violation("category name"))?;

        Ok(row.into())
    }
}
