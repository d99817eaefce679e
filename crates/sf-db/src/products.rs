//! Product repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sf_core::traits::Id;
use sf_models::{NewProduct, Product, UpdateProduct};
use sf_queries::{QueryModel, QueryResponse};
use sqlx::{FromRow, PgPool};

use crate::query_executor::{ColumnKind, ColumnSpec, QueryExecutor, Resource};
use crate::repository::{Repository, RepositoryError, RepositoryResult};

const PRODUCT_COLUMNS: &str =
    "id, name, sku, description, price, stock, active, created_at, updated_at";

const SKU_TAKEN: &str = "SKU has already been taken";

#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            sku: row.sku,
            description: row.description,
            price: row.price,
            stock: row.stock,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Resource for ProductRow {
    const TABLE: &'static str = "products";
    const SELECT: &'static str = PRODUCT_COLUMNS;
    const COLUMNS: &'static [ColumnSpec] = &[
        ColumnSpec::new("id", "id", ColumnKind::Integer),
        ColumnSpec::new("name", "name", ColumnKind::Text),
        ColumnSpec::new("sku", "sku", ColumnKind::Text),
        ColumnSpec::new("description", "description", ColumnKind::Text),
        ColumnSpec::new("price", "price", ColumnKind::Numeric),
        ColumnSpec::new("stock", "stock", ColumnKind::Integer),
        ColumnSpec::new("active", "active", ColumnKind::Boolean),
        ColumnSpec::new("createdAt", "created_at", ColumnKind::Timestamp),
        ColumnSpec::new("updatedAt", "updated_at", ColumnKind::Timestamp),
    ];
}

pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, model: &QueryModel, default_limit: u64) -> RepositoryResult<QueryResponse<ProductRow>> {
        QueryExecutor::new(&self.pool, default_limit)
            .execute::<ProductRow>(model)
            .await
    }
}

#[async_trait]
impl Repository<ProductRow, NewProduct, UpdateProduct> for ProductRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<ProductRow>> {
        QueryExecutor::new(&self.pool, 1).find_one::<ProductRow>(id).await
    }

    async fn create(&self, dto: NewProduct) -> RepositoryResult<ProductRow> {
        sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (
                name, sku, description, price, stock, active, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, NOW(), NOW()
            )
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&dto.name)
        .bind(&dto.sku)
        .bind(&dto.description)
        .bind(dto.price)
        .bind(dto.stock)
        .bind(dto.active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique_violation(e, SKU_TAKEN))
    }

    async fn update(&self, id: Id, dto: UpdateProduct) -> RepositoryResult<ProductRow> {
        sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products SET
                name = COALESCE($1, name),
                sku = COALESCE($2, sku),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                stock = COALESCE($5, stock),
                active = COALESCE($6, active),
                updated_at = NOW()
            WHERE id = $7
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(&dto.name)
        .bind(&dto.sku)
        .bind(&dto.description)
        .bind(dto.price)
        .bind(dto.stock)
        .bind(dto.active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::on_unique_violation(e, SKU_TAKEN))?
        .ok_or_else(|| RepositoryError::NotFound(format!("Product with id {} not found", id)))
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Product with id {} not found", id)));
        }

        Ok(())
    }

    async fn exists(&self, id: Id) -> RepositoryResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_filters_numerically() {
        assert_eq!(ProductRow::column("price").map(|c| c.kind), Some(ColumnKind::Numeric));
        assert_eq!(ProductRow::column("stock").map(|c| c.kind), Some(ColumnKind::Integer));
        assert_eq!(ProductRow::DEFAULT_SORT, "id ASC");
    }

    #[test]
    fn test_row_to_model() {
        let product: Product = ProductRow {
            id: 1,
            name: "Oak desk".to_string(),
            sku: "DESK-OAK-1".to_string(),
            description: None,
            price: 249.5,
            stock: 3,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
        .into();

        assert!(product.in_stock());
        assert_eq!(product.sku, "DESK-OAK-1");
    }
}
