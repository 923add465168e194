use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{NewProduct, Product, ProductRow, UpdateProduct};
use crate::database::query_builder::{bind_param_query, bind_param_query_as, ProductQuery, SqlResult};
use crate::database::store::{DeleteOutcome, ProductStore};

/// PostgreSQL-backed product store. Every operation is a single statement.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_all(&self, sql: SqlResult) -> Result<Vec<Product>, DatabaseError> {
        let SqlResult { query, params } = sql;
        let mut q = sqlx::query_as::<_, ProductRow>(&query);
        for p in params {
            q = bind_param_query_as(q, p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn fetch_optional(&self, sql: SqlResult) -> Result<Option<Product>, DatabaseError> {
        let SqlResult { query, params } = sql;
        let mut q = sqlx::query_as::<_, ProductRow>(&query);
        for p in params {
            q = bind_param_query_as(q, p);
        }
        let row = q.fetch_optional(&self.pool).await?;
        Ok(row.map(Product::from))
    }
}

#[async_trait]
impl ProductStore for ProductRepository {
    async fn list(&self, limit: i64, offset: i64, category: &str) -> Result<Vec<Product>, DatabaseError> {
        self.fetch_all(ProductQuery::list(limit, offset, category)).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>, DatabaseError> {
        self.fetch_optional(ProductQuery::get(id)).await
    }

    async fn create(&self, product: NewProduct) -> Result<Product, DatabaseError> {
        let id = Uuid::new_v4();
        self.fetch_optional(ProductQuery::insert(id, &product))
            .await?
            .ok_or_else(|| DatabaseError::QueryError(format!("insert of {} returned no row", id)))
    }

    async fn update(&self, id: Uuid, changes: UpdateProduct) -> Result<Option<Product>, DatabaseError> {
        self.fetch_optional(ProductQuery::update(id, &changes)).await
    }

    async fn delete(&self, id: Uuid) -> Result<DeleteOutcome, DatabaseError> {
        let SqlResult { query, params } = ProductQuery::delete(id);
        let mut q = sqlx::query(&query);
        for p in params {
            q = bind_param_query(q, p);
        }
        let result = q.execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            Ok(DeleteOutcome::NotFound)
        } else {
            Ok(DeleteOutcome::Deleted)
        }
    }

    async fn count(&self, category: &str) -> Result<i64, DatabaseError> {
        let SqlResult { query, params } = ProductQuery::count(category);
        let mut q = sqlx::query(&query);
        for p in params {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
