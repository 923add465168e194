use async_trait::async_trait;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{NewProduct, Product, UpdateProduct};

/// Result of a delete. `NotFound` is an outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Persistence contract for products.
///
/// Lookups that may miss return `Ok(None)`; `Err` is reserved for store failures.
/// An empty `category` means "no filter" for both `list` and `count`.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Newest-created first.
    async fn list(&self, limit: i64, offset: i64, category: &str) -> Result<Vec<Product>, DatabaseError>;

    async fn get(&self, id: Uuid) -> Result<Option<Product>, DatabaseError>;

    /// Returns the row as stored, including server-assigned defaults.
    async fn create(&self, product: NewProduct) -> Result<Product, DatabaseError>;

    async fn update(&self, id: Uuid, changes: UpdateProduct) -> Result<Option<Product>, DatabaseError>;

    async fn delete(&self, id: Uuid) -> Result<DeleteOutcome, DatabaseError>;

    async fn count(&self, category: &str) -> Result<i64, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}
