//! Test support: an in-memory [`ProductStore`] and token helpers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::Algorithm;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{generate_token, Claims};
use crate::database::{DatabaseError, DeleteOutcome, NewProduct, Product, ProductStore, UpdateProduct};

pub const TEST_SECRET: &str = "catalog-test-secret";

/// Signed HS256 token carrying `roles`, valid for an hour.
pub fn token_with_roles(secret: &str, roles: &[&str]) -> String {
    let claims = Claims::new("tester", roles.iter().map(|r| r.to_string()).collect(), 1);
    generate_token(&claims, secret, Algorithm::HS256).expect("test token")
}

pub fn admin_token(secret: &str) -> String {
    token_with_roles(secret, &["admin"])
}

/// Store with the same observable semantics as the PostgreSQL repository.
#[derive(Debug, Clone, Default)]
pub struct MemoryProductStore {
    products: Arc<RwLock<Vec<Product>>>,
    fail_counts: Arc<AtomicBool>,
    fail_all: Arc<AtomicBool>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `count` fail while everything else keeps working.
    pub fn fail_counts(&self, fail: bool) {
        self.fail_counts.store(fail, Ordering::SeqCst);
    }

    /// Make every operation fail as if the store were unreachable.
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }

    fn check(&self) -> Result<(), DatabaseError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(DatabaseError::QueryError("store unavailable".to_string()));
        }
        Ok(())
    }

    fn matches(product: &Product, category: &str) -> bool {
        category.is_empty() || product.category == category
    }
}

// Timestamps strictly after `previous`, even when the clock has not moved.
fn tick_after(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn list(&self, limit: i64, offset: i64, category: &str) -> Result<Vec<Product>, DatabaseError> {
        self.check()?;
        let products = self.products.read().await;
        let mut matching: Vec<Product> = products
            .iter()
            .filter(|p| Self::matches(p, category))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Product>, DatabaseError> {
        self.check()?;
        let products = self.products.read().await;
        Ok(products.iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, product: NewProduct) -> Result<Product, DatabaseError> {
        self.check()?;
        let mut products = self.products.write().await;
        let created_at = tick_after(products.iter().map(|p| p.created_at).max());
        let stored = Product {
            id: Uuid::new_v4(),
            name: product.name,
            description: product.description,
            price: product.price,
            primary_image_url: product.primary_image_url,
            images: product.images,
            category: product.category,
            sku: product.sku,
            stock_count: product.stock_count,
            tags: product.tags,
            rating: None,
            review_count: 0,
            created_at,
            updated_at: created_at,
        };
        products.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: Uuid, changes: UpdateProduct) -> Result<Option<Product>, DatabaseError> {
        self.check()?;
        let mut products = self.products.write().await;
        let Some(product) = products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        changes.apply(product);
        product.updated_at = tick_after(Some(product.updated_at));
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<DeleteOutcome, DatabaseError> {
        self.check()?;
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|p| p.id != id);
        if products.len() == before {
            Ok(DeleteOutcome::NotFound)
        } else {
            Ok(DeleteOutcome::Deleted)
        }
    }

    async fn count(&self, category: &str) -> Result<i64, DatabaseError> {
        self.check()?;
        if self.fail_counts.load(Ordering::SeqCst) {
            return Err(DatabaseError::QueryError("count unavailable".to_string()));
        }
        let products = self.products.read().await;
        Ok(products.iter().filter(|p| Self::matches(p, category)).count() as i64)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        self.check()
    }
}
