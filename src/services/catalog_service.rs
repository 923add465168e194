use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::database::{DatabaseError, DeleteOutcome, NewProduct, Patch, Product, ProductStore, UpdateProduct};
use crate::error::ApiError;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Effective pagination after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Limits outside (0, MAX_LIMIT] fall back to DEFAULT_LIMIT; negative offsets become 0.
    pub fn clamped(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(l) if l > 0 && l <= MAX_LIMIT => l,
            _ => DEFAULT_LIMIT,
        };
        let offset = offset.filter(|o| *o >= 0).unwrap_or(0);
        Self { limit, offset }
    }

    /// Lenient parse of raw query values; anything unparseable counts as absent.
    pub fn from_query(limit: Option<&str>, offset: Option<&str>) -> Self {
        let parse = |v: Option<&str>| v.and_then(|s| s.trim().parse::<i64>().ok());
        Self::clamped(parse(limit), parse(offset))
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::clamped(None, None)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Maps HTTP-level requests onto the product store.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ProductStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ProductStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, page: Page, category: &str) -> Result<ProductListResponse, ApiError> {
        let products = self.store.list(page.limit, page.offset, category).await?;

        // A failed count degrades pagination metadata instead of failing the listing.
        let total = match self.store.count(category).await {
            Ok(total) => total,
            Err(e) => {
                error!("CountProducts: {}", e);
                products.len() as i64
            }
        };

        Ok(ProductListResponse {
            products,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Product, ApiError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ApiError::not_found("product not found"))
    }

    pub async fn create(&self, product: NewProduct) -> Result<Product, ApiError> {
        validate_new(&product)?;
        let created = self.store.create(product).await?;
        info!(product_id = %created.id, sku = %created.sku, "product created");
        Ok(created)
    }

    /// An update with no fields still refreshes `updated_at`.
    pub async fn update(&self, id: Uuid, changes: UpdateProduct) -> Result<Product, ApiError> {
        validate_update(&changes)?;
        let updated = self
            .store
            .update(id, changes)
            .await?
            .ok_or_else(|| ApiError::not_found("product not found"))?;
        info!(product_id = %updated.id, "product updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        match self.store.delete(id).await? {
            DeleteOutcome::Deleted => {
                info!(product_id = %id, "product deleted");
                Ok(())
            }
            DeleteOutcome::NotFound => Err(ApiError::not_found("product not found")),
        }
    }

    pub async fn ready(&self) -> Result<(), DatabaseError> {
        self.store.ping().await
    }
}

fn validate_new(product: &NewProduct) -> Result<(), ApiError> {
    let mut field_errors = HashMap::new();
    if product.name.trim().is_empty() {
        field_errors.insert("name".to_string(), "is required".to_string());
    }
    if !(product.price.is_finite() && product.price > 0.0) {
        field_errors.insert("price".to_string(), "must be greater than zero".to_string());
    }
    if product.sku.trim().is_empty() {
        field_errors.insert("sku".to_string(), "is required".to_string());
    }
    finish_validation("name, price, and sku are required", field_errors)
}

fn validate_update(changes: &UpdateProduct) -> Result<(), ApiError> {
    let mut field_errors = HashMap::new();
    if let Patch::Set(name) = &changes.name {
        if name.trim().is_empty() {
            field_errors.insert("name".to_string(), "must not be empty".to_string());
        }
    }
    if let Patch::Set(price) = changes.price {
        if !(price.is_finite() && price > 0.0) {
            field_errors.insert("price".to_string(), "must be greater than zero".to_string());
        }
    }
    if let Patch::Set(sku) = &changes.sku {
        if sku.trim().is_empty() {
            field_errors.insert("sku".to_string(), "must not be empty".to_string());
        }
    }
    finish_validation("invalid product fields", field_errors)
}

fn finish_validation(message: &str, field_errors: HashMap<String, String>) -> Result<(), ApiError> {
    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation_error(message, Some(field_errors)))
    }
}
