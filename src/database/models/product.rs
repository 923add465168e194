use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::query_builder::SqlParam;

/// A catalog product as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub primary_image_url: String,
    pub images: Vec<String>,
    pub category: String,
    pub sku: String,
    pub stock_count: i32,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub review_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw row shape; array and rating columns may be NULL in storage.
#[derive(Debug, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub primary_image_url: String,
    pub images: Option<Vec<String>>,
    pub category: String,
    pub sku: String,
    pub stock_count: i32,
    pub tags: Option<Vec<String>>,
    pub rating: Option<f64>,
    pub review_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            primary_image_url: row.primary_image_url,
            images: row.images.unwrap_or_default(),
            category: row.category,
            sku: row.sku,
            stock_count: row.stock_count,
            tags: row.tags.unwrap_or_default(),
            rating: row.rating.filter(|r| r.is_finite()),
            review_count: row.review_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Payload for creating a product. Identity, rating and timestamps are server-assigned.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub primary_image_url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub stock_count: i32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
}

/// One field of a partial update: left alone, or set to a value.
///
/// For list fields `Set(vec![])` is "clear", which is distinct from `Keep`.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    Keep,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> Patch<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Patch::Set(_))
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Keep => None,
        }
    }

    pub fn apply_to(self, target: &mut T) {
        if let Patch::Set(value) = self {
            *target = value;
        }
    }
}

// A present value means Set. Absent keys (`#[serde(default)]`) and explicit nulls both Keep.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Keep,
        })
    }
}

/// Partial update. Only `Set` fields are written; `updated_at` is always refreshed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpdateProduct {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub price: Patch<f64>,
    #[serde(default)]
    pub primary_image_url: Patch<String>,
    #[serde(default)]
    pub images: Patch<Vec<String>>,
    #[serde(default)]
    pub category: Patch<String>,
    #[serde(default)]
    pub sku: Patch<String>,
    #[serde(default)]
    pub stock_count: Patch<i32>,
    #[serde(default)]
    pub tags: Patch<Vec<String>>,
}

impl UpdateProduct {
    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }

    /// Column/value pairs for every `Set` field, always in table column order.
    pub fn assignments(&self) -> Vec<(&'static str, SqlParam)> {
        let mut out = Vec::new();
        if let Some(v) = self.name.as_set() {
            out.push(("name", SqlParam::Text(v.clone())));
        }
        if let Some(v) = self.description.as_set() {
            out.push(("description", SqlParam::Text(v.clone())));
        }
        if let Some(v) = self.price.as_set() {
            out.push(("price", SqlParam::Float(*v)));
        }
        if let Some(v) = self.primary_image_url.as_set() {
            out.push(("primary_image_url", SqlParam::Text(v.clone())));
        }
        if let Some(v) = self.images.as_set() {
            out.push(("images", SqlParam::TextArray(v.clone())));
        }
        if let Some(v) = self.category.as_set() {
            out.push(("category", SqlParam::Text(v.clone())));
        }
        if let Some(v) = self.sku.as_set() {
            out.push(("sku", SqlParam::Text(v.clone())));
        }
        if let Some(v) = self.stock_count.as_set() {
            out.push(("stock_count", SqlParam::Int(*v)));
        }
        if let Some(v) = self.tags.as_set() {
            out.push(("tags", SqlParam::TextArray(v.clone())));
        }
        out
    }

    /// Apply the set fields to an in-memory product. Does not touch timestamps.
    pub fn apply(self, product: &mut Product) {
        self.name.apply_to(&mut product.name);
        self.description.apply_to(&mut product.description);
        self.price.apply_to(&mut product.price);
        self.primary_image_url.apply_to(&mut product.primary_image_url);
        self.images.apply_to(&mut product.images);
        self.category.apply_to(&mut product.category);
        self.sku.apply_to(&mut product.sku);
        self.stock_count.apply_to(&mut product.stock_count);
        self.tags.apply_to(&mut product.tags);
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ProductRow {
        let now = Utc::now();
        ProductRow {
            id: Uuid::new_v4(),
            name: "Lamp".into(),
            description: String::new(),
            price: 12.5,
            primary_image_url: String::new(),
            images: None,
            category: "home".into(),
            sku: "LMP-1".into(),
            stock_count: 0,
            tags: Some(vec!["b".into(), "a".into()]),
            rating: None,
            review_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn null_columns_decode_as_empty_or_absent() {
        let product = Product::from(row());
        assert!(product.images.is_empty());
        assert_eq!(product.tags, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(product.rating, None);
    }

    #[test]
    fn non_finite_rating_decodes_as_absent() {
        let mut r = row();
        r.rating = Some(f64::NAN);
        assert_eq!(Product::from(r).rating, None);
    }

    #[test]
    fn absent_rating_is_omitted_from_json() {
        let json = serde_json::to_value(Product::from(row())).unwrap();
        assert!(json.get("rating").is_none());
        assert_eq!(json["images"], serde_json::json!([]));
    }

    #[test]
    fn patch_distinguishes_missing_empty_and_null() {
        let missing: UpdateProduct = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.images, Patch::Keep);
        assert!(missing.is_empty());

        let empty: UpdateProduct = serde_json::from_str(r#"{"images": []}"#).unwrap();
        assert_eq!(empty.images, Patch::Set(vec![]));

        let null: UpdateProduct = serde_json::from_str(r#"{"tags": null}"#).unwrap();
        assert_eq!(null.tags, Patch::Keep);
        assert_eq!(null.images, Patch::Keep);
        assert!(null.is_empty());
    }

    #[test]
    fn null_in_update_leaves_every_field_alone() {
        let update: UpdateProduct = serde_json::from_str(
            r#"{"name": null, "description": null, "price": null, "stock_count": null, "images": null}"#,
        )
        .unwrap();
        assert_eq!(update, UpdateProduct::default());
        assert!(update.assignments().is_empty());
    }

    #[test]
    fn assignments_follow_column_order() {
        let update: UpdateProduct =
            serde_json::from_str(r#"{"tags": ["x"], "name": "Desk", "stock_count": 3}"#).unwrap();
        let columns: Vec<&str> = update.assignments().into_iter().map(|(c, _)| c).collect();
        assert_eq!(columns, vec!["name", "stock_count", "tags"]);
    }

    #[test]
    fn apply_touches_only_set_fields() {
        let mut product = Product::from(row());
        let before = product.clone();
        let update = UpdateProduct {
            price: Patch::Set(20.0),
            images: Patch::Set(vec!["a.png".into()]),
            ..Default::default()
        };
        update.apply(&mut product);
        assert_eq!(product.price, 20.0);
        assert_eq!(product.images, vec!["a.png".to_string()]);
        assert_eq!(product.name, before.name);
        assert_eq!(product.tags, before.tags);
    }

    #[test]
    fn create_payload_defaults_optional_fields() {
        let new: NewProduct =
            serde_json::from_str(r#"{"name":"Desk","price":99.0,"sku":"D-1","tags":null}"#).unwrap();
        assert!(new.tags.is_empty());
        assert!(new.images.is_empty());
        assert_eq!(new.stock_count, 0);
    }
}
