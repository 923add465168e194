//! SQL construction for the products table.
//!
//! Only the shape of a statement varies with the request. Every caller-supplied value is
//! pushed onto [`SqlResult::params`] and referenced by ordinal, where the ordinal is always
//! the parameter count at the moment the value is pushed.

use std::fmt::Write as _;

use sqlx::{
    self,
    postgres::{PgArguments, PgRow},
    FromRow, Postgres,
};
use uuid::Uuid;

use crate::database::models::{NewProduct, UpdateProduct};

pub const PRODUCTS_TABLE: &str = "catalog.products";

/// Select list shared by reads and RETURNING clauses.
const PRODUCT_COLUMNS: &str = "id, name, description, price, primary_image_url, \
     COALESCE(images, '{}'::text[]) AS images, category, sku, stock_count, \
     COALESCE(tags, '{}'::text[]) AS tags, rating, review_count, created_at, updated_at";

/// A bound value. Variants map one-to-one onto the column types of the table.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Uuid(Uuid),
    Text(String),
    Int(i32),
    BigInt(i64),
    Float(f64),
    TextArray(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

impl SqlResult {
    fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: vec![],
        }
    }

    /// Push a value and return its placeholder.
    fn param(&mut self, value: SqlParam) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    /// Appends `WHERE category = $n` for a non-empty filter. List and Count share this.
    fn push_category_filter(&mut self, category: &str) {
        if category.is_empty() {
            return;
        }
        let p = self.param(SqlParam::Text(category.to_string()));
        let _ = write!(self.query, " WHERE category = {p}");
    }
}

pub struct ProductQuery;

impl ProductQuery {
    pub fn list(limit: i64, offset: i64, category: &str) -> SqlResult {
        let mut sql = SqlResult::new(format!("SELECT {PRODUCT_COLUMNS} FROM {PRODUCTS_TABLE}"));
        sql.push_category_filter(category);
        sql.query.push_str(" ORDER BY created_at DESC, id DESC");
        let limit = sql.param(SqlParam::BigInt(limit));
        let offset = sql.param(SqlParam::BigInt(offset));
        let _ = write!(sql.query, " LIMIT {limit} OFFSET {offset}");
        sql
    }

    pub fn count(category: &str) -> SqlResult {
        let mut sql = SqlResult::new(format!("SELECT COUNT(*) AS count FROM {PRODUCTS_TABLE}"));
        sql.push_category_filter(category);
        sql
    }

    pub fn get(id: Uuid) -> SqlResult {
        let mut sql = SqlResult::new(format!("SELECT {PRODUCT_COLUMNS} FROM {PRODUCTS_TABLE}"));
        let p = sql.param(SqlParam::Uuid(id));
        let _ = write!(sql.query, " WHERE id = {p}");
        sql
    }

    pub fn insert(id: Uuid, product: &NewProduct) -> SqlResult {
        let values = [
            ("id", SqlParam::Uuid(id)),
            ("name", SqlParam::Text(product.name.clone())),
            ("description", SqlParam::Text(product.description.clone())),
            ("price", SqlParam::Float(product.price)),
            ("primary_image_url", SqlParam::Text(product.primary_image_url.clone())),
            ("images", SqlParam::TextArray(product.images.clone())),
            ("category", SqlParam::Text(product.category.clone())),
            ("sku", SqlParam::Text(product.sku.clone())),
            ("stock_count", SqlParam::Int(product.stock_count)),
            ("tags", SqlParam::TextArray(product.tags.clone())),
        ];

        let mut sql = SqlResult::new(String::new());
        let mut columns = Vec::with_capacity(values.len());
        let mut placeholders = Vec::with_capacity(values.len());
        for (column, value) in values {
            columns.push(column);
            placeholders.push(sql.param(value));
        }

        sql.query = format!(
            "INSERT INTO {PRODUCTS_TABLE} ({}) VALUES ({}) RETURNING {PRODUCT_COLUMNS}",
            columns.join(", "),
            placeholders.join(", ")
        );
        sql
    }

    /// `SET` always refreshes `updated_at`; each set field adds one clause; `id` binds last.
    pub fn update(id: Uuid, changes: &UpdateProduct) -> SqlResult {
        // Strictly after the previous value even if the clock has not advanced.
        let mut sql = SqlResult::new(format!(
            "UPDATE {PRODUCTS_TABLE} SET updated_at = GREATEST(now(), updated_at + interval '1 microsecond')"
        ));
        for (column, value) in changes.assignments() {
            let p = sql.param(value);
            let _ = write!(sql.query, ", {column} = {p}");
        }
        let id = sql.param(SqlParam::Uuid(id));
        let _ = write!(sql.query, " WHERE id = {id} RETURNING {PRODUCT_COLUMNS}");
        sql
    }

    pub fn delete(id: Uuid) -> SqlResult {
        let mut sql = SqlResult::new(format!("DELETE FROM {PRODUCTS_TABLE}"));
        let p = sql.param(SqlParam::Uuid(id));
        let _ = write!(sql.query, " WHERE id = {p}");
        sql
    }
}

pub(crate) fn bind_param_query(
    q: sqlx::query::Query<'_, Postgres, PgArguments>,
    v: SqlParam,
) -> sqlx::query::Query<'_, Postgres, PgArguments> {
    match v {
        SqlParam::Uuid(u) => q.bind(u),
        SqlParam::Text(s) => q.bind(s),
        SqlParam::Int(i) => q.bind(i),
        SqlParam::BigInt(i) => q.bind(i),
        SqlParam::Float(f) => q.bind(f),
        SqlParam::TextArray(a) => q.bind(a),
    }
}

pub(crate) fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, Postgres, O, PgArguments>,
    v: SqlParam,
) -> sqlx::query::QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        SqlParam::Uuid(u) => q.bind(u),
        SqlParam::Text(s) => q.bind(s),
        SqlParam::Int(i) => q.bind(i),
        SqlParam::BigInt(i) => q.bind(i),
        SqlParam::Float(f) => q.bind(f),
        SqlParam::TextArray(a) => q.bind(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Patch;

    fn placeholders(sql: &SqlResult) -> usize {
        (1..=sql.params.len() + 1)
            .filter(|n| sql.query.contains(&format!("${n}")))
            .count()
    }

    #[test]
    fn list_without_filter_binds_limit_and_offset() {
        let sql = ProductQuery::list(20, 40, "");
        assert!(!sql.query.contains("WHERE"));
        assert!(sql.query.contains("ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"));
        assert_eq!(sql.params, vec![SqlParam::BigInt(20), SqlParam::BigInt(40)]);
    }

    #[test]
    fn list_with_category_shifts_pagination_ordinals() {
        let sql = ProductQuery::list(10, 0, "shoes");
        assert!(sql.query.contains("WHERE category = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"));
        assert_eq!(sql.params[0], SqlParam::Text("shoes".into()));
        assert_eq!(placeholders(&sql), 3);
    }

    #[test]
    fn user_values_never_reach_the_query_text() {
        let hostile = "x' OR '1'='1";
        let list = ProductQuery::list(5, 0, hostile);
        let count = ProductQuery::count(hostile);
        assert!(!list.query.contains(hostile));
        assert!(!count.query.contains(hostile));
        assert_eq!(count.params, vec![SqlParam::Text(hostile.into())]);
    }

    #[test]
    fn count_uses_the_same_predicate_as_list() {
        let list = ProductQuery::list(5, 0, "toys");
        let count = ProductQuery::count("toys");
        assert!(count.query.ends_with("WHERE category = $1"));
        assert!(list.query.contains("WHERE category = $1"));
        assert_eq!(ProductQuery::count("").query, "SELECT COUNT(*) AS count FROM catalog.products");
    }

    #[test]
    fn reads_coalesce_array_columns() {
        let sql = ProductQuery::get(Uuid::nil());
        assert!(sql.query.contains("COALESCE(images, '{}'::text[]) AS images"));
        assert!(sql.query.contains("COALESCE(tags, '{}'::text[]) AS tags"));
        assert!(sql.query.ends_with("WHERE id = $1"));
    }

    #[test]
    fn update_binds_id_after_all_present_fields() {
        let id = Uuid::new_v4();
        let changes = UpdateProduct {
            name: Patch::Set("Desk".into()),
            price: Patch::Set(10.0),
            tags: Patch::Set(vec![]),
            ..Default::default()
        };
        let sql = ProductQuery::update(id, &changes);
        assert!(sql.query.contains(", name = $1, price = $2, tags = $3 WHERE id = $4 RETURNING"));
        assert_eq!(sql.params.len(), 4);
        assert_eq!(sql.params[2], SqlParam::TextArray(vec![]));
        assert_eq!(sql.params[3], SqlParam::Uuid(id));
    }

    #[test]
    fn empty_update_only_refreshes_timestamp() {
        let id = Uuid::new_v4();
        let sql = ProductQuery::update(id, &UpdateProduct::default());
        assert!(sql.query.starts_with("UPDATE catalog.products SET updated_at = "));
        assert!(sql.query.contains(") WHERE id = $1 RETURNING"));
        assert_eq!(sql.params, vec![SqlParam::Uuid(id)]);
    }

    #[test]
    fn update_with_every_field_uses_ten_ordinals() {
        let changes = UpdateProduct {
            name: Patch::Set("n".into()),
            description: Patch::Set("d".into()),
            price: Patch::Set(1.0),
            primary_image_url: Patch::Set("p".into()),
            images: Patch::Set(vec!["i".into()]),
            category: Patch::Set("c".into()),
            sku: Patch::Set("s".into()),
            stock_count: Patch::Set(-2),
            tags: Patch::Set(vec!["t".into()]),
        };
        let sql = ProductQuery::update(Uuid::nil(), &changes);
        assert!(sql.query.contains("WHERE id = $10 RETURNING"));
        assert_eq!(placeholders(&sql), 10);
    }

    #[test]
    fn insert_binds_every_column_in_order() {
        let new = NewProduct {
            name: "Desk".into(),
            price: 99.0,
            sku: "D-1".into(),
            images: vec!["a.png".into(), "b.png".into()],
            ..Default::default()
        };
        let id = Uuid::new_v4();
        let sql = ProductQuery::insert(id, &new);
        assert!(sql.query.starts_with(
            "INSERT INTO catalog.products (id, name, description, price, primary_image_url, images, category, sku, stock_count, tags) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING"
        ));
        assert_eq!(sql.params[0], SqlParam::Uuid(id));
        assert_eq!(sql.params[5], SqlParam::TextArray(vec!["a.png".into(), "b.png".into()]));
    }

    #[test]
    fn delete_targets_a_single_id() {
        let sql = ProductQuery::delete(Uuid::nil());
        assert_eq!(sql.query, "DELETE FROM catalog.products WHERE id = $1");
    }
}
