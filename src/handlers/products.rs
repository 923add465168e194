use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::{NewProduct, Product, UpdateProduct};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{Page, ProductListResponse};

/// Raw list parameters. Values that do not parse are treated as absent.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub category: Option<String>,
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("invalid product id"))
}

/// GET /products
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<ProductListResponse> {
    let page = Page::from_query(query.limit.as_deref(), query.offset.as_deref());
    let category = query.category.unwrap_or_default();
    let products = state.catalog.list(page, &category).await?;
    Ok(ApiResponse::success(products))
}

/// GET /products/:id
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Product> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(state.catalog.get(id).await?))
}

/// POST /products (admin)
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<Product> {
    let Json(product) = body?;
    Ok(ApiResponse::created(state.catalog.create(product).await?))
}

/// PUT /products/:id (admin). Absent fields are left untouched.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateProduct>, JsonRejection>,
) -> ApiResult<Product> {
    let id = parse_id(&id)?;
    let Json(changes) = body?;
    Ok(ApiResponse::success(state.catalog.update(id, changes).await?))
}

/// DELETE /products/:id (admin)
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let id = parse_id(&id)?;
    state.catalog.delete(id).await?;
    Ok(ApiResponse::no_content())
}
