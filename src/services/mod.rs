pub mod catalog_service;

pub use catalog_service::{CatalogService, Page, ProductListResponse, DEFAULT_LIMIT, MAX_LIMIT};
