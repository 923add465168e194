pub mod manager;
pub mod models;
pub mod query_builder;
pub mod repository;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use models::{NewProduct, Patch, Product, UpdateProduct};
pub use repository::ProductRepository;
pub use store::{DeleteOutcome, ProductStore};
