pub mod product;

pub use product::{NewProduct, Patch, Product, ProductRow, UpdateProduct};
