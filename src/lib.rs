pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod flags;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod telemetry;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
