#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use catalog_api::{
    app::{self, AppState, HttpOptions},
    auth::TokenVerifier,
    flags::{self, FlagPublisher, FlagSnapshot, LogLevel},
    middleware::RoleGate,
    services::CatalogService,
    testing::{MemoryProductStore, TEST_SECRET},
};
use jsonwebtoken::Algorithm;
use reqwest::StatusCode;
use serde_json::{json, Value};

/// An in-process server on its own port, backed by an in-memory store.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: MemoryProductStore,
    pub flags: FlagPublisher,
    pub client: reqwest::Client,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let store = MemoryProductStore::new();
        let (publisher, handle) = flags::channel(FlagSnapshot::new(LogLevel::Info));
        let state = AppState {
            catalog: CatalogService::new(Arc::new(store.clone())),
            flags: handle,
        };
        let verifier = TokenVerifier::new(TEST_SECRET, Algorithm::HS256)?;
        let router = app::router(state, RoleGate::new(verifier, "admin"), HttpOptions::default());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind {}", port))?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self {
            port,
            base_url,
            store,
            flags: publisher,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn set_offline(&self, offline: bool) {
        let mut next = FlagSnapshot::clone(&self.flags.current());
        next.offline = offline;
        self.flags.publish(next);
    }

    /// Create a product through the API as admin and return its JSON.
    pub async fn create_product(&self, token: &str, body: Value) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/products"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create failed: {}", res.status());
        Ok(res.json().await?)
    }
}

pub fn product_body(name: &str, category: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{name} description"),
        "price": 19.5,
        "primary_image_url": format!("https://img.example.com/{name}.png"),
        "images": [format!("https://img.example.com/{name}-1.png")],
        "category": category,
        "sku": format!("SKU-{name}"),
        "stock_count": 5,
        "tags": ["new"],
    })
}
