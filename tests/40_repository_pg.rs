//! Runs against a real PostgreSQL only when DATABASE_URL is set; otherwise every test is a no-op.

use anyhow::Result;
use catalog_api::config::DatabaseConfig;
use catalog_api::database::{
    DatabaseManager, DeleteOutcome, NewProduct, Patch, ProductRepository, ProductStore, UpdateProduct,
};
use sqlx::PgPool;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../sql/schema.sql");

async fn pool() -> Result<Option<PgPool>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return Ok(None);
    };
    let pool = DatabaseManager::connect(&DatabaseConfig {
        url,
        max_connections: 2,
        connection_timeout: 10,
    })
    .await?;

    let ddl: String = SCHEMA
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    for statement in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement).execute(&pool).await?;
    }
    Ok(Some(pool))
}

fn product(name: &str, category: &str) -> NewProduct {
    NewProduct {
        name: name.to_string(),
        description: "from integration test".to_string(),
        price: 12.25,
        images: vec!["a.png".to_string(), "b.png".to_string()],
        category: category.to_string(),
        sku: format!("SKU-{}", Uuid::new_v4()),
        stock_count: 3,
        tags: vec!["x".to_string()],
        ..Default::default()
    }
}

#[tokio::test]
async fn crud_round_trip() -> Result<()> {
    let Some(pool) = pool().await? else { return Ok(()) };
    let repo = ProductRepository::new(pool);
    let category = format!("it-{}", Uuid::new_v4());

    let created = repo.create(product("widget", &category)).await?;
    assert_eq!(created.images, vec!["a.png", "b.png"]);
    assert_eq!(created.rating, None);
    assert_eq!(created.review_count, 0);

    let fetched = repo.get(created.id).await?.expect("created product is readable");
    assert_eq!(fetched, created);

    let changes = UpdateProduct {
        price: Patch::Set(99.5),
        tags: Patch::Set(vec![]),
        ..Default::default()
    };
    let updated = repo.update(created.id, changes).await?.expect("row exists");
    assert_eq!(updated.price, 99.5);
    assert!(updated.tags.is_empty());
    assert_eq!(updated.images, created.images);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);

    let touched = repo.update(created.id, UpdateProduct::default()).await?.expect("row exists");
    assert!(touched.updated_at > updated.updated_at);
    assert_eq!(touched.price, 99.5);

    assert_eq!(repo.delete(created.id).await?, DeleteOutcome::Deleted);
    assert_eq!(repo.delete(created.id).await?, DeleteOutcome::NotFound);
    assert!(repo.get(created.id).await?.is_none());
    assert!(repo.update(created.id, UpdateProduct::default()).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn list_and_count_respect_category() -> Result<()> {
    let Some(pool) = pool().await? else { return Ok(()) };
    let repo = ProductRepository::new(pool);
    let category = format!("it-{}", Uuid::new_v4());

    let mut ids = Vec::new();
    for name in ["one", "two", "three"] {
        ids.push(repo.create(product(name, &category)).await?.id);
    }

    assert_eq!(repo.count(&category).await?, 3);
    let page = repo.list(2, 0, &category).await?;
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].name, "three");
    let rest = repo.list(2, 2, &category).await?;
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].name, "one");

    for id in ids {
        repo.delete(id).await?;
    }
    assert_eq!(repo.count(&category).await?, 0);
    repo.ping().await?;
    Ok(())
}

#[tokio::test]
async fn null_arrays_read_back_empty() -> Result<()> {
    let Some(pool) = pool().await? else { return Ok(()) };
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO catalog.products (id, name, price, sku) VALUES ($1, 'legacy', 1.0, $2)")
        .bind(id)
        .bind(format!("SKU-{id}"))
        .execute(&pool)
        .await?;

    let repo = ProductRepository::new(pool);
    let fetched = repo.get(id).await?.expect("inserted row");
    assert!(fetched.images.is_empty());
    assert!(fetched.tags.is_empty());
    repo.delete(id).await?;
    Ok(())
}

#[tokio::test]
async fn pages_are_stable_when_created_at_ties() -> Result<()> {
    let Some(pool) = pool().await? else { return Ok(()) };
    let category = format!("it-{}", Uuid::new_v4());
    let mut ids = Vec::new();
    for _ in 0..4 {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO catalog.products (id, name, price, sku, category, created_at, updated_at) \
             VALUES ($1, 'tie', 1.0, $2, $3, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
        )
        .bind(id)
        .bind(format!("SKU-{id}"))
        .bind(&category)
        .execute(&pool)
        .await?;
        ids.push(id);
    }

    let repo = ProductRepository::new(pool);
    let mut seen = Vec::new();
    for offset in 0..4 {
        let page = repo.list(1, offset, &category).await?;
        assert_eq!(page.len(), 1);
        seen.push(page[0].id);
    }

    ids.sort_by(|a, b| b.cmp(a));
    assert_eq!(seen, ids);

    for id in ids {
        repo.delete(id).await?;
    }
    Ok(())
}
