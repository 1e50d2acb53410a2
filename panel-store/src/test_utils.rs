//! Shared helpers for tests.

use crate::db::run_migrations;
use crate::store::TenantStore;
use sqlx::SqlitePool;

/// Create an in-memory database with the full schema applied.
pub async fn create_test_db() -> TenantStore {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    run_migrations(&pool).await.expect("Failed to run migrations");

    TenantStore::new(pool)
}
