use std::future::Future;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info};

use crate::error::StoreError;

/// Opens the pool and applies pending migrations. Runs once at startup;
/// request handlers assume the schema is already in place.
pub async fn connect_and_migrate(database_url: &str) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;
    info!("database migrations applied");

    Ok(db)
}

/// SQLSTATE 23505: another request inserted the same (member, date) first.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

/// Update-then-insert for rows unique per (member, date). When the insert
/// loses a race against a concurrent insert, the update runs once more.
pub async fn update_or_insert<T, U, UF, I, IF>(
    table: &'static str,
    update: U,
    insert: I,
) -> Result<T, StoreError>
where
    U: Fn() -> UF,
    UF: Future<Output = Result<Option<T>, sqlx::Error>>,
    I: FnOnce() -> IF,
    IF: Future<Output = Result<T, sqlx::Error>>,
{
    if let Some(row) = update().await? {
        return Ok(row);
    }
    match insert().await {
        Ok(row) => Ok(row),
        Err(e) if is_unique_violation(&e) => {
            debug!(table, "row inserted concurrently; updating instead");
            update()
                .await?
                .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
        }
        Err(e) => Err(e.into()),
    }
}
