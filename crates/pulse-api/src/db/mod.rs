//! # Database Persistence Layer
//!
//! Postgres persistence for every Pulse table via SQLx.
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, handlers
//! write to Postgres before updating the in-memory stores, and startup
//! hydrates the stores from Postgres. When absent, the API runs in
//! in-memory-only mode (development and tests).
//!
//! Status transitions that must happen at most once (guest invite and
//! assignment completion) are conditional `UPDATE`s; the caller checks
//! `rows_affected` instead of trusting an earlier read.

pub mod assignments;
pub mod companies;
pub mod departments;
pub mod guest_invites;
pub mod profiles;
pub mod responses;
pub mod surveys;
pub mod teams;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            tracing::warn!(
                "DATABASE_URL not set; running in-memory only. Data will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    Ok(Some(pool))
}

/// `SELECT 1` against the pool.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Keep rows that decode, log and drop the rest.
///
/// Rows only fail to decode when the table was edited outside the API.
fn decode_rows<R, T>(
    table: &'static str,
    rows: Vec<R>,
    decode: impl Fn(R) -> Result<T, String>,
) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match decode(row) {
            Ok(record) => Some(record),
            Err(reason) => {
                tracing::error!(table, %reason, "skipping undecodable row");
                None
            }
        })
        .collect()
}

/// Encode a JSON column, surfacing serde failures as SQLx encode errors.
fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(value).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}
