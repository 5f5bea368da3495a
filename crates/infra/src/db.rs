//! Database pool setup and migrations.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Connect to Postgres and run pending migrations.
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(16)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("database connected, migrations applied");
    Ok(pool)
}

/// Read the connection string from the environment.
pub fn database_url() -> anyhow::Result<String> {
    std::env::var(ENV_DATABASE_URL)
        .map_err(|_| anyhow::anyhow!("{ENV_DATABASE_URL} is not set"))
}
