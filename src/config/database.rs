use super::env_parse;
use anyhow::Context;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::env;
use std::time::Duration;

/// Open the connection pool. The returned handle is cloned into every
/// service; it lives for the whole process.
pub async fn connect() -> anyhow::Result<DatabaseConnection> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    connect_to(&database_url).await
}

pub async fn connect_to(database_url: &str) -> anyhow::Result<DatabaseConnection> {
    let max_connections: u32 = env_parse("DB_MAX_CONNECTIONS", 10);
    let min_connections: u32 = env_parse("DB_MIN_CONNECTIONS", 2);

    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(max_connections)
        .min_connections(min_connections.min(max_connections))
        .connect_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(env_parse("DB_LOG_STATEMENTS", false));

    Database::connect(opt)
        .await
        .context("failed to connect to PostgreSQL")
}
