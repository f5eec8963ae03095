// SPDX-License-Identifier: GPL-3.0-or-later
pub mod repositories;
pub mod sqlite_adapters;

use anyhow::Result;
use marquee_config::AppConfig;
use reqwest::Client;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

pub fn http_client() -> reqwest::Result<Client> {
    Client::builder()
        .pool_max_idle_per_host(8)
        .user_agent(concat!("marquee/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Turn a relative `sqlite://` URL into an absolute one with create mode,
/// creating the parent directory along the way.
pub fn normalize_database_url(url: &str) -> Result<String> {
    if !url.starts_with("sqlite://") || url.starts_with("sqlite://:memory:") {
        return Ok(url.to_string());
    }

    let db_path = url.trim_start_matches("sqlite://");
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let path = Path::new(db_path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
            info!(target: "infrastructure", path = %parent.display(), "created database directory");
        }
    }

    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    // SQLite accepts forward slashes on every platform
    let path_str = absolute_path.to_string_lossy().replace('\\', "/");
    Ok(format!("sqlite://{}?mode=rwc", path_str))
}

pub async fn init_database(config: &AppConfig) -> Result<SqlitePool> {
    info!(target: "infrastructure", "initializing database");

    let db_url = normalize_database_url(&config.database.url)?;
    info!(target: "infrastructure", db_url = %db_url, "connecting to database");

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.pool_max_size)
        .connect(&db_url)
        .await?;

    migrate(&pool).await?;

    info!(target: "infrastructure", "database initialized successfully");
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    info!(target: "infrastructure", "running migrations");
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Single-connection in-memory database with every migration applied.
pub async fn in_memory_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    migrate(&pool).await?;
    Ok(pool)
}
