// SPDX-License-Identifier: GPL-3.0-or-later
mod collections;
mod exclusions;
mod movies;
mod preferences;
mod profiles;
mod providers;
mod studios;

pub use collections::SqliteCollectionRepository;
pub use exclusions::SqliteImportExclusionRepository;
pub use movies::{SqliteMovieFileRepository, SqliteMovieMetadataRepository, SqliteMovieRepository};
pub use preferences::SqliteIndexPreferencesRepository;
pub use profiles::{
    SqliteNamingConfigRepository, SqliteQualityProfileRepository, SqliteTagRepository,
};
pub use providers::SqliteProviderRepository;
pub use studios::SqliteStudioRepository;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

pub(crate) fn parse_dt(s: String) -> Result<DateTime<Utc>> {
    // Try RFC3339 first
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Fallback to SQLite default CURRENT_TIMESTAMP format: "YYYY-MM-DD HH:MM:SS"
    let ndt = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("invalid timestamp: {s}"))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

pub(crate) fn parse_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.filter(|v| !v.is_empty()).map(parse_dt).transpose()
}

pub(crate) fn opt_dt(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(|d| d.to_rfc3339())
}

pub(crate) fn parse_id<T>(s: &str, wrap: fn(Uuid) -> T) -> Result<T> {
    let uuid = Uuid::parse_str(s).with_context(|| format!("invalid id: {s}"))?;
    Ok(wrap(uuid))
}

pub(crate) fn parse_id_opt<T>(s: Option<String>, wrap: fn(Uuid) -> T) -> Result<Option<T>> {
    s.filter(|v| !v.is_empty())
        .map(|v| parse_id(&v, wrap))
        .transpose()
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a JSON text column; `NULL` and empty strings yield the default value.
pub(crate) fn from_json<T: DeserializeOwned + Default>(s: Option<String>) -> Result<T> {
    match s {
        Some(v) if !v.trim().is_empty() => {
            serde_json::from_str(&v).with_context(|| format!("invalid json column: {v}"))
        }
        _ => Ok(T::default()),
    }
}

pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::SqlitePool;

    pub async fn setup_pool() -> SqlitePool {
        crate::in_memory_pool().await.expect("in-memory sqlite")
    }
}
