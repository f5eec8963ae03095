// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::{from_json, to_json};
use crate::repositories::{CustomFilterRecord, IndexPreferencesRepository};

/// Persisted index view state, one JSON document per index section.
pub struct SqliteIndexPreferencesRepository {
    pool: SqlitePool,
}

impl SqliteIndexPreferencesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IndexPreferencesRepository for SqliteIndexPreferencesRepository {
    async fn get(&self, section: &str) -> Result<Option<serde_json::Value>> {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT preferences FROM index_preferences WHERE section = ?")
                .bind(section)
                .fetch_optional(&self.pool)
                .await?;
        match stored {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, section: &str, preferences: serde_json::Value) -> Result<()> {
        debug!(target: "repository", section, "saving index preferences");
        sqlx::query(
            r#"INSERT INTO index_preferences (section, preferences, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(section) DO UPDATE SET
                   preferences = excluded.preferences,
                   updated_at = excluded.updated_at"#,
        )
        .bind(section)
        .bind(to_json(&preferences)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_custom_filters(&self, section: &str) -> Result<Vec<CustomFilterRecord>> {
        let rows = sqlx::query("SELECT * FROM custom_filters WHERE section = ? ORDER BY label")
            .bind(section)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(CustomFilterRecord {
                    id: row.try_get("id")?,
                    section: row.try_get("section")?,
                    label: row.try_get("label")?,
                    filters: from_json(row.try_get("filters")?)?,
                })
            })
            .collect()
    }

    async fn save_custom_filter(&self, filter: CustomFilterRecord) -> Result<CustomFilterRecord> {
        debug!(target: "repository", id = %filter.id, section = %filter.section, "saving custom filter");
        sqlx::query(
            r#"INSERT INTO custom_filters (id, section, label, filters) VALUES (?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   section = excluded.section,
                   label = excluded.label,
                   filters = excluded.filters"#,
        )
        .bind(&filter.id)
        .bind(&filter.section)
        .bind(&filter.label)
        .bind(to_json(&filter.filters)?)
        .execute(&self.pool)
        .await?;
        Ok(filter)
    }

    async fn delete_custom_filter(&self, id: &str) -> Result<()> {
        debug!(target: "repository", id, "deleting custom filter");
        sqlx::query("DELETE FROM custom_filters WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
