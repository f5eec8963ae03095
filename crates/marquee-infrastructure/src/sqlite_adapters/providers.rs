// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::Result;
use marquee_domain::ProviderId;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::{from_json, parse_id, placeholders, to_json};
use crate::repositories::{ProviderRecord, ProviderRepository};

fn row_to_record(row: &SqliteRow) -> Result<ProviderRecord> {
    let id: String = row.try_get("id")?;
    Ok(ProviderRecord {
        id: parse_id(&id, ProviderId::from_uuid)?,
        kind: row.try_get("kind")?,
        name: row.try_get("name")?,
        implementation: row.try_get("implementation")?,
        config_contract: row.try_get("config_contract")?,
        enable: row.try_get("enable")?,
        tags: from_json(row.try_get("tags")?)?,
        settings: from_json(row.try_get("settings")?)?,
        extra: from_json(row.try_get("extra")?)?,
    })
}

/// Stores every provider kind in one table, discriminated by `kind`.
pub struct SqliteProviderRepository {
    pool: SqlitePool,
}

impl SqliteProviderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProviderRepository for SqliteProviderRepository {
    async fn list(&self, kind: &str) -> Result<Vec<ProviderRecord>> {
        debug!(target: "repository", kind, "listing providers");
        let rows = sqlx::query("SELECT * FROM provider_definitions WHERE kind = ? ORDER BY name")
            .bind(kind)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn get(&self, kind: &str, id: ProviderId) -> Result<Option<ProviderRecord>> {
        debug!(target: "repository", kind, %id, "fetching provider");
        let row = sqlx::query("SELECT * FROM provider_definitions WHERE kind = ? AND id = ? LIMIT 1")
            .bind(kind)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_record(&r)).transpose()
    }

    async fn get_many(&self, kind: &str, ids: &[ProviderId]) -> Result<Vec<ProviderRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT * FROM provider_definitions WHERE kind = ? AND id IN ({}) ORDER BY name",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql).bind(kind);
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn get_by_name(&self, kind: &str, name: &str) -> Result<Option<ProviderRecord>> {
        let row = sqlx::query(
            "SELECT * FROM provider_definitions WHERE kind = ? AND name = ? COLLATE NOCASE LIMIT 1",
        )
        .bind(kind)
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_record(&r)).transpose()
    }

    async fn create(&self, record: ProviderRecord) -> Result<ProviderRecord> {
        debug!(target: "repository", kind = %record.kind, name = %record.name, "creating provider");
        sqlx::query(
            r#"INSERT INTO provider_definitions
               (id, kind, name, implementation, config_contract, enable, tags, settings, extra)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(&record.kind)
        .bind(&record.name)
        .bind(&record.implementation)
        .bind(&record.config_contract)
        .bind(record.enable)
        .bind(to_json(&record.tags)?)
        .bind(to_json(&record.settings)?)
        .bind(to_json(&record.extra)?)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn update(&self, record: ProviderRecord) -> Result<ProviderRecord> {
        debug!(target: "repository", kind = %record.kind, id = %record.id, "updating provider");
        sqlx::query(
            r#"UPDATE provider_definitions SET
                name = ?, implementation = ?, config_contract = ?, enable = ?,
                tags = ?, settings = ?, extra = ?
               WHERE kind = ? AND id = ?"#,
        )
        .bind(&record.name)
        .bind(&record.implementation)
        .bind(&record.config_contract)
        .bind(record.enable)
        .bind(to_json(&record.tags)?)
        .bind(to_json(&record.settings)?)
        .bind(to_json(&record.extra)?)
        .bind(&record.kind)
        .bind(record.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn delete_many(&self, kind: &str, ids: &[ProviderId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        debug!(target: "repository", kind, count = ids.len(), "deleting providers");
        let sql = format!(
            "DELETE FROM provider_definitions WHERE kind = ? AND id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql).bind(kind);
        for id in ids {
            query = query.bind(id.to_string());
        }
        Ok(query.execute(&self.pool).await?.rows_affected())
    }
}
