// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::Result;
use marquee_domain::{ProfileId, Studio, StudioId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::{from_json, parse_dt, parse_id, parse_id_opt, to_json};
use crate::repositories::{Repository, StudioRepository};

fn row_to_studio(row: &SqliteRow) -> Result<Studio> {
    let id: String = row.try_get("id")?;
    Ok(Studio {
        id: parse_id(&id, StudioId::from_uuid)?,
        foreign_id: row.try_get("foreign_id")?,
        title: row.try_get("title")?,
        sort_title: row.try_get("sort_title")?,
        clean_title: row.try_get("clean_title")?,
        website: row.try_get("website")?,
        network: row.try_get("network")?,
        monitored: row.try_get("monitored")?,
        quality_profile_id: parse_id_opt(row.try_get("quality_profile_id")?, ProfileId::from_uuid)?,
        root_folder_path: row.try_get("root_folder_path")?,
        tags: from_json(row.try_get("tags")?)?,
        added: parse_dt(row.try_get("added")?)?,
    })
}

/// SQLx-backed studio repository
pub struct SqliteStudioRepository {
    pool: SqlitePool,
}

impl SqliteStudioRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Repository<Studio, StudioId> for SqliteStudioRepository {
    async fn create(&self, entity: Studio) -> Result<Studio> {
        debug!(target: "repository", studio_id = %entity.id, title = %entity.title, "creating studio");
        let q = r#"
            INSERT INTO studios (
                id, foreign_id, title, sort_title, clean_title, website, network, monitored,
                quality_profile_id, root_folder_path, tags, added
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;
        sqlx::query(q)
            .bind(entity.id.to_string())
            .bind(&entity.foreign_id)
            .bind(&entity.title)
            .bind(&entity.sort_title)
            .bind(&entity.clean_title)
            .bind(&entity.website)
            .bind(&entity.network)
            .bind(entity.monitored)
            .bind(entity.quality_profile_id.map(|p| p.to_string()))
            .bind(&entity.root_folder_path)
            .bind(to_json(&entity.tags)?)
            .bind(entity.added.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(entity)
    }

    async fn get_by_id(&self, id: StudioId) -> Result<Option<Studio>> {
        debug!(target: "repository", %id, "fetching studio by id");
        let row = sqlx::query("SELECT * FROM studios WHERE id = ? LIMIT 1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_studio(&r)).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Studio>> {
        debug!(target: "repository", limit, offset, "listing studios");
        let rows = sqlx::query("SELECT * FROM studios ORDER BY sort_title LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_studio).collect()
    }

    async fn update(&self, entity: Studio) -> Result<Studio> {
        debug!(target: "repository", studio_id = %entity.id, "updating studio");
        let q = r#"
            UPDATE studios SET
                foreign_id = ?,
                title = ?,
                sort_title = ?,
                clean_title = ?,
                website = ?,
                network = ?,
                monitored = ?,
                quality_profile_id = ?,
                root_folder_path = ?,
                tags = ?
            WHERE id = ?
        "#;
        sqlx::query(q)
            .bind(&entity.foreign_id)
            .bind(&entity.title)
            .bind(&entity.sort_title)
            .bind(&entity.clean_title)
            .bind(&entity.website)
            .bind(&entity.network)
            .bind(entity.monitored)
            .bind(entity.quality_profile_id.map(|p| p.to_string()))
            .bind(&entity.root_folder_path)
            .bind(to_json(&entity.tags)?)
            .bind(entity.id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(entity)
    }

    async fn delete(&self, id: StudioId) -> Result<()> {
        debug!(target: "repository", %id, "deleting studio");
        sqlx::query("DELETE FROM studios WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl StudioRepository for SqliteStudioRepository {
    async fn list_all(&self) -> Result<Vec<Studio>> {
        let rows = sqlx::query("SELECT * FROM studios ORDER BY sort_title")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_studio).collect()
    }

    async fn get_by_foreign_id(&self, foreign_id: &str) -> Result<Option<Studio>> {
        debug!(target: "repository", foreign_id, "fetching studio by foreign id");
        let row = sqlx::query("SELECT * FROM studios WHERE foreign_id = ? LIMIT 1")
            .bind(foreign_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_studio(&r)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_adapters::test_support::setup_pool;

    #[tokio::test]
    async fn studio_create_update_and_lookup() {
        let pool = setup_pool().await;
        let repo = SqliteStudioRepository::new(pool);

        let mut studio = Studio::new("stash-studio-1", "The Brand");
        studio.network = Some("Network One".into());
        let id = studio.id;
        repo.create(studio).await.unwrap();

        let mut fetched = repo
            .get_by_foreign_id("stash-studio-1")
            .await
            .unwrap()
            .expect("exists");
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.sort_title, "brand");

        fetched.monitored = true;
        repo.update(fetched).await.unwrap();
        assert!(repo.get_by_id(id).await.unwrap().unwrap().monitored);
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }
}
