// SPDX-License-Identifier: GPL-3.0-or-later
use std::collections::HashSet;

use anyhow::{anyhow, Result};
use marquee_domain::{ExclusionId, ImportExclusion};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::parse_id;
use crate::repositories::ImportExclusionRepository;

fn row_to_exclusion(row: &SqliteRow) -> Result<ImportExclusion> {
    let id: String = row.try_get("id")?;
    Ok(ImportExclusion {
        id: parse_id(&id, ExclusionId::from_uuid)?,
        tmdb_id: row.try_get("tmdb_id")?,
        title: row.try_get("title")?,
        year: row.try_get("year")?,
    })
}

pub struct SqliteImportExclusionRepository {
    pool: SqlitePool,
}

impl SqliteImportExclusionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ImportExclusionRepository for SqliteImportExclusionRepository {
    async fn list(&self) -> Result<Vec<ImportExclusion>> {
        let rows = sqlx::query("SELECT * FROM import_exclusions ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_exclusion).collect()
    }

    async fn tmdb_ids(&self) -> Result<HashSet<i32>> {
        let ids: Vec<i32> = sqlx::query_scalar("SELECT tmdb_id FROM import_exclusions")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn add(&self, exclusion: ImportExclusion) -> Result<ImportExclusion> {
        debug!(
            target: "repository",
            tmdb_id = exclusion.tmdb_id,
            title = %exclusion.title,
            "adding import exclusion"
        );
        sqlx::query(
            r#"INSERT INTO import_exclusions (id, tmdb_id, title, year)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(tmdb_id) DO NOTHING"#,
        )
        .bind(exclusion.id.to_string())
        .bind(exclusion.tmdb_id)
        .bind(&exclusion.title)
        .bind(exclusion.year)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query("SELECT * FROM import_exclusions WHERE tmdb_id = ? LIMIT 1")
            .bind(exclusion.tmdb_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| anyhow!("import exclusion {} vanished after insert", exclusion.tmdb_id))?;
        row_to_exclusion(&row)
    }

    async fn delete(&self, id: ExclusionId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM import_exclusions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_adapters::test_support::setup_pool;

    #[tokio::test]
    async fn adding_an_excluded_tmdb_id_twice_keeps_the_first_row() {
        let pool = setup_pool().await;
        let repo = SqliteImportExclusionRepository::new(pool);

        let first = repo
            .add(ImportExclusion::new(603, "The Matrix", Some(1999)))
            .await
            .unwrap();
        let second = repo
            .add(ImportExclusion::new(603, "Matrix, The", None))
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.title, "The Matrix");
        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert_eq!(repo.tmdb_ids().await.unwrap(), HashSet::from([603]));
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let pool = setup_pool().await;
        let repo = SqliteImportExclusionRepository::new(pool);
        let stored = repo.add(ImportExclusion::new(949, "Heat", Some(1995))).await.unwrap();

        assert!(repo.delete(stored.id).await.unwrap());
        assert!(!repo.delete(stored.id).await.unwrap());
        assert!(repo.list().await.unwrap().is_empty());
    }
}
