// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::{anyhow, Result};
use chrono::Utc;
use marquee_domain::{ColonReplacement, NamingConfig, ProfileId, QualityProfile, Tag, TagId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::{from_json, parse_dt, parse_id, to_json};
use crate::repositories::{
    NamingConfigRepository, QualityProfileRepository, Repository, TagRepository,
};

// ============================================================================
// Tags
// ============================================================================

fn row_to_tag(row: &SqliteRow) -> Result<Tag> {
    let id: String = row.try_get("id")?;
    Ok(Tag {
        id: parse_id(&id, TagId::from_uuid)?,
        label: row.try_get("label")?,
    })
}

pub struct SqliteTagRepository {
    pool: SqlitePool,
}

impl SqliteTagRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl TagRepository for SqliteTagRepository {
    async fn create(&self, tag: Tag) -> Result<Tag> {
        debug!(target: "repository", tag_id = %tag.id, label = %tag.label, "creating tag");
        sqlx::query("INSERT INTO tags (id, label) VALUES (?, ?)")
            .bind(tag.id.to_string())
            .bind(&tag.label)
            .execute(&self.pool)
            .await?;
        Ok(tag)
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT * FROM tags ORDER BY label")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_tag).collect()
    }

    async fn get_by_id(&self, id: TagId) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT * FROM tags WHERE id = ? LIMIT 1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_tag(&r)).transpose()
    }

    async fn get_by_label(&self, label: &str) -> Result<Option<Tag>> {
        let row = sqlx::query("SELECT * FROM tags WHERE label = ? LIMIT 1")
            .bind(label.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_tag(&r)).transpose()
    }
}

// ============================================================================
// Quality profiles
// ============================================================================

fn row_to_quality_profile(row: &SqliteRow) -> Result<QualityProfile> {
    let id: String = row.try_get("id")?;
    Ok(QualityProfile {
        id: parse_id(&id, ProfileId::from_uuid)?,
        name: row.try_get("name")?,
        allowed_qualities: from_json(row.try_get("allowed_qualities")?)?,
        upgrade_allowed: row.try_get("upgrade_allowed")?,
        cutoff_quality: row.try_get("cutoff_quality")?,
        created_at: parse_dt(row.try_get("created_at")?)?,
        updated_at: parse_dt(row.try_get("updated_at")?)?,
    })
}

/// SQLx-backed QualityProfile repository
pub struct SqliteQualityProfileRepository {
    pool: SqlitePool,
}

impl SqliteQualityProfileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Repository<QualityProfile, ProfileId> for SqliteQualityProfileRepository {
    async fn create(&self, entity: QualityProfile) -> Result<QualityProfile> {
        debug!(target: "repository", profile_id = %entity.id, name = %entity.name, "creating quality profile");
        sqlx::query(
            r#"INSERT INTO quality_profiles
               (id, name, allowed_qualities, upgrade_allowed, cutoff_quality, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(entity.id.to_string())
        .bind(&entity.name)
        .bind(to_json(&entity.allowed_qualities)?)
        .bind(entity.upgrade_allowed)
        .bind(&entity.cutoff_quality)
        .bind(entity.created_at.to_rfc3339())
        .bind(entity.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(entity)
    }

    async fn get_by_id(&self, id: ProfileId) -> Result<Option<QualityProfile>> {
        debug!(target: "repository", %id, "fetching quality profile by id");
        let row = sqlx::query("SELECT * FROM quality_profiles WHERE id = ? LIMIT 1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_quality_profile(&r)).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<QualityProfile>> {
        let rows = sqlx::query("SELECT * FROM quality_profiles ORDER BY name LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_quality_profile).collect()
    }

    async fn update(&self, mut entity: QualityProfile) -> Result<QualityProfile> {
        debug!(target: "repository", profile_id = %entity.id, "updating quality profile");
        entity.updated_at = Utc::now();
        sqlx::query(
            r#"UPDATE quality_profiles SET
                name = ?, allowed_qualities = ?, upgrade_allowed = ?, cutoff_quality = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&entity.name)
        .bind(to_json(&entity.allowed_qualities)?)
        .bind(entity.upgrade_allowed)
        .bind(&entity.cutoff_quality)
        .bind(entity.updated_at.to_rfc3339())
        .bind(entity.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(entity)
    }

    async fn delete(&self, id: ProfileId) -> Result<()> {
        debug!(target: "repository", %id, "deleting quality profile");
        sqlx::query("DELETE FROM quality_profiles WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl QualityProfileRepository for SqliteQualityProfileRepository {
    async fn get_by_name(&self, name: &str) -> Result<Option<QualityProfile>> {
        debug!(target: "repository", name, "fetching quality profile by name");
        let row = sqlx::query("SELECT * FROM quality_profiles WHERE name = ? LIMIT 1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_quality_profile(&r)).transpose()
    }
}

// ============================================================================
// Naming config (single row)
// ============================================================================

pub struct SqliteNamingConfigRepository {
    pool: SqlitePool,
}

impl SqliteNamingConfigRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl NamingConfigRepository for SqliteNamingConfigRepository {
    async fn get(&self) -> Result<NamingConfig> {
        let row = sqlx::query("SELECT * FROM naming_config WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(NamingConfig::default());
        };
        let colon: String = row.try_get("colon_replacement")?;
        Ok(NamingConfig {
            rename_movies: row.try_get("rename_movies")?,
            replace_illegal_characters: row.try_get("replace_illegal_characters")?,
            colon_replacement: ColonReplacement::parse(&colon)
                .ok_or_else(|| anyhow!("unknown colon replacement: {colon}"))?,
            standard_movie_format: row.try_get("standard_movie_format")?,
            movie_folder_format: row.try_get("movie_folder_format")?,
        })
    }

    async fn save(&self, config: NamingConfig) -> Result<NamingConfig> {
        debug!(target: "repository", "saving naming config");
        sqlx::query(
            r#"INSERT INTO naming_config (
                id, rename_movies, replace_illegal_characters, colon_replacement,
                standard_movie_format, movie_folder_format
            ) VALUES (1, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                rename_movies = excluded.rename_movies,
                replace_illegal_characters = excluded.replace_illegal_characters,
                colon_replacement = excluded.colon_replacement,
                standard_movie_format = excluded.standard_movie_format,
                movie_folder_format = excluded.movie_folder_format"#,
        )
        .bind(config.rename_movies)
        .bind(config.replace_illegal_characters)
        .bind(config.colon_replacement.as_str())
        .bind(&config.standard_movie_format)
        .bind(&config.movie_folder_format)
        .execute(&self.pool)
        .await?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_adapters::test_support::setup_pool;

    #[tokio::test]
    async fn tags_are_found_by_normalized_label() {
        let pool = setup_pool().await;
        let repo = SqliteTagRepository::new(pool);
        let tag = repo.create(Tag::new("Favourites")).await.unwrap();

        let found = repo.get_by_label(" FAVOURITES ").await.unwrap().expect("tag");
        assert_eq!(found.id, tag.id);
        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(repo.create(Tag::new("favourites")).await.is_err());
    }

    #[tokio::test]
    async fn quality_profile_round_trip() {
        let pool = setup_pool().await;
        let repo = SqliteQualityProfileRepository::new(pool);
        let mut profile = QualityProfile::new("HD", vec!["HDTV-720p".into(), "Bluray-1080p".into()]);
        profile.cutoff_quality = Some("Bluray-1080p".into());
        let id = profile.id;
        repo.create(profile).await.unwrap();

        let fetched = repo.get_by_name("HD").await.unwrap().expect("profile");
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.allowed_qualities.len(), 2);
        assert!(fetched.cutoff_met("Bluray-1080p"));
    }

    #[tokio::test]
    async fn naming_config_defaults_and_saves() {
        let pool = setup_pool().await;
        let repo = SqliteNamingConfigRepository::new(pool);

        let defaults = repo.get().await.unwrap();
        assert_eq!(defaults.movie_folder_format, "{Movie Title} ({Release Year})");
        assert_eq!(defaults.colon_replacement, ColonReplacement::Delete);

        let mut config = defaults.clone();
        config.rename_movies = true;
        config.colon_replacement = ColonReplacement::SpaceDash;
        repo.save(config).await.unwrap();

        let saved = repo.get().await.unwrap();
        assert!(saved.rename_movies);
        assert_eq!(saved.colon_replacement, ColonReplacement::SpaceDash);
    }
}
