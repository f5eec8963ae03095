// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::{anyhow, Result};
use marquee_domain::{CollectionId, MinimumAvailability, Movie, MovieCollection, ProfileId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use super::movies::update_movie_row;
use super::{from_json, opt_dt, parse_dt, parse_id, parse_id_opt, parse_opt_dt, placeholders, to_json};
use crate::repositories::{CollectionRepository, Repository};

fn row_to_collection(row: &SqliteRow) -> Result<MovieCollection> {
    let id: String = row.try_get("id")?;
    let availability: String = row.try_get("minimum_availability")?;
    Ok(MovieCollection {
        id: parse_id(&id, CollectionId::from_uuid)?,
        tmdb_id: row.try_get("tmdb_id")?,
        title: row.try_get("title")?,
        clean_title: row.try_get("clean_title")?,
        sort_title: row.try_get("sort_title")?,
        overview: row.try_get("overview")?,
        monitored: row.try_get("monitored")?,
        quality_profile_id: parse_id_opt(row.try_get("quality_profile_id")?, ProfileId::from_uuid)?,
        root_folder_path: row.try_get("root_folder_path")?,
        search_on_add: row.try_get("search_on_add")?,
        minimum_availability: MinimumAvailability::parse(&availability)
            .ok_or_else(|| anyhow!("unknown minimum availability: {availability}"))?,
        // Rows written before collections carried tags hold NULL here
        tags: from_json(row.try_get("tags")?)?,
        images: from_json(row.try_get("images")?)?,
        added: parse_dt(row.try_get("added")?)?,
        last_info_sync: parse_opt_dt(row.try_get("last_info_sync")?)?,
    })
}

async fn update_collection_row(conn: &mut SqliteConnection, entity: &MovieCollection) -> Result<()> {
    let q = r#"
        UPDATE collections SET
            tmdb_id = ?,
            title = ?,
            clean_title = ?,
            sort_title = ?,
            overview = ?,
            monitored = ?,
            quality_profile_id = ?,
            root_folder_path = ?,
            search_on_add = ?,
            minimum_availability = ?,
            tags = ?,
            images = ?,
            last_info_sync = ?
        WHERE id = ?
    "#;
    sqlx::query(q)
        .bind(entity.tmdb_id)
        .bind(&entity.title)
        .bind(&entity.clean_title)
        .bind(&entity.sort_title)
        .bind(&entity.overview)
        .bind(entity.monitored)
        .bind(entity.quality_profile_id.map(|p| p.to_string()))
        .bind(&entity.root_folder_path)
        .bind(entity.search_on_add)
        .bind(entity.minimum_availability.as_str())
        .bind(to_json(&entity.tags)?)
        .bind(to_json(&entity.images)?)
        .bind(opt_dt(entity.last_info_sync))
        .bind(entity.id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// SQLx-backed collection repository
pub struct SqliteCollectionRepository {
    pool: SqlitePool,
}

impl SqliteCollectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Repository<MovieCollection, CollectionId> for SqliteCollectionRepository {
    async fn create(&self, entity: MovieCollection) -> Result<MovieCollection> {
        debug!(target: "repository", collection_id = %entity.id, tmdb_id = entity.tmdb_id, "creating collection");
        let q = r#"
            INSERT INTO collections (
                id, tmdb_id, title, clean_title, sort_title, overview, monitored,
                quality_profile_id, root_folder_path, search_on_add, minimum_availability,
                tags, images, added, last_info_sync
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;
        sqlx::query(q)
            .bind(entity.id.to_string())
            .bind(entity.tmdb_id)
            .bind(&entity.title)
            .bind(&entity.clean_title)
            .bind(&entity.sort_title)
            .bind(&entity.overview)
            .bind(entity.monitored)
            .bind(entity.quality_profile_id.map(|p| p.to_string()))
            .bind(&entity.root_folder_path)
            .bind(entity.search_on_add)
            .bind(entity.minimum_availability.as_str())
            .bind(to_json(&entity.tags)?)
            .bind(to_json(&entity.images)?)
            .bind(entity.added.to_rfc3339())
            .bind(opt_dt(entity.last_info_sync))
            .execute(&self.pool)
            .await?;
        Ok(entity)
    }

    async fn get_by_id(&self, id: CollectionId) -> Result<Option<MovieCollection>> {
        debug!(target: "repository", %id, "fetching collection by id");
        let row = sqlx::query("SELECT * FROM collections WHERE id = ? LIMIT 1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_collection(&r)).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<MovieCollection>> {
        debug!(target: "repository", limit, offset, "listing collections");
        let rows = sqlx::query("SELECT * FROM collections ORDER BY sort_title LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_collection).collect()
    }

    async fn update(&self, entity: MovieCollection) -> Result<MovieCollection> {
        debug!(target: "repository", collection_id = %entity.id, "updating collection");
        let mut conn = self.pool.acquire().await?;
        update_collection_row(&mut conn, &entity).await?;
        Ok(entity)
    }

    async fn delete(&self, id: CollectionId) -> Result<()> {
        debug!(target: "repository", %id, "deleting collection");
        sqlx::query("DELETE FROM collections WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CollectionRepository for SqliteCollectionRepository {
    async fn list_all(&self) -> Result<Vec<MovieCollection>> {
        debug!(target: "repository", "listing all collections");
        let rows = sqlx::query("SELECT * FROM collections ORDER BY sort_title")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_collection).collect()
    }

    async fn find_by_tmdb_id(&self, tmdb_id: i32) -> Result<Option<MovieCollection>> {
        debug!(target: "repository", tmdb_id, "fetching collection by tmdb id");
        let row = sqlx::query("SELECT * FROM collections WHERE tmdb_id = ? LIMIT 1")
            .bind(tmdb_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_collection(&r)).transpose()
    }

    async fn get_many(&self, ids: &[CollectionId]) -> Result<Vec<MovieCollection>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT * FROM collections WHERE id IN ({}) ORDER BY sort_title",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_collection).collect()
    }

    async fn update_many_with_movies(
        &self,
        collections: Vec<MovieCollection>,
        movies: Vec<Movie>,
    ) -> Result<Vec<MovieCollection>> {
        debug!(target: "repository", collections = collections.len(), movies = movies.len(), "updating collections with movies");
        let mut tx = self.pool.begin().await?;
        for movie in &movies {
            update_movie_row(&mut tx, movie).await?;
        }
        for collection in &collections {
            update_collection_row(&mut tx, collection).await?;
        }
        tx.commit().await?;
        Ok(collections)
    }
}
