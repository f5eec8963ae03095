// SPDX-License-Identifier: GPL-3.0-or-later
use std::collections::HashSet;

use anyhow::{anyhow, Result};
use marquee_domain::{
    ItemType, Language, MetadataSource, MinimumAvailability, Movie, MovieFile, MovieFileId,
    MovieId, MovieMetadata, MovieMetadataId, MovieStatus, ProfileId, TagId,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use super::{
    from_json, opt_dt, parse_dt, parse_id, parse_id_opt, parse_opt_dt, placeholders, to_json,
};
use crate::repositories::{
    MovieFileRepository, MovieMetadataRepository, MovieRepository, Repository,
};

const MOVIE_SELECT: &str = r#"
    SELECT
        m.id AS movie_id, m.movie_metadata_id, m.monitored, m.quality_profile_id, m.path,
        m.root_folder_path, m.minimum_availability, m.tags AS movie_tags, m.added AS movie_added,
        mm.*,
        f.id AS file_id, f.relative_path AS file_relative_path, f.size AS file_size,
        f.quality AS file_quality, f.release_group AS file_release_group, f.added AS file_added
    FROM movies m
    JOIN movie_metadata mm ON mm.id = m.movie_metadata_id
    LEFT JOIN movie_files f ON f.id = (
        SELECT id FROM movie_files WHERE movie_id = m.id ORDER BY added DESC LIMIT 1
    )
"#;

// ============================================================================
// Metadata
// ============================================================================

pub(crate) fn row_to_metadata(row: &SqliteRow) -> Result<MovieMetadata> {
    let id: String = row.try_get("id")?;
    let source: String = row.try_get("metadata_source")?;
    let status: String = row.try_get("status")?;
    let item_type: String = row.try_get("item_type")?;
    let original_language: i32 = row.try_get("original_language")?;

    Ok(MovieMetadata {
        id: parse_id(&id, MovieMetadataId::from_uuid)?,
        foreign_id: row.try_get("foreign_id")?,
        metadata_source: MetadataSource::parse(&source)
            .ok_or_else(|| anyhow!("unknown metadata source: {source}"))?,
        imdb_id: row.try_get("imdb_id")?,
        tmdb_id: row.try_get("tmdb_id")?,
        stash_id: row.try_get("stash_id")?,
        images: from_json(row.try_get("images")?)?,
        genres: from_json(row.try_get("genres")?)?,
        title: row.try_get("title")?,
        sort_title: row.try_get("sort_title")?,
        clean_title: row.try_get("clean_title")?,
        original_title: row.try_get("original_title")?,
        clean_original_title: row.try_get("clean_original_title")?,
        original_language: Language::from_id(original_language),
        status: MovieStatus::parse(&status)
            .ok_or_else(|| anyhow!("unknown movie status: {status}"))?,
        last_info_sync: parse_opt_dt(row.try_get("last_info_sync")?)?,
        runtime: row.try_get("runtime")?,
        release_date: parse_opt_dt(row.try_get("release_date")?)?,
        in_cinemas: parse_opt_dt(row.try_get("in_cinemas")?)?,
        physical_release: parse_opt_dt(row.try_get("physical_release")?)?,
        digital_release: parse_opt_dt(row.try_get("digital_release")?)?,
        year: row.try_get("year")?,
        secondary_year: row.try_get("secondary_year")?,
        ratings: from_json(row.try_get("ratings")?)?,
        recommendations: from_json(row.try_get("recommendations")?)?,
        certification: row.try_get("certification")?,
        youtube_trailer_id: row.try_get("youtube_trailer_id")?,
        overview: row.try_get("overview")?,
        website: row.try_get("website")?,
        popularity: row.try_get("popularity")?,
        studio_title: row.try_get("studio_title")?,
        studio_foreign_id: row.try_get("studio_foreign_id")?,
        collection_tmdb_id: row.try_get("collection_tmdb_id")?,
        collection_title: row.try_get("collection_title")?,
        item_type: ItemType::parse(&item_type)
            .ok_or_else(|| anyhow!("unknown item type: {item_type}"))?,
    })
}

/// Upsert keyed on `foreign_id`. The returned row carries the id actually stored.
pub(crate) async fn upsert_metadata(
    conn: &mut SqliteConnection,
    mut metadata: MovieMetadata,
) -> Result<MovieMetadata> {
    debug!(target: "repository", foreign_id = %metadata.foreign_id, "upserting movie metadata");
    let q = r#"
        INSERT INTO movie_metadata (
            id, foreign_id, metadata_source, imdb_id, tmdb_id, stash_id, images, genres,
            title, sort_title, clean_title, original_title, clean_original_title,
            original_language, status, last_info_sync, runtime, release_date, in_cinemas,
            physical_release, digital_release, year, secondary_year, ratings, recommendations,
            certification, youtube_trailer_id, overview, website, popularity, studio_title,
            studio_foreign_id, collection_tmdb_id, collection_title, item_type
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(foreign_id) DO UPDATE SET
            metadata_source = excluded.metadata_source,
            imdb_id = excluded.imdb_id,
            tmdb_id = excluded.tmdb_id,
            stash_id = excluded.stash_id,
            images = excluded.images,
            genres = excluded.genres,
            title = excluded.title,
            sort_title = excluded.sort_title,
            clean_title = excluded.clean_title,
            original_title = excluded.original_title,
            clean_original_title = excluded.clean_original_title,
            original_language = excluded.original_language,
            status = excluded.status,
            last_info_sync = excluded.last_info_sync,
            runtime = excluded.runtime,
            release_date = excluded.release_date,
            in_cinemas = excluded.in_cinemas,
            physical_release = excluded.physical_release,
            digital_release = excluded.digital_release,
            year = excluded.year,
            secondary_year = excluded.secondary_year,
            ratings = excluded.ratings,
            recommendations = excluded.recommendations,
            certification = excluded.certification,
            youtube_trailer_id = excluded.youtube_trailer_id,
            overview = excluded.overview,
            website = excluded.website,
            popularity = excluded.popularity,
            studio_title = excluded.studio_title,
            studio_foreign_id = excluded.studio_foreign_id,
            collection_tmdb_id = excluded.collection_tmdb_id,
            collection_title = excluded.collection_title,
            item_type = excluded.item_type
    "#;

    sqlx::query(q)
        .bind(metadata.id.to_string())
        .bind(&metadata.foreign_id)
        .bind(metadata.metadata_source.as_str())
        .bind(&metadata.imdb_id)
        .bind(metadata.tmdb_id)
        .bind(&metadata.stash_id)
        .bind(to_json(&metadata.images)?)
        .bind(to_json(&metadata.genres)?)
        .bind(&metadata.title)
        .bind(&metadata.sort_title)
        .bind(&metadata.clean_title)
        .bind(&metadata.original_title)
        .bind(&metadata.clean_original_title)
        .bind(metadata.original_language.id)
        .bind(metadata.status.as_str())
        .bind(opt_dt(metadata.last_info_sync))
        .bind(metadata.runtime)
        .bind(opt_dt(metadata.release_date))
        .bind(opt_dt(metadata.in_cinemas))
        .bind(opt_dt(metadata.physical_release))
        .bind(opt_dt(metadata.digital_release))
        .bind(metadata.year)
        .bind(metadata.secondary_year)
        .bind(to_json(&metadata.ratings)?)
        .bind(to_json(&metadata.recommendations)?)
        .bind(&metadata.certification)
        .bind(&metadata.youtube_trailer_id)
        .bind(&metadata.overview)
        .bind(&metadata.website)
        .bind(metadata.popularity)
        .bind(&metadata.studio_title)
        .bind(&metadata.studio_foreign_id)
        .bind(metadata.collection_tmdb_id)
        .bind(&metadata.collection_title)
        .bind(metadata.item_type.as_str())
        .execute(&mut *conn)
        .await?;

    let stored_id: String = sqlx::query_scalar("SELECT id FROM movie_metadata WHERE foreign_id = ?")
        .bind(&metadata.foreign_id)
        .fetch_one(&mut *conn)
        .await?;
    metadata.id = parse_id(&stored_id, MovieMetadataId::from_uuid)?;
    Ok(metadata)
}

/// SQLx-backed movie metadata repository
pub struct SqliteMovieMetadataRepository {
    pool: SqlitePool,
}

impl SqliteMovieMetadataRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MovieMetadataRepository for SqliteMovieMetadataRepository {
    async fn upsert(&self, metadata: MovieMetadata) -> Result<MovieMetadata> {
        let mut conn = self.pool.acquire().await?;
        upsert_metadata(&mut conn, metadata).await
    }

    async fn get_by_foreign_id(&self, foreign_id: &str) -> Result<Option<MovieMetadata>> {
        debug!(target: "repository", foreign_id, "fetching metadata by foreign id");
        let row = sqlx::query("SELECT * FROM movie_metadata WHERE foreign_id = ? LIMIT 1")
            .bind(foreign_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_metadata(&r)).transpose()
    }

    async fn get_by_collection_tmdb_id(&self, tmdb_id: i32) -> Result<Vec<MovieMetadata>> {
        debug!(target: "repository", tmdb_id, "fetching metadata by collection");
        let rows = sqlx::query(
            "SELECT * FROM movie_metadata WHERE collection_tmdb_id = ? ORDER BY year, sort_title",
        )
        .bind(tmdb_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_metadata).collect()
    }

    async fn get_with_collections(&self) -> Result<Vec<MovieMetadata>> {
        debug!(target: "repository", "fetching metadata belonging to collections");
        let rows = sqlx::query(
            "SELECT * FROM movie_metadata WHERE collection_tmdb_id IS NOT NULL ORDER BY year, sort_title",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_metadata).collect()
    }
}

// ============================================================================
// Movies
// ============================================================================

fn parse_availability(s: &str) -> Result<MinimumAvailability> {
    MinimumAvailability::parse(s).ok_or_else(|| anyhow!("unknown minimum availability: {s}"))
}

fn row_to_movie(row: &SqliteRow) -> Result<Movie> {
    let id_str: String = row.try_get("movie_id")?;
    let id = parse_id(&id_str, MovieId::from_uuid)?;
    let metadata = row_to_metadata(row)?;
    let availability: String = row.try_get("minimum_availability")?;
    let tags: Vec<TagId> = from_json(row.try_get("movie_tags")?)?;

    let file_id: Option<String> = row.try_get("file_id")?;
    let movie_file = match file_id {
        Some(file_id) => Some(MovieFile {
            id: parse_id(&file_id, MovieFileId::from_uuid)?,
            movie_id: id,
            relative_path: row.try_get("file_relative_path")?,
            size: row.try_get("file_size")?,
            quality: row.try_get("file_quality")?,
            release_group: row.try_get("file_release_group")?,
            added: parse_dt(row.try_get("file_added")?)?,
        }),
        None => None,
    };

    Ok(Movie {
        id,
        movie_metadata_id: metadata.id,
        monitored: row.try_get("monitored")?,
        quality_profile_id: parse_id_opt(row.try_get("quality_profile_id")?, ProfileId::from_uuid)?,
        path: row.try_get("path")?,
        root_folder_path: row.try_get("root_folder_path")?,
        minimum_availability: parse_availability(&availability)?,
        tags,
        added: parse_dt(row.try_get("movie_added")?)?,
        movie_file,
        metadata,
    })
}

pub(crate) async fn update_movie_row(conn: &mut SqliteConnection, movie: &Movie) -> Result<()> {
    let q = r#"
        UPDATE movies SET
            movie_metadata_id = ?,
            monitored = ?,
            quality_profile_id = ?,
            path = ?,
            root_folder_path = ?,
            minimum_availability = ?,
            tags = ?
        WHERE id = ?
    "#;
    sqlx::query(q)
        .bind(movie.movie_metadata_id.to_string())
        .bind(movie.monitored)
        .bind(movie.quality_profile_id.map(|p| p.to_string()))
        .bind(&movie.path)
        .bind(&movie.root_folder_path)
        .bind(movie.minimum_availability.as_str())
        .bind(to_json(&movie.tags)?)
        .bind(movie.id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn insert_movie_file(conn: &mut SqliteConnection, file: &MovieFile) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO movie_files (id, movie_id, relative_path, size, quality, release_group, added)
           VALUES (?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(file.id.to_string())
    .bind(file.movie_id.to_string())
    .bind(&file.relative_path)
    .bind(file.size)
    .bind(&file.quality)
    .bind(&file.release_group)
    .bind(file.added.to_rfc3339())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// SQLx-backed Movie repository
pub struct SqliteMovieRepository {
    pool: SqlitePool,
}

impl SqliteMovieRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, clause: &str, binds: Vec<String>) -> Result<Vec<Movie>> {
        let sql = format!("{MOVIE_SELECT} {clause}");
        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_movie).collect()
    }
}

#[async_trait::async_trait]
impl Repository<Movie, MovieId> for SqliteMovieRepository {
    async fn create(&self, mut entity: Movie) -> Result<Movie> {
        debug!(target: "repository", movie_id = %entity.id, title = %entity.metadata.title, "creating movie");
        let mut tx = self.pool.begin().await?;

        entity.metadata = upsert_metadata(&mut tx, entity.metadata).await?;
        entity.movie_metadata_id = entity.metadata.id;

        sqlx::query(
            r#"INSERT INTO movies (
                id, movie_metadata_id, monitored, quality_profile_id, path, root_folder_path,
                minimum_availability, tags, added
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(entity.id.to_string())
        .bind(entity.movie_metadata_id.to_string())
        .bind(entity.monitored)
        .bind(entity.quality_profile_id.map(|p| p.to_string()))
        .bind(&entity.path)
        .bind(&entity.root_folder_path)
        .bind(entity.minimum_availability.as_str())
        .bind(to_json(&entity.tags)?)
        .bind(entity.added.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        if let Some(file) = &entity.movie_file {
            insert_movie_file(&mut tx, file).await?;
        }

        tx.commit().await?;
        Ok(entity)
    }

    async fn get_by_id(&self, id: MovieId) -> Result<Option<Movie>> {
        debug!(target: "repository", %id, "fetching movie by id");
        let mut movies = self
            .fetch_where("WHERE m.id = ? LIMIT 1", vec![id.to_string()])
            .await?;
        Ok(movies.pop())
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Movie>> {
        debug!(target: "repository", limit, offset, "listing movies");
        let sql = format!("{MOVIE_SELECT} ORDER BY mm.sort_title LIMIT ? OFFSET ?");
        let rows = sqlx::query(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_movie).collect()
    }

    async fn update(&self, mut entity: Movie) -> Result<Movie> {
        debug!(target: "repository", movie_id = %entity.id, "updating movie");
        let mut tx = self.pool.begin().await?;
        entity.metadata = upsert_metadata(&mut tx, entity.metadata).await?;
        entity.movie_metadata_id = entity.metadata.id;
        update_movie_row(&mut tx, &entity).await?;
        tx.commit().await?;
        Ok(entity)
    }

    async fn delete(&self, id: MovieId) -> Result<()> {
        debug!(target: "repository", %id, "deleting movie");
        sqlx::query("DELETE FROM movies WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl MovieRepository for SqliteMovieRepository {
    async fn list_all(&self) -> Result<Vec<Movie>> {
        debug!(target: "repository", "listing all movies");
        self.fetch_where("ORDER BY mm.sort_title", Vec::new()).await
    }

    async fn get_many(&self, ids: &[MovieId]) -> Result<Vec<Movie>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let clause = format!("WHERE m.id IN ({})", placeholders(ids.len()));
        self.fetch_where(&clause, ids.iter().map(|id| id.to_string()).collect())
            .await
    }

    async fn get_by_foreign_id(&self, foreign_id: &str) -> Result<Option<Movie>> {
        debug!(target: "repository", foreign_id, "fetching movie by foreign id");
        let mut movies = self
            .fetch_where("WHERE mm.foreign_id = ? LIMIT 1", vec![foreign_id.to_string()])
            .await?;
        Ok(movies.pop())
    }

    async fn get_by_collection_tmdb_id(&self, tmdb_id: i32) -> Result<Vec<Movie>> {
        debug!(target: "repository", tmdb_id, "fetching movies by collection");
        let sql = format!("{MOVIE_SELECT} WHERE mm.collection_tmdb_id = ? ORDER BY mm.year, mm.sort_title");
        let rows = sqlx::query(&sql)
            .bind(tmdb_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_movie).collect()
    }

    async fn get_by_studio_foreign_id(&self, foreign_id: &str) -> Result<Vec<Movie>> {
        debug!(target: "repository", foreign_id, "fetching movies by studio");
        self.fetch_where(
            "WHERE mm.studio_foreign_id = ? ORDER BY mm.release_date, mm.sort_title",
            vec![foreign_id.to_string()],
        )
        .await
    }

    async fn all_tmdb_ids_with_collections(&self) -> Result<HashSet<i32>> {
        let ids: Vec<i32> = sqlx::query_scalar(
            r#"SELECT mm.tmdb_id FROM movies m
               JOIN movie_metadata mm ON mm.id = m.movie_metadata_id
               WHERE mm.collection_tmdb_id IS NOT NULL AND mm.tmdb_id IS NOT NULL"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().collect())
    }

    async fn update_many(&self, movies: Vec<Movie>) -> Result<Vec<Movie>> {
        debug!(target: "repository", count = movies.len(), "updating movies");
        let mut tx = self.pool.begin().await?;
        for movie in &movies {
            update_movie_row(&mut tx, movie).await?;
        }
        tx.commit().await?;
        Ok(movies)
    }
}

// ============================================================================
// Movie files
// ============================================================================

fn row_to_movie_file(row: &SqliteRow) -> Result<MovieFile> {
    let id: String = row.try_get("id")?;
    let movie_id: String = row.try_get("movie_id")?;
    Ok(MovieFile {
        id: parse_id(&id, MovieFileId::from_uuid)?,
        movie_id: parse_id(&movie_id, MovieId::from_uuid)?,
        relative_path: row.try_get("relative_path")?,
        size: row.try_get("size")?,
        quality: row.try_get("quality")?,
        release_group: row.try_get("release_group")?,
        added: parse_dt(row.try_get("added")?)?,
    })
}

/// SQLx-backed movie file repository
pub struct SqliteMovieFileRepository {
    pool: SqlitePool,
}

impl SqliteMovieFileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MovieFileRepository for SqliteMovieFileRepository {
    async fn create(&self, file: MovieFile) -> Result<MovieFile> {
        debug!(target: "repository", file_id = %file.id, movie_id = %file.movie_id, "creating movie file");
        let mut conn = self.pool.acquire().await?;
        insert_movie_file(&mut conn, &file).await?;
        Ok(file)
    }

    async fn get_by_id(&self, id: MovieFileId) -> Result<Option<MovieFile>> {
        let row = sqlx::query("SELECT * FROM movie_files WHERE id = ? LIMIT 1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_movie_file(&r)).transpose()
    }

    async fn get_by_movie(&self, movie_id: MovieId) -> Result<Vec<MovieFile>> {
        debug!(target: "repository", %movie_id, "fetching movie files");
        let rows = sqlx::query("SELECT * FROM movie_files WHERE movie_id = ? ORDER BY added")
            .bind(movie_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_movie_file).collect()
    }

    async fn update(&self, file: MovieFile) -> Result<MovieFile> {
        debug!(target: "repository", file_id = %file.id, "updating movie file");
        sqlx::query(
            "UPDATE movie_files SET relative_path = ?, size = ?, quality = ?, release_group = ? WHERE id = ?",
        )
        .bind(&file.relative_path)
        .bind(file.size)
        .bind(&file.quality)
        .bind(&file.release_group)
        .bind(file.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_adapters::test_support::setup_pool;

    fn collection_movie(foreign_id: &str, tmdb_id: i32, collection: Option<i32>) -> Movie {
        let mut metadata = MovieMetadata::new(foreign_id, format!("Movie {tmdb_id}"), ItemType::Movie);
        metadata.tmdb_id = Some(tmdb_id);
        metadata.collection_tmdb_id = collection;
        metadata.genres = vec!["Action".into()];
        Movie::new(metadata)
    }

    #[tokio::test]
    async fn movie_create_and_get_by_id_round_trip() {
        let pool = setup_pool().await;
        let repo = SqliteMovieRepository::new(pool.clone());

        let mut movie = collection_movie("603", 603, Some(2344));
        movie.movie_file = Some(MovieFile::new(movie.id, "The Matrix (1999).mkv", 1024));
        let id = movie.id;

        repo.create(movie).await.expect("create movie");

        let fetched = repo.get_by_id(id).await.expect("fetch").expect("exists");
        assert_eq!(fetched.metadata.title, "Movie 603");
        assert_eq!(fetched.metadata.genres, vec!["Action".to_string()]);
        assert_eq!(fetched.movie_metadata_id, fetched.metadata.id);
        assert_eq!(fetched.size_on_disk(), 1024);
        assert!(fetched.monitored);
    }

    #[tokio::test]
    async fn metadata_upsert_keeps_original_id() {
        let pool = setup_pool().await;
        let repo = SqliteMovieMetadataRepository::new(pool);

        let first = repo
            .upsert(MovieMetadata::new("stash-1", "Scene One", ItemType::Scene))
            .await
            .unwrap();
        let mut second = MovieMetadata::new("stash-1", "Scene One (Director's Cut)", ItemType::Scene);
        second.studio_foreign_id = Some("studio-9".into());
        let second = repo.upsert(second).await.unwrap();

        assert_eq!(first.id, second.id);
        let stored = repo.get_by_foreign_id("stash-1").await.unwrap().unwrap();
        assert_eq!(stored.title, "Scene One (Director's Cut)");
        assert_eq!(stored.studio_foreign_id.as_deref(), Some("studio-9"));
    }

    #[tokio::test]
    async fn collection_queries_and_bulk_update() {
        let pool = setup_pool().await;
        let repo = SqliteMovieRepository::new(pool.clone());

        repo.create(collection_movie("1", 1, Some(10))).await.unwrap();
        repo.create(collection_movie("2", 2, Some(10))).await.unwrap();
        repo.create(collection_movie("3", 3, None)).await.unwrap();

        let in_collection = repo.get_by_collection_tmdb_id(10).await.unwrap();
        assert_eq!(in_collection.len(), 2);

        let ids = repo.all_tmdb_ids_with_collections().await.unwrap();
        assert_eq!(ids, HashSet::from([1, 2]));

        let unmonitored: Vec<Movie> = in_collection
            .into_iter()
            .map(|mut m| {
                m.monitored = false;
                m
            })
            .collect();
        repo.update_many(unmonitored).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.iter().filter(|m| !m.monitored).count(), 2);
    }

    #[tokio::test]
    async fn movie_files_follow_their_movie() {
        let pool = setup_pool().await;
        let movies = SqliteMovieRepository::new(pool.clone());
        let files = SqliteMovieFileRepository::new(pool.clone());

        let movie = movies.create(collection_movie("5", 5, None)).await.unwrap();
        let mut file = files
            .create(MovieFile::new(movie.id, "old name.mkv", 10))
            .await
            .unwrap();
        file.relative_path = "New Name (2001).mkv".into();
        files.update(file.clone()).await.unwrap();

        let stored = files.get_by_movie(movie.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].relative_path, "New Name (2001).mkv");

        movies.delete(movie.id).await.unwrap();
        assert!(files.get_by_id(file.id).await.unwrap().is_none());
    }
}
