// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use marquee_config::MetadataConfig;
use marquee_domain::{
    ItemType, Language, MediaCover, MovieMetadata, MovieStatus, RatingChild, Ratings,
};
use moka::sync::Cache;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum MetadataSourceError {
    #[error("{0} not found on the metadata server")]
    NotFound(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
    #[error("Rate limiter closed")]
    RateLimiterClosed,
}

/// A collection as described by the metadata server, members included.
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub tmdb_id: i32,
    pub title: String,
    pub overview: Option<String>,
    pub images: Vec<MediaCover>,
    pub parts: Vec<MovieMetadata>,
}

#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    async fn get_movie_info(&self, tmdb_id: i32) -> Result<MovieMetadata, MetadataSourceError>;
    async fn get_collection_info(&self, tmdb_id: i32) -> Result<CollectionInfo, MetadataSourceError>;
    /// Free-text title search. Results are never cached.
    async fn search_movies(&self, term: &str) -> Result<Vec<MovieMetadata>, MetadataSourceError>;

    /// Forget any cached answer so the next lookup asks the server.
    fn evict_movie(&self, _tmdb_id: i32) {}
    fn evict_collection(&self, _tmdb_id: i32) {}
}

pub struct HttpMetadataSource {
    client: Client,
    base_url: String,
    language: String,
    rate_limiter: Arc<Semaphore>,
    cache_movie: Cache<i32, MovieMetadata>,
    cache_collection: Cache<i32, CollectionInfo>,
}

impl HttpMetadataSource {
    pub fn new(client: Client, config: &MetadataConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.movie_info_language.clone(),
            rate_limiter: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
            cache_movie: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
                .build(),
            cache_collection: Cache::builder()
                .max_capacity(1_000)
                .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
                .build(),
        }
    }

    async fn fetch<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        what: String,
        query: &[(&str, &str)],
    ) -> Result<T, MetadataSourceError> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|_| MetadataSourceError::RateLimiterClosed)?;

        let url = format!("{}{}", self.base_url, path);
        debug!(target: "metadata", url = %url, "fetching from metadata server");

        let response = self
            .client
            .get(&url)
            .query(&[("language", self.language.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status == StatusCode::NOT_FOUND {
            return Err(MetadataSourceError::NotFound(what));
        }
        if !status.is_success() {
            return Err(MetadataSourceError::HttpStatus { status, body });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait::async_trait]
impl MetadataSource for HttpMetadataSource {
    #[instrument(skip(self))]
    async fn get_movie_info(&self, tmdb_id: i32) -> Result<MovieMetadata, MetadataSourceError> {
        if let Some(cached) = self.cache_movie.get(&tmdb_id) {
            return Ok(cached);
        }
        let resource: MovieResource = self
            .fetch(&format!("/movie/{tmdb_id}"), format!("movie {tmdb_id}"), &[])
            .await?;
        let metadata = resource.into_metadata();
        self.cache_movie.insert(tmdb_id, metadata.clone());
        Ok(metadata)
    }

    #[instrument(skip(self))]
    async fn get_collection_info(&self, tmdb_id: i32) -> Result<CollectionInfo, MetadataSourceError> {
        if let Some(cached) = self.cache_collection.get(&tmdb_id) {
            return Ok(cached);
        }
        let resource: CollectionResource = self
            .fetch(
                &format!("/movie/collection/{tmdb_id}"),
                format!("collection {tmdb_id}"),
                &[],
            )
            .await?;
        let info = CollectionInfo {
            tmdb_id: resource.tmdb_id,
            title: resource.name,
            overview: resource.overview,
            images: resource.images.into_iter().map(ImageResource::into_cover).collect(),
            parts: resource
                .parts
                .into_iter()
                .map(MovieResource::into_metadata)
                .collect(),
        };
        self.cache_collection.insert(tmdb_id, info.clone());
        Ok(info)
    }

    #[instrument(skip(self))]
    async fn search_movies(&self, term: &str) -> Result<Vec<MovieMetadata>, MetadataSourceError> {
        let resources: Vec<MovieResource> = self
            .fetch("/search", format!("search '{term}'"), &[("q", term)])
            .await?;
        Ok(resources.into_iter().map(MovieResource::into_metadata).collect())
    }

    fn evict_movie(&self, tmdb_id: i32) {
        self.cache_movie.invalidate(&tmdb_id);
    }

    fn evict_collection(&self, tmdb_id: i32) {
        self.cache_collection.invalidate(&tmdb_id);
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageResource {
    cover_type: String,
    url: String,
}

impl ImageResource {
    fn into_cover(self) -> MediaCover {
        MediaCover {
            cover_type: self.cover_type.to_lowercase(),
            url: None,
            remote_url: Some(self.url),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RatingResource {
    count: i64,
    value: f64,
    origin: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CollectionRef {
    name: String,
    tmdb_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CertificationResource {
    country: String,
    certification: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecommendationResource {
    tmdb_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MovieResource {
    tmdb_id: i32,
    imdb_id: Option<String>,
    title: String,
    original_title: Option<String>,
    original_language: Option<String>,
    overview: Option<String>,
    year: Option<i32>,
    #[serde(default)]
    runtime: i32,
    #[serde(default)]
    images: Vec<ImageResource>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    ratings: Vec<RatingResource>,
    in_cinema: Option<String>,
    physical_release: Option<String>,
    digital_release: Option<String>,
    studio: Option<String>,
    collection: Option<CollectionRef>,
    #[serde(default)]
    certifications: Vec<CertificationResource>,
    #[serde(default)]
    recommendations: Vec<RecommendationResource>,
    youtube_trailer_id: Option<String>,
    homepage: Option<String>,
    popularity: Option<f32>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CollectionResource {
    name: String,
    overview: Option<String>,
    tmdb_id: i32,
    #[serde(default)]
    images: Vec<ImageResource>,
    #[serde(default)]
    parts: Vec<MovieResource>,
}

fn parse_date(value: Option<String>) -> Option<DateTime<Utc>> {
    let value = value?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
}

fn parse_status(value: Option<&str>) -> MovieStatus {
    match value.map(str::to_lowercase).as_deref() {
        Some("released") => MovieStatus::Released,
        Some("incinemas") | Some("in cinemas") => MovieStatus::InCinemas,
        Some("announced") => MovieStatus::Announced,
        Some("deleted") => MovieStatus::Deleted,
        _ => MovieStatus::Tba,
    }
}

impl MovieResource {
    fn into_metadata(self) -> MovieMetadata {
        let mut metadata = MovieMetadata::new(self.tmdb_id.to_string(), self.title, ItemType::Movie);
        metadata.tmdb_id = Some(self.tmdb_id);
        metadata.imdb_id = self.imdb_id.filter(|id| !id.is_empty());
        metadata.original_title = self.original_title;
        metadata.original_language = self
            .original_language
            .as_deref()
            .map(Language::from_iso_code)
            .unwrap_or_else(Language::english);
        metadata.overview = self.overview;
        metadata.year = self.year.filter(|y| *y > 0);
        metadata.runtime = self.runtime;
        metadata.images = self.images.into_iter().map(ImageResource::into_cover).collect();
        metadata.genres = self.genres;

        let mut ratings = Ratings::default();
        for rating in self.ratings {
            let child = Some(RatingChild {
                votes: rating.count,
                value: rating.value,
            });
            match rating.origin.to_lowercase().as_str() {
                "tmdb" => ratings.tmdb = child,
                "imdb" => ratings.imdb = child,
                "rottentomatoes" => ratings.rotten_tomatoes = child,
                _ => {}
            }
        }
        metadata.ratings = ratings;

        metadata.in_cinemas = parse_date(self.in_cinema);
        metadata.physical_release = parse_date(self.physical_release);
        metadata.digital_release = parse_date(self.digital_release);
        metadata.release_date = metadata
            .in_cinemas
            .or(metadata.digital_release)
            .or(metadata.physical_release);
        metadata.studio_title = self.studio;
        if let Some(collection) = self.collection {
            metadata.collection_tmdb_id = Some(collection.tmdb_id);
            metadata.collection_title = Some(collection.name);
        }
        metadata.certification = self
            .certifications
            .iter()
            .find(|c| c.country.eq_ignore_ascii_case("us"))
            .or_else(|| self.certifications.first())
            .map(|c| c.certification.clone());
        metadata.recommendations = self.recommendations.into_iter().map(|r| r.tmdb_id).collect();
        metadata.youtube_trailer_id = self.youtube_trailer_id;
        metadata.website = self.homepage;
        metadata.popularity = self.popularity;
        metadata.status = parse_status(self.status.as_deref());
        metadata.last_info_sync = Some(Utc::now());
        metadata.refresh_derived_titles();
        metadata
    }
}
