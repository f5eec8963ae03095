// SPDX-License-Identifier: GPL-3.0-or-later
use std::collections::HashSet;

use anyhow::Result;
use marquee_domain::{
    CollectionId, ExclusionId, ImportExclusion, Movie, MovieCollection, MovieFile, MovieFileId,
    MovieId, MovieMetadata,
    NamingConfig, ProfileId, ProviderId, QualityProfile, Studio, StudioId, Tag, TagId,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// Repository Traits
// ============================================================================

/// Generic repository for CRUD operations on a domain entity
#[async_trait::async_trait]
pub trait Repository<T, Id>: Send + Sync {
    async fn create(&self, entity: T) -> Result<T>;
    async fn get_by_id(&self, id: Id) -> Result<Option<T>>;
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<T>>;
    async fn update(&self, entity: T) -> Result<T>;
    async fn delete(&self, id: Id) -> Result<()>;
}

/// Library movies, always loaded together with their metadata row and file.
#[async_trait::async_trait]
pub trait MovieRepository: Repository<Movie, MovieId> {
    async fn list_all(&self) -> Result<Vec<Movie>>;
    async fn get_many(&self, ids: &[MovieId]) -> Result<Vec<Movie>>;
    async fn get_by_foreign_id(&self, foreign_id: &str) -> Result<Option<Movie>>;
    async fn get_by_collection_tmdb_id(&self, tmdb_id: i32) -> Result<Vec<Movie>>;
    async fn get_by_studio_foreign_id(&self, foreign_id: &str) -> Result<Vec<Movie>>;
    /// TMDB ids of every library movie whose metadata belongs to a collection.
    async fn all_tmdb_ids_with_collections(&self) -> Result<HashSet<i32>>;
    async fn update_many(&self, movies: Vec<Movie>) -> Result<Vec<Movie>>;
}

#[async_trait::async_trait]
pub trait MovieMetadataRepository: Send + Sync {
    /// Insert or update by foreign id; returns the stored row (with its persisted id).
    async fn upsert(&self, metadata: MovieMetadata) -> Result<MovieMetadata>;
    async fn get_by_foreign_id(&self, foreign_id: &str) -> Result<Option<MovieMetadata>>;
    async fn get_by_collection_tmdb_id(&self, tmdb_id: i32) -> Result<Vec<MovieMetadata>>;
    async fn get_with_collections(&self) -> Result<Vec<MovieMetadata>>;
}

#[async_trait::async_trait]
pub trait MovieFileRepository: Send + Sync {
    async fn create(&self, file: MovieFile) -> Result<MovieFile>;
    async fn get_by_id(&self, id: MovieFileId) -> Result<Option<MovieFile>>;
    async fn get_by_movie(&self, movie_id: MovieId) -> Result<Vec<MovieFile>>;
    async fn update(&self, file: MovieFile) -> Result<MovieFile>;
}

#[async_trait::async_trait]
pub trait CollectionRepository: Repository<MovieCollection, CollectionId> {
    async fn list_all(&self) -> Result<Vec<MovieCollection>>;
    async fn find_by_tmdb_id(&self, tmdb_id: i32) -> Result<Option<MovieCollection>>;
    async fn get_many(&self, ids: &[CollectionId]) -> Result<Vec<MovieCollection>>;
    /// Updates collections and movies in one transaction.
    async fn update_many_with_movies(
        &self,
        collections: Vec<MovieCollection>,
        movies: Vec<Movie>,
    ) -> Result<Vec<MovieCollection>>;
}

#[async_trait::async_trait]
pub trait StudioRepository: Repository<Studio, StudioId> {
    async fn list_all(&self) -> Result<Vec<Studio>>;
    async fn get_by_foreign_id(&self, foreign_id: &str) -> Result<Option<Studio>>;
}

#[async_trait::async_trait]
pub trait TagRepository: Send + Sync {
    async fn create(&self, tag: Tag) -> Result<Tag>;
    async fn list(&self) -> Result<Vec<Tag>>;
    async fn get_by_id(&self, id: TagId) -> Result<Option<Tag>>;
    async fn get_by_label(&self, label: &str) -> Result<Option<Tag>>;
}

/// Movies that list imports must skip, keyed by TMDB id.
#[async_trait::async_trait]
pub trait ImportExclusionRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<ImportExclusion>>;
    async fn tmdb_ids(&self) -> Result<HashSet<i32>>;
    /// Inserts, or keeps the stored row when the TMDB id is already excluded.
    async fn add(&self, exclusion: ImportExclusion) -> Result<ImportExclusion>;
    async fn delete(&self, id: ExclusionId) -> Result<bool>;
}

/// Quality profile repository
#[async_trait::async_trait]
pub trait QualityProfileRepository: Repository<QualityProfile, ProfileId> {
    async fn get_by_name(&self, name: &str) -> Result<Option<QualityProfile>>;
}

#[async_trait::async_trait]
pub trait NamingConfigRepository: Send + Sync {
    async fn get(&self) -> Result<NamingConfig>;
    async fn save(&self, config: NamingConfig) -> Result<NamingConfig>;
}

// ============================================================================
// Provider definitions
// ============================================================================

/// Persisted shape of an indexer / metadata / import list / download client definition.
/// `settings` belongs to the implementation, `extra` to the provider kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub id: ProviderId,
    pub kind: String,
    pub name: String,
    pub implementation: String,
    pub config_contract: String,
    pub enable: bool,
    pub tags: Vec<TagId>,
    pub settings: serde_json::Value,
    pub extra: serde_json::Value,
}

#[async_trait::async_trait]
pub trait ProviderRepository: Send + Sync {
    async fn list(&self, kind: &str) -> Result<Vec<ProviderRecord>>;
    async fn get(&self, kind: &str, id: ProviderId) -> Result<Option<ProviderRecord>>;
    async fn get_many(&self, kind: &str, ids: &[ProviderId]) -> Result<Vec<ProviderRecord>>;
    async fn get_by_name(&self, kind: &str, name: &str) -> Result<Option<ProviderRecord>>;
    async fn create(&self, record: ProviderRecord) -> Result<ProviderRecord>;
    async fn update(&self, record: ProviderRecord) -> Result<ProviderRecord>;
    async fn delete_many(&self, kind: &str, ids: &[ProviderId]) -> Result<u64>;
}

// ============================================================================
// Index preferences
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFilterRecord {
    pub id: String,
    pub section: String,
    pub label: String,
    pub filters: serde_json::Value,
}

#[async_trait::async_trait]
pub trait IndexPreferencesRepository: Send + Sync {
    async fn get(&self, section: &str) -> Result<Option<serde_json::Value>>;
    async fn save(&self, section: &str, preferences: serde_json::Value) -> Result<()>;
    async fn list_custom_filters(&self, section: &str) -> Result<Vec<CustomFilterRecord>>;
    async fn save_custom_filter(&self, filter: CustomFilterRecord) -> Result<CustomFilterRecord>;
    async fn delete_custom_filter(&self, id: &str) -> Result<()>;
}
