// SPDX-License-Identifier: GPL-3.0-or-later
//! Movie collections: resource mapping, edits, refresh from the metadata
//! source and realtime notifications.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use marquee_domain::{
    CollectionId, CollectionPayload, DomainEvent, MediaCover, MinimumAvailability, Movie,
    MovieCollection, MovieMetadata, ProfileId, Ratings, TagId, Validate, ValidationError,
};
use marquee_infrastructure::repositories::{
    CollectionRepository, ImportExclusionRepository, MovieMetadataRepository, MovieRepository,
    NamingConfigRepository, Repository,
};
use marquee_realtime::{ModelAction, RealtimeHub, ResourceChange};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::commands::{Command, CommandPriority, CommandQueue, CommandTrigger};
use crate::events::{EventHandler, EventPublisher, LibraryEvent};
use crate::library::join_validation;
use crate::metadata_source::{MetadataSource, MetadataSourceError};
use crate::naming::{FileNameBuilder, NamingError};

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("collection {0} not found")]
    NotFound(String),
    #[error("validation failed: {}", join_validation(.0))]
    Validation(Vec<ValidationError>),
    #[error(transparent)]
    Metadata(#[from] MetadataSourceError),
    #[error(transparent)]
    Naming(#[from] NamingError),
    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMovieResource {
    pub tmdb_id: Option<i32>,
    pub imdb_id: Option<String>,
    pub title: String,
    pub clean_title: Option<String>,
    pub sort_title: Option<String>,
    pub overview: Option<String>,
    pub runtime: i32,
    pub images: Vec<MediaCover>,
    pub year: Option<i32>,
    pub ratings: Ratings,
    pub genres: Vec<String>,
    pub folder: Option<String>,
    pub is_existing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResource {
    pub id: CollectionId,
    pub tmdb_id: i32,
    pub title: String,
    pub sort_title: String,
    pub overview: Option<String>,
    pub monitored: bool,
    pub quality_profile_id: Option<ProfileId>,
    pub root_folder_path: Option<String>,
    pub search_on_add: bool,
    pub minimum_availability: MinimumAvailability,
    #[serde(default)]
    pub tags: Vec<TagId>,
    #[serde(default)]
    pub images: Vec<MediaCover>,
    pub added: DateTime<Utc>,
    #[serde(default)]
    pub movies: Vec<CollectionMovieResource>,
    #[serde(default)]
    pub missing_movies: usize,
}

/// Bulk edit; `root_folder_path` is ignored when blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionBulkUpdate {
    pub collection_ids: Vec<CollectionId>,
    pub monitored: Option<bool>,
    pub monitor_movies: Option<bool>,
    pub quality_profile_id: Option<ProfileId>,
    pub root_folder_path: Option<String>,
    pub minimum_availability: Option<MinimumAvailability>,
    pub search_on_add: Option<bool>,
}

/// Turns stored collections into API resources.
#[derive(Clone)]
pub struct CollectionMapper {
    movies: Arc<dyn MovieRepository>,
    metadata: Arc<dyn MovieMetadataRepository>,
    naming: Arc<dyn NamingConfigRepository>,
}

impl CollectionMapper {
    pub fn new(
        movies: Arc<dyn MovieRepository>,
        metadata: Arc<dyn MovieMetadataRepository>,
        naming: Arc<dyn NamingConfigRepository>,
    ) -> Self {
        Self {
            movies,
            metadata,
            naming,
        }
    }

    fn movie_resource(
        builder: &FileNameBuilder,
        metadata: MovieMetadata,
        existing: &HashSet<i32>,
    ) -> CollectionMovieResource {
        let is_existing = metadata.tmdb_id.is_some_and(|id| existing.contains(&id));
        let folder = match builder.build_movie_folder(&Movie::new(metadata.clone())) {
            Ok(folder) => Some(folder),
            Err(error) => {
                debug!(target: "application", title = %metadata.title, %error, "no folder for collection movie");
                None
            }
        };
        CollectionMovieResource {
            tmdb_id: metadata.tmdb_id,
            imdb_id: metadata.imdb_id,
            title: metadata.title,
            clean_title: metadata.clean_title,
            sort_title: metadata.sort_title,
            overview: metadata.overview,
            runtime: metadata.runtime,
            images: metadata.images,
            year: metadata.year,
            ratings: metadata.ratings,
            genres: metadata.genres,
            folder,
            is_existing,
        }
    }

    fn resource(
        builder: &FileNameBuilder,
        collection: MovieCollection,
        parts: Vec<MovieMetadata>,
        existing: &HashSet<i32>,
    ) -> CollectionResource {
        let movies: Vec<_> = parts
            .into_iter()
            .map(|m| Self::movie_resource(builder, m, existing))
            .collect();
        let missing_movies = movies.iter().filter(|m| !m.is_existing).count();
        CollectionResource {
            id: collection.id,
            tmdb_id: collection.tmdb_id,
            title: collection.title,
            sort_title: collection.sort_title,
            overview: collection.overview,
            monitored: collection.monitored,
            quality_profile_id: collection.quality_profile_id,
            root_folder_path: collection.root_folder_path,
            search_on_add: collection.search_on_add,
            minimum_availability: collection.minimum_availability,
            tags: collection.tags,
            images: collection.images,
            added: collection.added,
            movies,
            missing_movies,
        }
    }

    pub async fn map_one(&self, collection: MovieCollection) -> Result<CollectionResource, CollectionError> {
        let builder = FileNameBuilder::new(self.naming.get().await?);
        let parts = self.metadata.get_by_collection_tmdb_id(collection.tmdb_id).await?;
        let existing: HashSet<i32> = self
            .movies
            .get_by_collection_tmdb_id(collection.tmdb_id)
            .await?
            .into_iter()
            .filter_map(|m| m.metadata.tmdb_id)
            .collect();
        Ok(Self::resource(&builder, collection, parts, &existing))
    }

    /// Loads collection metadata once and groups it per collection.
    pub async fn map_many(
        &self,
        collections: Vec<MovieCollection>,
    ) -> Result<Vec<CollectionResource>, CollectionError> {
        let builder = FileNameBuilder::new(self.naming.get().await?);
        let existing = self.movies.all_tmdb_ids_with_collections().await?;
        let mut grouped: HashMap<i32, Vec<MovieMetadata>> = HashMap::new();
        for metadata in self.metadata.get_with_collections().await? {
            if let Some(tmdb_id) = metadata.collection_tmdb_id {
                grouped.entry(tmdb_id).or_default().push(metadata);
            }
        }
        Ok(collections
            .into_iter()
            .map(|c| {
                let parts = grouped.remove(&c.tmdb_id).unwrap_or_default();
                Self::resource(&builder, c, parts, &existing)
            })
            .collect())
    }
}

#[derive(Clone)]
pub struct CollectionService {
    collections: Arc<dyn CollectionRepository>,
    movies: Arc<dyn MovieRepository>,
    metadata: Arc<dyn MovieMetadataRepository>,
    exclusions: Arc<dyn ImportExclusionRepository>,
    source: Arc<dyn MetadataSource>,
    mapper: CollectionMapper,
    events: Arc<dyn EventPublisher>,
    queue: Arc<CommandQueue>,
}

impl CollectionService {
    pub fn new(
        collections: Arc<dyn CollectionRepository>,
        movies: Arc<dyn MovieRepository>,
        metadata: Arc<dyn MovieMetadataRepository>,
        naming: Arc<dyn NamingConfigRepository>,
        exclusions: Arc<dyn ImportExclusionRepository>,
        source: Arc<dyn MetadataSource>,
        events: Arc<dyn EventPublisher>,
        queue: Arc<CommandQueue>,
    ) -> Self {
        Self {
            mapper: CollectionMapper::new(movies.clone(), metadata.clone(), naming),
            collections,
            movies,
            metadata,
            exclusions,
            source,
            events,
            queue,
        }
    }

    pub fn mapper(&self) -> &CollectionMapper {
        &self.mapper
    }

    async fn publish(&self, name: &'static str, collection: MovieCollection) {
        let event = DomainEvent::new(name, CollectionPayload { collection });
        let event = match name {
            "collection.added" => LibraryEvent::CollectionAdded(event),
            "collection.deleted" => LibraryEvent::CollectionDeleted(event),
            _ => LibraryEvent::CollectionEdited(event),
        };
        self.events.publish(event).await;
    }

    async fn find(&self, id: CollectionId) -> Result<MovieCollection, CollectionError> {
        self.collections
            .get_by_id(id)
            .await?
            .ok_or_else(|| CollectionError::NotFound(id.to_string()))
    }

    /// One collection by TMDB id, or all of them.
    pub async fn get_collections(
        &self,
        tmdb_id: Option<i32>,
    ) -> Result<Vec<CollectionResource>, CollectionError> {
        match tmdb_id {
            Some(tmdb_id) => match self.collections.find_by_tmdb_id(tmdb_id).await? {
                Some(collection) => Ok(vec![self.mapper.map_one(collection).await?]),
                None => Ok(Vec::new()),
            },
            None => self.mapper.map_many(self.collections.list_all().await?).await,
        }
    }

    pub async fn get_collection(&self, id: CollectionId) -> Result<CollectionResource, CollectionError> {
        let collection = self.find(id).await?;
        self.mapper.map_one(collection).await
    }

    #[instrument(skip(self, resource), fields(collection_id = %id))]
    pub async fn update_collection(
        &self,
        id: CollectionId,
        resource: CollectionResource,
    ) -> Result<CollectionResource, CollectionError> {
        let mut collection = self.find(id).await?;
        collection.monitored = resource.monitored;
        collection.quality_profile_id = resource.quality_profile_id;
        collection.root_folder_path = resource.root_folder_path.filter(|p| !p.trim().is_empty());
        collection.search_on_add = resource.search_on_add;
        collection.minimum_availability = resource.minimum_availability;
        collection.tags = resource.tags;
        collection.validate().map_err(CollectionError::Validation)?;

        let collection = self.collections.update(collection).await?;
        info!(target: "application", collection_id = %collection.id, monitored = collection.monitored, "collection updated");
        self.publish("collection.edited", collection.clone()).await;
        self.mapper.map_one(collection).await
    }

    pub async fn update_collections(
        &self,
        bulk: CollectionBulkUpdate,
    ) -> Result<Vec<CollectionResource>, CollectionError> {
        let mut collections = self.collections.get_many(&bulk.collection_ids).await?;
        let mut errors = Vec::new();
        for collection in &mut collections {
            if let Some(monitored) = bulk.monitored {
                collection.monitored = monitored;
            }
            if let Some(profile) = bulk.quality_profile_id {
                collection.quality_profile_id = Some(profile);
            }
            if let Some(root) = bulk.root_folder_path.as_deref().filter(|p| !p.trim().is_empty()) {
                collection.root_folder_path = Some(root.to_string());
            }
            if let Some(availability) = bulk.minimum_availability {
                collection.minimum_availability = availability;
            }
            if let Some(search) = bulk.search_on_add {
                collection.search_on_add = search;
            }
            if let Err(failures) = collection.validate() {
                errors.extend(failures);
            }
        }
        if !errors.is_empty() {
            return Err(CollectionError::Validation(errors));
        }

        let mut movies = Vec::new();
        if let Some(monitor) = bulk.monitor_movies {
            for collection in &collections {
                let mut parts = self.movies.get_by_collection_tmdb_id(collection.tmdb_id).await?;
                for movie in &mut parts {
                    movie.monitored = monitor;
                }
                debug!(target: "application", tmdb_id = collection.tmdb_id, count = parts.len(), monitor, "set monitoring on collection movies");
                movies.extend(parts);
            }
        }

        let updated = self.collections.update_many_with_movies(collections, movies).await?;
        for collection in &updated {
            self.publish("collection.edited", collection.clone()).await;
        }
        info!(target: "application", count = updated.len(), "collections bulk updated");

        self.queue
            .push(
                Command::RefreshCollections {
                    collection_ids: updated.iter().map(|c| c.id).collect(),
                },
                CommandPriority::Normal,
                CommandTrigger::Manual,
            )
            .await;
        self.mapper.map_many(updated).await
    }

    /// Adds a collection unless one with the same TMDB id exists.
    pub async fn add_collection(&self, collection: MovieCollection) -> Result<MovieCollection, CollectionError> {
        if let Some(existing) = self.collections.find_by_tmdb_id(collection.tmdb_id).await? {
            return Ok(existing);
        }
        collection.validate().map_err(CollectionError::Validation)?;
        let collection = self.collections.create(collection).await?;
        info!(target: "application", collection_id = %collection.id, tmdb_id = collection.tmdb_id, "collection added");
        self.publish("collection.added", collection.clone()).await;
        Ok(collection)
    }

    pub async fn delete_collection(&self, id: CollectionId) -> Result<(), CollectionError> {
        let collection = self.find(id).await?;
        self.collections.delete(id).await?;
        info!(target: "application", collection_id = %id, "collection deleted");
        self.publish("collection.deleted", collection).await;
        Ok(())
    }

    /// Pulls fresh collection info and adds missing movies for monitored
    /// collections. An empty id list refreshes everything.
    pub async fn refresh_collections(&self, ids: &[CollectionId]) -> Result<usize, CollectionError> {
        let collections = if ids.is_empty() {
            self.collections.list_all().await?
        } else {
            self.collections.get_many(ids).await?
        };

        let mut refreshed = 0;
        for mut collection in collections {
            self.source.evict_collection(collection.tmdb_id);
            let info = match self.source.get_collection_info(collection.tmdb_id).await {
                Ok(info) => info,
                Err(MetadataSourceError::NotFound(_)) => {
                    warn!(target: "application", tmdb_id = collection.tmdb_id, "collection no longer exists on the metadata source");
                    continue;
                }
                Err(error) => return Err(error.into()),
            };

            collection.rename(info.title.clone());
            collection.overview = info.overview;
            collection.images = info.images;
            collection.last_info_sync = Some(Utc::now());

            let mut parts = Vec::with_capacity(info.parts.len());
            for mut part in info.parts {
                part.collection_tmdb_id = Some(collection.tmdb_id);
                part.collection_title = Some(info.title.clone());
                parts.push(self.metadata.upsert(part).await?);
            }

            let collection = self.collections.update(collection).await?;
            if collection.monitored {
                self.add_missing_movies(&collection, parts).await?;
            }
            self.publish("collection.edited", collection).await;
            refreshed += 1;
        }
        info!(target: "application", refreshed, "collections refreshed");
        Ok(refreshed)
    }

    async fn add_missing_movies(
        &self,
        collection: &MovieCollection,
        parts: Vec<MovieMetadata>,
    ) -> Result<(), CollectionError> {
        let Some(root) = collection.root_folder_path.as_deref() else {
            warn!(target: "application", tmdb_id = collection.tmdb_id, "monitored collection has no root folder");
            return Ok(());
        };
        let builder = FileNameBuilder::new(self.mapper.naming.get().await?);
        let existing: HashSet<String> = self
            .movies
            .get_by_collection_tmdb_id(collection.tmdb_id)
            .await?
            .into_iter()
            .map(|m| m.metadata.foreign_id)
            .collect();
        let excluded = self.exclusions.tmdb_ids().await?;

        for metadata in parts.into_iter().filter(|m| !existing.contains(&m.foreign_id)) {
            if metadata.tmdb_id.is_some_and(|id| excluded.contains(&id)) {
                debug!(target: "application", title = %metadata.title, "collection movie is excluded from imports");
                continue;
            }
            let mut movie = Movie::new(metadata);
            movie.monitored = true;
            movie.quality_profile_id = collection.quality_profile_id;
            movie.minimum_availability = collection.minimum_availability;
            movie.tags = collection.tags.clone();
            movie.root_folder_path = Some(root.to_string());
            let folder = builder.build_movie_folder(&movie)?;
            movie.path = Some(Path::new(root).join(folder).to_string_lossy().into_owned());
            let movie = self.movies.create(movie).await?;
            info!(target: "application", movie_id = %movie.id, title = %movie.metadata.title, "added movie from collection");
        }
        Ok(())
    }
}

/// Forwards library events to realtime clients.
pub struct LibraryBroadcaster {
    hub: Arc<dyn RealtimeHub>,
    mapper: CollectionMapper,
}

impl LibraryBroadcaster {
    pub fn new(hub: Arc<dyn RealtimeHub>, mapper: CollectionMapper) -> Self {
        Self { hub, mapper }
    }

    async fn collection_change(&self, action: ModelAction, collection: &MovieCollection) -> ResourceChange {
        if action == ModelAction::Deleted {
            return ResourceChange::new("collection", action, Some(json!({ "id": collection.id })));
        }
        let resource = match self.mapper.map_one(collection.clone()).await {
            Ok(resource) => serde_json::to_value(resource).ok(),
            Err(error) => {
                warn!(target: "realtime", collection_id = %collection.id, %error, "failed to map collection");
                None
            }
        };
        ResourceChange::new("collection", action, resource)
    }
}

#[async_trait::async_trait]
impl EventHandler for LibraryBroadcaster {
    async fn handle(&self, event: &LibraryEvent) {
        let change = match event {
            LibraryEvent::CollectionAdded(e) => {
                self.collection_change(ModelAction::Created, &e.payload.collection).await
            }
            LibraryEvent::CollectionEdited(e) => {
                self.collection_change(ModelAction::Updated, &e.payload.collection).await
            }
            LibraryEvent::CollectionDeleted(e) => {
                self.collection_change(ModelAction::Deleted, &e.payload.collection).await
            }
            LibraryEvent::MovieAdded(e) => {
                ResourceChange::new("movie", ModelAction::Created, serde_json::to_value(&e.payload).ok())
            }
            LibraryEvent::MovieUpdated(e) => {
                ResourceChange::new("movie", ModelAction::Updated, serde_json::to_value(&e.payload).ok())
            }
            LibraryEvent::MovieDeleted(e) => ResourceChange::new(
                "movie",
                ModelAction::Deleted,
                Some(json!({ "id": e.payload.movie_id })),
            ),
        };
        self.hub.publish(&change).await;
    }
}
