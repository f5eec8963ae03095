// SPDX-License-Identifier: GPL-3.0-or-later
//! Movie, scene and studio listings backed by the index query engine.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use marquee_domain::{
    sort_title, DomainEvent, ImportExclusion, ItemType, MinimumAvailability, Movie, MovieId,
    MovieUpdatedPayload, ProfileId, QualityProfile, Studio, StudioId, TagId, Validate,
    ValidationError,
};
use marquee_infrastructure::repositories::{
    ImportExclusionRepository, MovieRepository, QualityProfileRepository, Repository,
    StudioRepository,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::events::{EventPublisher, LibraryEvent};
use crate::index::{
    apply_filters_at, filter_options, jump_bar, sort_items, FilterOption, IndexError, IndexItem,
    IndexPreferencesService, IndexSection, JumpBar, PropertyFilter, PropertyValue, SortDirection,
};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("validation failed: {}", join_validation(.0))]
    Validation(Vec<ValidationError>),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

pub(crate) fn join_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Index items
// ============================================================================

/// A library movie as seen by filters and sort predicates.
pub struct MovieIndexItem {
    pub movie: Movie,
    profile: Option<Arc<QualityProfile>>,
    now: DateTime<Utc>,
}

impl MovieIndexItem {
    pub fn new(movie: Movie, profile: Option<Arc<QualityProfile>>, now: DateTime<Utc>) -> Self {
        Self { movie, profile, now }
    }

    fn cutoff_not_met(&self) -> bool {
        match (&self.movie.movie_file, &self.profile) {
            (Some(file), Some(profile)) => !profile.cutoff_met(&file.quality),
            _ => false,
        }
    }
}

fn tag_list(tags: &[TagId]) -> PropertyValue {
    PropertyValue::List(tags.iter().map(ToString::to_string).collect())
}

impl IndexItem for MovieIndexItem {
    fn property(&self, key: &str) -> PropertyValue {
        let movie = &self.movie;
        let metadata = &movie.metadata;
        match key {
            "monitored" => PropertyValue::Bool(movie.monitored),
            "hasFile" => PropertyValue::Bool(movie.has_file()),
            "isAvailable" => PropertyValue::Bool(movie.is_available(self.now)),
            "qualityCutoffNotMet" => PropertyValue::Bool(self.cutoff_not_met()),
            "title" => PropertyValue::Text(metadata.title.clone()),
            "sortTitle" => PropertyValue::Text(
                metadata
                    .sort_title
                    .clone()
                    .unwrap_or_else(|| sort_title(&metadata.title)),
            ),
            "originalLanguage" => PropertyValue::Text(metadata.original_language.name.clone()),
            "status" | "sceneStatus" => PropertyValue::Text(metadata.status.as_str().to_string()),
            "studio" => PropertyValue::text(metadata.studio_title.as_deref()),
            "collection" => PropertyValue::List(metadata.collection_title.iter().cloned().collect()),
            "qualityProfileId" => {
                PropertyValue::text(movie.quality_profile_id.map(|p| p.to_string()).as_deref())
            }
            "added" => PropertyValue::Date(movie.added),
            "year" => PropertyValue::number(metadata.year),
            "releaseDate" => PropertyValue::date(metadata.release_date),
            "inCinemas" => PropertyValue::date(metadata.in_cinemas),
            "physicalRelease" => PropertyValue::date(metadata.physical_release),
            "digitalRelease" => PropertyValue::date(metadata.digital_release),
            "runtime" => PropertyValue::Number(metadata.runtime.into()),
            "path" => PropertyValue::text(movie.path.as_deref()),
            "sizeOnDisk" => PropertyValue::Number(movie.size_on_disk() as f64),
            "genres" => PropertyValue::List(metadata.genres.clone()),
            "popularity" => PropertyValue::number(metadata.popularity),
            "tmdbRating" => PropertyValue::number(metadata.ratings.tmdb.map(|r| r.value)),
            "tmdbVotes" => PropertyValue::number(metadata.ratings.tmdb.map(|r| r.votes as f64)),
            "rottenTomatoesRating" => {
                PropertyValue::number(metadata.ratings.rotten_tomatoes.map(|r| r.value))
            }
            "tags" => tag_list(&movie.tags),
            "itemType" => PropertyValue::Text(metadata.item_type.as_str().to_string()),
            _ => PropertyValue::Missing,
        }
    }

    fn sort_value(&self, key: &str) -> PropertyValue {
        let metadata = &self.movie.metadata;
        match key {
            "studio" => PropertyValue::Text(
                metadata
                    .studio_title
                    .as_deref()
                    .unwrap_or_default()
                    .to_lowercase(),
            ),
            "collection" => {
                PropertyValue::Text(metadata.collection_title.clone().unwrap_or_default())
            }
            "sceneStatus" => PropertyValue::Number(metadata.status.rank().into()),
            "tmdbRating" => PropertyValue::Number(metadata.ratings.tmdb.map_or(0.0, |r| r.value)),
            "rottenTomatoesRating" => {
                PropertyValue::Number(metadata.ratings.rotten_tomatoes.map_or(-1.0, |r| r.value))
            }
            _ => self.property(key),
        }
    }
}

pub struct StudioIndexItem(pub Studio);

impl IndexItem for StudioIndexItem {
    fn property(&self, key: &str) -> PropertyValue {
        let studio = &self.0;
        match key {
            "monitored" => PropertyValue::Bool(studio.monitored),
            "title" => PropertyValue::Text(studio.title.clone()),
            "sortTitle" => PropertyValue::Text(studio.sort_title.clone()),
            "network" => PropertyValue::text(studio.network.as_deref()),
            "added" => PropertyValue::Date(studio.added),
            "qualityProfileId" => {
                PropertyValue::text(studio.quality_profile_id.map(|p| p.to_string()).as_deref())
            }
            "rootFolderPath" => PropertyValue::text(studio.root_folder_path.as_deref()),
            "tags" => tag_list(&studio.tags),
            _ => PropertyValue::Missing,
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Listing parameters; anything left out falls back to the section's stored preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub section: Option<IndexSection>,
    pub sort_key: Option<String>,
    pub sort_direction: Option<SortDirection>,
    pub filter_key: Option<String>,
    pub item_type: Option<ItemType>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomQuery {
    pub section: Option<IndexSection>,
    #[serde(default)]
    pub filters: Vec<PropertyFilter>,
    pub sort_key: Option<String>,
    pub sort_direction: Option<SortDirection>,
    pub item_type: Option<ItemType>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub sort_key: String,
    pub sort_direction: SortDirection,
    pub jump_bar: JumpBar,
}

struct Resolved {
    filters: Vec<PropertyFilter>,
    sort_key: String,
    sort_direction: SortDirection,
    secondary_key: String,
    secondary_direction: SortDirection,
}

fn listing<T: IndexItem, U>(
    items: Vec<T>,
    resolved: Resolved,
    now: DateTime<Utc>,
    unwrap: impl Fn(T) -> U,
) -> Listing<U> {
    let mut items = apply_filters_at(items, &resolved.filters, now);
    sort_items(
        &mut items,
        &resolved.sort_key,
        resolved.sort_direction,
        &resolved.secondary_key,
        resolved.secondary_direction,
    );
    let jump_bar = jump_bar(&items, &resolved.sort_key, resolved.sort_direction);
    Listing {
        total: items.len(),
        items: items.into_iter().map(unwrap).collect(),
        sort_key: resolved.sort_key,
        sort_direction: resolved.sort_direction,
        jump_bar,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieUpdate {
    pub monitored: Option<bool>,
    pub quality_profile_id: Option<ProfileId>,
    pub minimum_availability: Option<MinimumAvailability>,
    pub path: Option<String>,
    pub root_folder_path: Option<String>,
    pub tags: Option<Vec<TagId>>,
}

/// How bulk-edited tags combine with the tags a movie already has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplyTags {
    #[default]
    Add,
    Remove,
    Replace,
}

impl ApplyTags {
    fn apply(self, current: &mut Vec<TagId>, tags: &[TagId]) {
        match self {
            Self::Add => {
                for tag in tags {
                    if !current.contains(tag) {
                        current.push(*tag);
                    }
                }
            }
            Self::Remove => current.retain(|tag| !tags.contains(tag)),
            Self::Replace => *current = tags.to_vec(),
        }
    }
}

/// Editor changes applied to every selected movie. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieBulkUpdate {
    pub movie_ids: Vec<MovieId>,
    pub monitored: Option<bool>,
    pub quality_profile_id: Option<ProfileId>,
    pub minimum_availability: Option<MinimumAvailability>,
    pub root_folder_path: Option<String>,
    pub tags: Option<Vec<TagId>>,
    #[serde(default)]
    pub apply_tags: ApplyTags,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieBulkDelete {
    pub movie_ids: Vec<MovieId>,
    #[serde(default)]
    pub add_import_exclusion: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioUpdate {
    pub monitored: Option<bool>,
    pub quality_profile_id: Option<ProfileId>,
    pub root_folder_path: Option<String>,
    pub tags: Option<Vec<TagId>>,
}

// ============================================================================
// Movie service
// ============================================================================

#[derive(Clone)]
pub struct MovieService {
    movies: Arc<dyn MovieRepository>,
    profiles: Arc<dyn QualityProfileRepository>,
    exclusions: Arc<dyn ImportExclusionRepository>,
    preferences: IndexPreferencesService,
    events: Arc<dyn EventPublisher>,
}

fn movie_payload(movie: &Movie) -> MovieUpdatedPayload {
    MovieUpdatedPayload {
        movie_id: movie.id,
        title: movie.metadata.title.clone(),
        monitored: movie.monitored,
    }
}

impl MovieService {
    pub fn new(
        movies: Arc<dyn MovieRepository>,
        profiles: Arc<dyn QualityProfileRepository>,
        exclusions: Arc<dyn ImportExclusionRepository>,
        preferences: IndexPreferencesService,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            movies,
            profiles,
            exclusions,
            preferences,
            events,
        }
    }

    async fn index_items(
        &self,
        item_type: Option<ItemType>,
        now: DateTime<Utc>,
    ) -> Result<Vec<MovieIndexItem>, LibraryError> {
        let profiles: HashMap<ProfileId, Arc<QualityProfile>> = self
            .profiles
            .list(i64::MAX, 0)
            .await?
            .into_iter()
            .map(|p| (p.id, Arc::new(p)))
            .collect();

        Ok(self
            .movies
            .list_all()
            .await?
            .into_iter()
            .filter(|m| item_type.map_or(true, |t| m.metadata.item_type == t))
            .map(|movie| {
                let profile = movie
                    .quality_profile_id
                    .and_then(|id| profiles.get(&id).cloned());
                MovieIndexItem::new(movie, profile, now)
            })
            .collect())
    }

    fn default_item_type(section: IndexSection) -> Option<ItemType> {
        match section {
            IndexSection::MovieIndex => Some(ItemType::Movie),
            IndexSection::SceneIndex => Some(ItemType::Scene),
            IndexSection::Studios => None,
        }
    }

    #[instrument(skip(self), fields(section = ?query.section))]
    pub async fn list(&self, query: ListQuery) -> Result<Listing<Movie>, LibraryError> {
        let section = query.section.unwrap_or(IndexSection::MovieIndex);
        let prefs = self.preferences.get(section).await?;

        let sort_key = query.sort_key.unwrap_or(prefs.sort_key);
        if !section.sort_keys().contains(&sort_key.as_str()) {
            return Err(IndexError::UnknownSortKey(sort_key).into());
        }
        let filter_key = query.filter_key.unwrap_or(prefs.selected_filter_key);
        let resolved = Resolved {
            filters: self.preferences.resolve_filters(section, &filter_key).await?,
            sort_key,
            sort_direction: query.sort_direction.unwrap_or(prefs.sort_direction),
            secondary_key: prefs.secondary_sort_key,
            secondary_direction: prefs.secondary_sort_direction,
        };

        let now = Utc::now();
        let item_type = query.item_type.or_else(|| Self::default_item_type(section));
        let items = self.index_items(item_type, now).await?;
        let result = listing(items, resolved, now, |item| item.movie);
        debug!(target: "application", %section, %filter_key, total = result.total, "listed movies");
        Ok(result)
    }

    /// Ad-hoc filtering with caller-supplied property filters.
    pub async fn query(&self, query: CustomQuery) -> Result<Listing<Movie>, LibraryError> {
        let section = query.section.unwrap_or(IndexSection::MovieIndex);
        let prefs = self.preferences.get(section).await?;
        let sort_key = query.sort_key.unwrap_or(prefs.sort_key);
        if !section.sort_keys().contains(&sort_key.as_str()) {
            return Err(IndexError::UnknownSortKey(sort_key).into());
        }
        let resolved = Resolved {
            filters: query.filters,
            sort_key,
            sort_direction: query.sort_direction.unwrap_or(prefs.sort_direction),
            secondary_key: prefs.secondary_sort_key,
            secondary_direction: prefs.secondary_sort_direction,
        };
        let now = Utc::now();
        let item_type = query.item_type.or_else(|| Self::default_item_type(section));
        let items = self.index_items(item_type, now).await?;
        Ok(listing(items, resolved, now, |item| item.movie))
    }

    pub async fn filter_options(
        &self,
        section: IndexSection,
        prop: &str,
    ) -> Result<Vec<FilterOption>, LibraryError> {
        if !matches!(prop, "studio" | "collection" | "originalLanguage" | "genres") {
            return Err(IndexError::UnknownFilterProperty(prop.to_string()).into());
        }
        let items = self
            .index_items(Self::default_item_type(section), Utc::now())
            .await?;
        Ok(filter_options(&items, prop))
    }

    pub async fn get(&self, id: MovieId) -> Result<Movie, LibraryError> {
        self.movies
            .get_by_id(id)
            .await?
            .ok_or_else(|| LibraryError::NotFound(format!("movie {id}")))
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, id: MovieId, update: MovieUpdate) -> Result<Movie, LibraryError> {
        let mut movie = self.get(id).await?;
        if let Some(monitored) = update.monitored {
            movie.monitored = monitored;
        }
        if let Some(profile) = update.quality_profile_id {
            movie.quality_profile_id = Some(profile);
        }
        if let Some(availability) = update.minimum_availability {
            movie.minimum_availability = availability;
        }
        if let Some(path) = update.path {
            movie.path = Some(path);
        }
        if let Some(root) = update.root_folder_path {
            movie.root_folder_path = Some(root);
        }
        if let Some(tags) = update.tags {
            movie.tags = tags;
        }
        movie.validate().map_err(LibraryError::Validation)?;

        let movie = self.movies.update(movie).await?;
        self.events
            .publish(LibraryEvent::MovieUpdated(DomainEvent::new(
                "movie.updated",
                movie_payload(&movie),
            )))
            .await;
        info!(target: "application", movie_id = %movie.id, "movie updated");
        Ok(movie)
    }

    async fn load_selection(&self, ids: &[MovieId]) -> Result<Vec<Movie>, LibraryError> {
        let movies = self.movies.get_many(ids).await?;
        let found: HashSet<MovieId> = movies.iter().map(|m| m.id).collect();
        if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
            return Err(LibraryError::NotFound(format!("movie {missing}")));
        }
        Ok(movies)
    }

    /// Applies one editor change to every selected movie. Nothing is written
    /// unless all of them validate. Files are not moved when the root folder
    /// changes; only the stored paths follow it.
    #[instrument(skip(self, update), fields(count = update.movie_ids.len()))]
    pub async fn bulk_update(&self, update: MovieBulkUpdate) -> Result<Vec<Movie>, LibraryError> {
        let mut movies = self.load_selection(&update.movie_ids).await?;
        let mut errors = Vec::new();
        if update
            .root_folder_path
            .as_deref()
            .is_some_and(|root| root.trim().is_empty())
        {
            errors.push(ValidationError {
                field: "root_folder_path",
                message: "root folder cannot be empty when provided".into(),
            });
        }

        for movie in &mut movies {
            if let Some(monitored) = update.monitored {
                movie.monitored = monitored;
            }
            if let Some(profile) = update.quality_profile_id {
                movie.quality_profile_id = Some(profile);
            }
            if let Some(availability) = update.minimum_availability {
                movie.minimum_availability = availability;
            }
            if let Some(root) = update.root_folder_path.as_deref() {
                let folder = movie
                    .path
                    .as_deref()
                    .and_then(|path| Path::new(path).file_name())
                    .map(|name| name.to_string_lossy().into_owned());
                if let Some(folder) = folder {
                    movie.path = Some(Path::new(root).join(folder).to_string_lossy().into_owned());
                }
                movie.root_folder_path = Some(root.to_string());
            }
            if let Some(tags) = &update.tags {
                update.apply_tags.apply(&mut movie.tags, tags);
            }
            if let Err(mut invalid) = movie.validate() {
                errors.append(&mut invalid);
            }
        }
        if !errors.is_empty() {
            return Err(LibraryError::Validation(errors));
        }

        let movies = self.movies.update_many(movies).await?;
        for movie in &movies {
            self.events
                .publish(LibraryEvent::MovieUpdated(DomainEvent::new(
                    "movie.updated",
                    movie_payload(movie),
                )))
                .await;
        }
        info!(target: "application", count = movies.len(), "movies edited");
        Ok(movies)
    }

    async fn remove(&self, movie: &Movie, add_import_exclusion: bool) -> Result<(), LibraryError> {
        if add_import_exclusion {
            match movie.metadata.tmdb_id {
                Some(tmdb_id) => {
                    self.exclusions
                        .add(ImportExclusion::new(
                            tmdb_id,
                            movie.metadata.title.clone(),
                            movie.metadata.year,
                        ))
                        .await?;
                }
                None => {
                    debug!(target: "application", movie_id = %movie.id, "no tmdb id to exclude");
                }
            }
        }
        self.movies.delete(movie.id).await?;
        self.events
            .publish(LibraryEvent::MovieDeleted(DomainEvent::new(
                "movie.deleted",
                movie_payload(movie),
            )))
            .await;
        Ok(())
    }

    pub async fn delete(&self, id: MovieId, add_import_exclusion: bool) -> Result<(), LibraryError> {
        let movie = self.get(id).await?;
        self.remove(&movie, add_import_exclusion).await?;
        info!(target: "application", movie_id = %id, add_import_exclusion, "movie deleted");
        Ok(())
    }

    #[instrument(skip(self, request), fields(count = request.movie_ids.len()))]
    pub async fn bulk_delete(&self, request: MovieBulkDelete) -> Result<usize, LibraryError> {
        let movies = self.load_selection(&request.movie_ids).await?;
        for movie in &movies {
            self.remove(movie, request.add_import_exclusion).await?;
        }
        info!(
            target: "application",
            count = movies.len(),
            add_import_exclusion = request.add_import_exclusion,
            "movies deleted"
        );
        Ok(movies.len())
    }
}

// ============================================================================
// Studio service
// ============================================================================

#[derive(Clone)]
pub struct StudioService {
    studios: Arc<dyn StudioRepository>,
    preferences: IndexPreferencesService,
}

impl StudioService {
    pub fn new(studios: Arc<dyn StudioRepository>, preferences: IndexPreferencesService) -> Self {
        Self {
            studios,
            preferences,
        }
    }

    pub async fn list(&self, query: ListQuery) -> Result<Listing<Studio>, LibraryError> {
        let section = IndexSection::Studios;
        let prefs = self.preferences.get(section).await?;

        let sort_key = query.sort_key.unwrap_or(prefs.sort_key);
        if !section.sort_keys().contains(&sort_key.as_str()) {
            return Err(IndexError::UnknownSortKey(sort_key).into());
        }
        let filter_key = query.filter_key.unwrap_or(prefs.selected_filter_key);
        let resolved = Resolved {
            filters: self.preferences.resolve_filters(section, &filter_key).await?,
            sort_key,
            sort_direction: query.sort_direction.unwrap_or(prefs.sort_direction),
            secondary_key: prefs.secondary_sort_key,
            secondary_direction: prefs.secondary_sort_direction,
        };

        let items: Vec<StudioIndexItem> = self
            .studios
            .list_all()
            .await?
            .into_iter()
            .map(StudioIndexItem)
            .collect();
        Ok(listing(items, resolved, Utc::now(), |item| item.0))
    }

    pub async fn filter_options(&self, prop: &str) -> Result<Vec<FilterOption>, LibraryError> {
        if prop != "network" {
            return Err(IndexError::UnknownFilterProperty(prop.to_string()).into());
        }
        let items: Vec<StudioIndexItem> = self
            .studios
            .list_all()
            .await?
            .into_iter()
            .map(StudioIndexItem)
            .collect();
        Ok(filter_options(&items, prop))
    }

    pub async fn get(&self, id: StudioId) -> Result<Studio, LibraryError> {
        self.studios
            .get_by_id(id)
            .await?
            .ok_or_else(|| LibraryError::NotFound(format!("studio {id}")))
    }

    pub async fn update(&self, id: StudioId, update: StudioUpdate) -> Result<Studio, LibraryError> {
        let mut studio = self.get(id).await?;
        if let Some(monitored) = update.monitored {
            studio.monitored = monitored;
        }
        if let Some(profile) = update.quality_profile_id {
            studio.quality_profile_id = Some(profile);
        }
        if let Some(root) = update.root_folder_path {
            studio.root_folder_path = Some(root);
        }
        if let Some(tags) = update.tags {
            studio.tags = tags;
        }
        studio.validate().map_err(LibraryError::Validation)?;
        let studio = self.studios.update(studio).await?;
        info!(target: "application", studio_id = %studio.id, "studio updated");
        Ok(studio)
    }
}
