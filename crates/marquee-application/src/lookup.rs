// SPDX-License-Identifier: GPL-3.0-or-later
//! Searching the metadata source for new movies, adding them to the
//! library, and the import exclusion list consulted along the way.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use marquee_domain::{
    DomainEvent, ExclusionId, ImportExclusion, ItemType, MediaCover, MinimumAvailability, Movie,
    MovieId, MovieMetadata, MovieStatus, MovieUpdatedPayload, ProfileId, Ratings, TagId, Validate,
    ValidationError,
};
use marquee_infrastructure::repositories::{
    ImportExclusionRepository, MovieRepository, NamingConfigRepository, Repository,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::commands::{Command, CommandPriority, CommandQueue, CommandTrigger};
use crate::events::{EventPublisher, LibraryEvent};
use crate::library::join_validation;
use crate::metadata_source::{MetadataSource, MetadataSourceError};
use crate::naming::{FileNameBuilder, NamingError};

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("{0} not found")]
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

/// A search hit annotated with what the library already knows about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieLookupResource {
    pub tmdb_id: Option<i32>,
    pub imdb_id: Option<String>,
    pub title: String,
    pub sort_title: Option<String>,
    pub original_title: Option<String>,
    pub year: Option<i32>,
    pub overview: Option<String>,
    pub studio: Option<String>,
    pub status: MovieStatus,
    pub item_type: ItemType,
    pub runtime: i32,
    pub certification: Option<String>,
    pub genres: Vec<String>,
    pub images: Vec<MediaCover>,
    pub ratings: Ratings,
    /// Folder name the movie has, or would get under the current naming config.
    pub folder: Option<String>,
    pub existing_movie_id: Option<MovieId>,
    pub is_existing_movie: bool,
    pub is_exclusion_movie: bool,
    pub monitored: bool,
    pub has_file: bool,
    pub is_available: bool,
}

fn monitored_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMovieRequest {
    pub tmdb_id: i32,
    pub root_folder_path: String,
    pub quality_profile_id: Option<ProfileId>,
    #[serde(default = "monitored_by_default")]
    pub monitored: bool,
    #[serde(default)]
    pub minimum_availability: MinimumAvailability,
    #[serde(default)]
    pub tags: Vec<TagId>,
}

/// `tmdb:603` and `tmdbid:603` look a single movie up by id; anything else
/// is a title search.
fn tmdb_id_term(term: &str) -> Option<i32> {
    let (prefix, id) = term.split_once(':')?;
    if !matches!(prefix.trim().to_ascii_lowercase().as_str(), "tmdb" | "tmdbid") {
        return None;
    }
    id.trim().parse().ok().filter(|id| *id > 0)
}

#[derive(Clone)]
pub struct MovieLookupService {
    movies: Arc<dyn MovieRepository>,
    exclusions: Arc<dyn ImportExclusionRepository>,
    naming: Arc<dyn NamingConfigRepository>,
    source: Arc<dyn MetadataSource>,
    events: Arc<dyn EventPublisher>,
    queue: Arc<CommandQueue>,
}

impl MovieLookupService {
    pub fn new(
        movies: Arc<dyn MovieRepository>,
        exclusions: Arc<dyn ImportExclusionRepository>,
        naming: Arc<dyn NamingConfigRepository>,
        source: Arc<dyn MetadataSource>,
        events: Arc<dyn EventPublisher>,
        queue: Arc<CommandQueue>,
    ) -> Self {
        Self {
            movies,
            exclusions,
            naming,
            source,
            events,
            queue,
        }
    }

    async fn library_by_tmdb_id(&self) -> Result<HashMap<i32, Movie>, LookupError> {
        Ok(self
            .movies
            .list_all()
            .await?
            .into_iter()
            .filter_map(|movie| movie.metadata.tmdb_id.map(|id| (id, movie)))
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn lookup(&self, term: &str) -> Result<Vec<MovieLookupResource>, LookupError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let hits = match tmdb_id_term(term) {
            Some(tmdb_id) => match self.source.get_movie_info(tmdb_id).await {
                Ok(metadata) => vec![metadata],
                Err(MetadataSourceError::NotFound(_)) => Vec::new(),
                Err(error) => return Err(error.into()),
            },
            None => self.source.search_movies(term).await?,
        };

        let library = self.library_by_tmdb_id().await?;
        let excluded = self.exclusions.tmdb_ids().await?;
        let builder = FileNameBuilder::new(self.naming.get().await?);
        let resources: Vec<_> = hits
            .into_iter()
            .map(|metadata| Self::resource(&builder, metadata, &library, &excluded))
            .collect();
        debug!(target: "application", term, hits = resources.len(), "movie lookup");
        Ok(resources)
    }

    fn resource(
        builder: &FileNameBuilder,
        metadata: MovieMetadata,
        library: &HashMap<i32, Movie>,
        excluded: &HashSet<i32>,
    ) -> MovieLookupResource {
        let existing = metadata.tmdb_id.and_then(|id| library.get(&id));
        let is_exclusion_movie = metadata.tmdb_id.is_some_and(|id| excluded.contains(&id));
        let existing_folder = existing
            .and_then(|movie| movie.path.as_deref())
            .and_then(|path| Path::new(path).file_name())
            .map(|name| name.to_string_lossy().into_owned());
        let candidate = Movie::new(metadata.clone());
        let folder = existing_folder.or_else(|| match builder.build_movie_folder(&candidate) {
            Ok(folder) => Some(folder),
            Err(error) => {
                debug!(target: "application", title = %metadata.title, %error, "no folder for lookup result");
                None
            }
        });
        let now = Utc::now();

        MovieLookupResource {
            tmdb_id: metadata.tmdb_id,
            imdb_id: metadata.imdb_id,
            title: metadata.title,
            sort_title: metadata.sort_title,
            original_title: metadata.original_title,
            year: metadata.year,
            overview: metadata.overview,
            studio: metadata.studio_title,
            status: metadata.status,
            item_type: metadata.item_type,
            runtime: metadata.runtime,
            certification: metadata.certification,
            genres: metadata.genres,
            images: metadata.images,
            ratings: metadata.ratings,
            folder,
            existing_movie_id: existing.map(|movie| movie.id),
            is_existing_movie: existing.is_some(),
            is_exclusion_movie,
            monitored: existing.is_some_and(|movie| movie.monitored),
            has_file: existing.is_some_and(Movie::has_file),
            is_available: existing.unwrap_or(&candidate).is_available(now),
        }
    }

    /// Adds a movie found through [`MovieLookupService::lookup`] and queues
    /// a refresh for it. Excluded movies may still be added by hand.
    #[instrument(skip(self, request), fields(tmdb_id = request.tmdb_id))]
    pub async fn add_movie(&self, request: AddMovieRequest) -> Result<Movie, LookupError> {
        let root = request.root_folder_path.trim();
        if root.is_empty() {
            return Err(LookupError::Validation(vec![ValidationError {
                field: "root_folder_path",
                message: "root folder is required".into(),
            }]));
        }
        if self.library_by_tmdb_id().await?.contains_key(&request.tmdb_id) {
            return Err(LookupError::Validation(vec![ValidationError {
                field: "tmdb_id",
                message: "movie is already in the library".into(),
            }]));
        }

        let metadata = match self.source.get_movie_info(request.tmdb_id).await {
            Ok(metadata) => metadata,
            Err(MetadataSourceError::NotFound(_)) => {
                return Err(LookupError::NotFound(format!("movie {}", request.tmdb_id)))
            }
            Err(error) => return Err(error.into()),
        };
        let mut movie = Movie::new(metadata);
        movie.monitored = request.monitored;
        movie.quality_profile_id = request.quality_profile_id;
        movie.minimum_availability = request.minimum_availability;
        movie.tags = request.tags;
        movie.root_folder_path = Some(root.to_string());
        let folder = FileNameBuilder::new(self.naming.get().await?).build_movie_folder(&movie)?;
        movie.path = Some(Path::new(root).join(folder).to_string_lossy().into_owned());
        movie.validate().map_err(LookupError::Validation)?;

        let movie = self.movies.create(movie).await?;
        self.events
            .publish(LibraryEvent::MovieAdded(DomainEvent::new(
                "movie.added",
                MovieUpdatedPayload {
                    movie_id: movie.id,
                    title: movie.metadata.title.clone(),
                    monitored: movie.monitored,
                },
            )))
            .await;
        self.queue
            .push(
                Command::RefreshMovie {
                    movie_ids: vec![movie.id],
                },
                CommandPriority::Normal,
                CommandTrigger::Manual,
            )
            .await;
        info!(target: "application", movie_id = %movie.id, title = %movie.metadata.title, "movie added");
        Ok(movie)
    }

    pub async fn exclusions(&self) -> Result<Vec<ImportExclusion>, LookupError> {
        Ok(self.exclusions.list().await?)
    }

    pub async fn add_exclusion(&self, exclusion: ImportExclusion) -> Result<ImportExclusion, LookupError> {
        exclusion.validate().map_err(LookupError::Validation)?;
        let stored = self.exclusions.add(exclusion).await?;
        info!(target: "application", tmdb_id = stored.tmdb_id, title = %stored.title, "import exclusion added");
        Ok(stored)
    }

    pub async fn delete_exclusion(&self, id: ExclusionId) -> Result<(), LookupError> {
        if !self.exclusions.delete(id).await? {
            return Err(LookupError::NotFound(format!("import exclusion {id}")));
        }
        info!(target: "application", exclusion_id = %id, "import exclusion removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::InMemoryEventBus;
    use crate::metadata_source::CollectionInfo;
    use crate::test_support::setup_pool;
    use marquee_infrastructure::sqlite_adapters::{
        SqliteImportExclusionRepository, SqliteMovieRepository, SqliteNamingConfigRepository,
    };
    use marquee_realtime::NoopRealtimeHub;

    struct Catalog;

    fn heat() -> MovieMetadata {
        let mut metadata = MovieMetadata::new("949", "Heat", ItemType::Movie);
        metadata.tmdb_id = Some(949);
        metadata.year = Some(1995);
        metadata.status = MovieStatus::Released;
        metadata
    }

    fn casino() -> MovieMetadata {
        let mut metadata = MovieMetadata::new("524", "Casino", ItemType::Movie);
        metadata.tmdb_id = Some(524);
        metadata.year = Some(1995);
        metadata
    }

    #[async_trait::async_trait]
    impl MetadataSource for Catalog {
        async fn get_movie_info(&self, tmdb_id: i32) -> Result<MovieMetadata, MetadataSourceError> {
            match tmdb_id {
                949 => Ok(heat()),
                524 => Ok(casino()),
                _ => Err(MetadataSourceError::NotFound(format!("movie {tmdb_id}"))),
            }
        }

        async fn get_collection_info(&self, tmdb_id: i32) -> Result<CollectionInfo, MetadataSourceError> {
            Err(MetadataSourceError::NotFound(format!("collection {tmdb_id}")))
        }

        async fn search_movies(&self, term: &str) -> Result<Vec<MovieMetadata>, MetadataSourceError> {
            let term = term.to_lowercase();
            Ok([heat(), casino()]
                .into_iter()
                .filter(|m| {
                    m.title.to_lowercase().contains(&term)
                        || m.year.is_some_and(|year| year.to_string() == term)
                })
                .collect())
        }
    }

    struct Fixture {
        movies: Arc<SqliteMovieRepository>,
        bus: InMemoryEventBus,
        queue: Arc<CommandQueue>,
        service: MovieLookupService,
    }

    async fn fixture() -> Fixture {
        let pool = setup_pool().await;
        let movies = Arc::new(SqliteMovieRepository::new(pool.clone()));
        let bus = InMemoryEventBus::new();
        let queue = Arc::new(CommandQueue::new(Arc::new(NoopRealtimeHub)));
        let service = MovieLookupService::new(
            movies.clone(),
            Arc::new(SqliteImportExclusionRepository::new(pool.clone())),
            Arc::new(SqliteNamingConfigRepository::new(pool)),
            Arc::new(Catalog),
            Arc::new(bus.clone()),
            queue.clone(),
        );
        Fixture {
            movies,
            bus,
            queue,
            service,
        }
    }

    #[test]
    fn only_prefixed_numbers_are_tmdb_ids() {
        assert_eq!(tmdb_id_term("tmdb:949"), Some(949));
        assert_eq!(tmdb_id_term("TMDBID: 949"), Some(949));
        assert_eq!(tmdb_id_term("1917"), None);
        assert_eq!(tmdb_id_term("imdb:tt0113277"), None);
        assert_eq!(tmdb_id_term("tmdb:-4"), None);
    }

    #[tokio::test]
    async fn lookup_flags_library_and_excluded_movies() {
        let f = fixture().await;
        let mut owned = Movie::new(heat());
        owned.path = Some("/movies/Heat Directors Cut".into());
        let owned = f.movies.create(owned).await.unwrap();
        f.service
            .add_exclusion(ImportExclusion::new(524, "Casino", Some(1995)))
            .await
            .unwrap();

        let hits = f.service.lookup("1995").await.unwrap();
        assert_eq!(hits.len(), 2);

        let heat = hits.iter().find(|h| h.tmdb_id == Some(949)).expect("heat");
        assert!(heat.is_existing_movie);
        assert_eq!(heat.existing_movie_id, Some(owned.id));
        assert_eq!(heat.folder.as_deref(), Some("Heat Directors Cut"));
        assert!(!heat.is_exclusion_movie);

        let casino = hits.iter().find(|h| h.tmdb_id == Some(524)).expect("casino");
        assert!(!casino.is_existing_movie);
        assert!(casino.is_exclusion_movie);
        assert_eq!(casino.folder.as_deref(), Some("Casino (1995)"));
    }

    #[tokio::test]
    async fn lookup_by_tmdb_id_skips_unknown_ids() {
        let f = fixture().await;
        let hits = f.service.lookup("tmdb:949").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Heat");
        assert!(f.service.lookup("tmdb:1").await.unwrap().is_empty());
        assert!(f.service.lookup("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_movie_builds_path_publishes_and_queues_refresh() {
        let f = fixture().await;
        let movie = f
            .service
            .add_movie(AddMovieRequest {
                tmdb_id: 949,
                root_folder_path: "/movies".into(),
                quality_profile_id: None,
                monitored: true,
                minimum_availability: MinimumAvailability::Released,
                tags: Vec::new(),
            })
            .await
            .unwrap();

        assert_eq!(movie.path.as_deref(), Some("/movies/Heat (1995)"));
        assert_eq!(movie.root_folder_path.as_deref(), Some("/movies"));
        assert_eq!(f.movies.list_all().await.unwrap().len(), 1);
        assert_eq!(f.bus.drain()[0]["name"], "movie.added");

        let commands = f.queue.all();
        assert_eq!(commands.len(), 1);
        assert_eq!(
            commands[0].body,
            Command::RefreshMovie {
                movie_ids: vec![movie.id]
            }
        );

        let hits = f.service.lookup("heat").await.unwrap();
        assert_eq!(hits[0].existing_movie_id, Some(movie.id));
    }

    #[tokio::test]
    async fn add_movie_rejects_duplicates_missing_roots_and_unknown_ids() {
        let f = fixture().await;
        let request = AddMovieRequest {
            tmdb_id: 949,
            root_folder_path: "/movies".into(),
            quality_profile_id: None,
            monitored: true,
            minimum_availability: MinimumAvailability::default(),
            tags: Vec::new(),
        };
        f.service.add_movie(request.clone()).await.unwrap();

        let duplicate = f.service.add_movie(request.clone()).await;
        assert!(matches!(duplicate, Err(LookupError::Validation(e)) if e[0].field == "tmdb_id"));

        let rootless = f
            .service
            .add_movie(AddMovieRequest {
                tmdb_id: 524,
                root_folder_path: " ".into(),
                ..request.clone()
            })
            .await;
        assert!(matches!(rootless, Err(LookupError::Validation(e)) if e[0].field == "root_folder_path"));

        let unknown = f
            .service
            .add_movie(AddMovieRequest {
                tmdb_id: 1,
                ..request
            })
            .await;
        assert!(matches!(unknown, Err(LookupError::NotFound(_))));
        assert_eq!(f.movies.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn exclusions_validate_and_delete() {
        let f = fixture().await;
        let invalid = f.service.add_exclusion(ImportExclusion::new(0, "", None)).await;
        assert!(matches!(invalid, Err(LookupError::Validation(_))));

        let stored = f
            .service
            .add_exclusion(ImportExclusion::new(524, "Casino", Some(1995)))
            .await
            .unwrap();
        assert_eq!(f.service.exclusions().await.unwrap(), vec![stored.clone()]);

        f.service.delete_exclusion(stored.id).await.unwrap();
        assert!(matches!(
            f.service.delete_exclusion(stored.id).await,
            Err(LookupError::NotFound(_))
        ));
    }
}
