// SPDX-License-Identifier: GPL-3.0-or-later
pub mod backup;
pub mod collections;
pub mod commands;
pub mod events;
pub mod index;
pub mod library;
pub mod lookup;
pub mod metadata_source;
pub mod naming;
pub mod providers;
pub mod tags;

pub use backup::{BackupError, BackupService};
pub use collections::{
    CollectionBulkUpdate, CollectionError, CollectionMapper, CollectionResource, CollectionService,
    LibraryBroadcaster,
};
pub use commands::{
    Command, CommandError, CommandExecutor, CommandModel, CommandPriority, CommandQueue,
    CommandStatus, CommandTrigger,
};
pub use events::{EventAggregator, EventHandler, EventPublisher, LibraryEvent};
pub use library::{
    ApplyTags, LibraryError, MovieBulkDelete, MovieBulkUpdate, MovieService, StudioService,
};
pub use lookup::{AddMovieRequest, LookupError, MovieLookupResource, MovieLookupService};
pub use metadata_source::{HttpMetadataSource, MetadataSource, MetadataSourceError};
pub use naming::{NamingError, RenamePreview, RenameService};
pub use providers::{ProviderError, ProviderKind, ProviderService};
pub use tags::TagService;

use std::sync::Arc;

use marquee_config::AppConfig;
use marquee_infrastructure::sqlite_adapters::{
    SqliteCollectionRepository, SqliteImportExclusionRepository, SqliteIndexPreferencesRepository,
    SqliteMovieFileRepository,
    SqliteMovieMetadataRepository, SqliteMovieRepository, SqliteNamingConfigRepository,
    SqliteProviderRepository, SqliteQualityProfileRepository, SqliteStudioRepository,
    SqliteTagRepository,
};
use marquee_realtime::{BroadcastHub, RealtimeHub};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::info;

use commands::{
    BackupHandler, HousekeepingHandler, ImportListSyncHandler, RefreshCollectionsHandler,
    RefreshMovieHandler, RenameFilesHandler,
};
use index::IndexPreferencesService;

/// Services composed by hand over one database pool.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pool: SqlitePool,
    pub hub: Arc<BroadcastHub>,
    pub events: EventAggregator,
    pub queue: Arc<CommandQueue>,
    pub executor: Arc<CommandExecutor>,
    pub movies: MovieService,
    pub lookup: MovieLookupService,
    pub studios: StudioService,
    pub preferences: IndexPreferencesService,
    pub collections: CollectionService,
    pub rename: RenameService,
    pub providers: ProviderService,
    pub backups: BackupService,
    pub tags: TagService,
}

impl AppState {
    pub fn new(config: AppConfig, pool: SqlitePool, client: reqwest::Client) -> Self {
        let source = Arc::new(HttpMetadataSource::new(client.clone(), &config.metadata));
        Self::with_source(config, pool, client, source)
    }

    /// Same as [`AppState::new`] with an explicit metadata source.
    pub fn with_source(
        config: AppConfig,
        pool: SqlitePool,
        client: reqwest::Client,
        source: Arc<dyn MetadataSource>,
    ) -> Self {
        let movie_repo = Arc::new(SqliteMovieRepository::new(pool.clone()));
        let metadata_repo = Arc::new(SqliteMovieMetadataRepository::new(pool.clone()));
        let file_repo = Arc::new(SqliteMovieFileRepository::new(pool.clone()));
        let collection_repo = Arc::new(SqliteCollectionRepository::new(pool.clone()));
        let studio_repo = Arc::new(SqliteStudioRepository::new(pool.clone()));
        let naming_repo = Arc::new(SqliteNamingConfigRepository::new(pool.clone()));
        let profile_repo = Arc::new(SqliteQualityProfileRepository::new(pool.clone()));
        let exclusion_repo = Arc::new(SqliteImportExclusionRepository::new(pool.clone()));

        let hub = Arc::new(BroadcastHub::default());
        let realtime: Arc<dyn RealtimeHub> = hub.clone();
        let events = EventAggregator::new();
        let queue = Arc::new(CommandQueue::new(realtime.clone()));

        let preferences =
            IndexPreferencesService::new(Arc::new(SqliteIndexPreferencesRepository::new(pool.clone())));
        let movies = MovieService::new(
            movie_repo.clone(),
            profile_repo,
            exclusion_repo.clone(),
            preferences.clone(),
            Arc::new(events.clone()),
        );
        let studios = StudioService::new(studio_repo.clone(), preferences.clone());
        let collections = CollectionService::new(
            collection_repo,
            movie_repo.clone(),
            metadata_repo.clone(),
            naming_repo.clone(),
            exclusion_repo.clone(),
            source.clone(),
            Arc::new(events.clone()),
            queue.clone(),
        );
        let lookup = MovieLookupService::new(
            movie_repo.clone(),
            exclusion_repo,
            naming_repo.clone(),
            source.clone(),
            Arc::new(events.clone()),
            queue.clone(),
        );
        events.subscribe(Arc::new(LibraryBroadcaster::new(
            realtime,
            collections.mapper().clone(),
        )));

        let rename = RenameService::new(movie_repo.clone(), file_repo, studio_repo, naming_repo);
        let providers = ProviderService::new(
            Arc::new(SqliteProviderRepository::new(pool.clone())),
            providers::default_providers(client),
        );
        let backups = BackupService::new(pool.clone(), config.backup_folder());
        let tags = TagService::new(Arc::new(SqliteTagRepository::new(pool.clone())));

        let mut executor = CommandExecutor::new(queue.clone(), config.scheduler.max_concurrent_commands);
        executor.register(Arc::new(RefreshCollectionsHandler::new(collections.clone())));
        executor.register(Arc::new(RefreshMovieHandler::new(
            movie_repo,
            metadata_repo,
            source,
            collections.clone(),
        )));
        executor.register(Arc::new(RenameFilesHandler::new(rename.clone())));
        executor.register(Arc::new(BackupHandler::new(backups.clone())));
        executor.register(Arc::new(HousekeepingHandler::new(
            backups.clone(),
            config.backup.retention_days,
            queue.clone(),
        )));
        executor.register(Arc::new(ImportListSyncHandler::new(providers.clone())));

        Self {
            config,
            pool,
            hub,
            events,
            queue,
            executor: Arc::new(executor),
            movies,
            lookup,
            studios,
            preferences,
            collections,
            rename,
            providers,
            backups,
            tags,
        }
    }

    pub fn on_start(&self) {
        info!(
            target: "application",
            handlers = ?self.executor.handler_names(),
            backup_folder = %self.backups.folder().display(),
            "application state initialized"
        );
    }

    /// Starts draining the command queue.
    pub fn start_commands(&self) -> JoinHandle<()> {
        self.executor.clone().start()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::SqlitePool;

    pub async fn setup_pool() -> SqlitePool {
        marquee_infrastructure::in_memory_pool()
            .await
            .expect("in-memory database should migrate")
    }

    /// A migrated database file inside `dir`, for code that needs a real file.
    pub async fn file_pool(dir: &std::path::Path) -> SqlitePool {
        let mut config = marquee_config::AppConfig::default();
        config.database.url = format!("sqlite://{}", dir.join("marquee.db").display());
        marquee_infrastructure::init_database(&config)
            .await
            .expect("file database should migrate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn state_registers_every_command_handler() {
        let pool = test_support::setup_pool().await;
        let state = AppState::new(AppConfig::default(), pool, reqwest::Client::new());
        assert_eq!(
            state.executor.handler_names(),
            vec![
                "Backup",
                "Housekeeping",
                "ImportListSync",
                "RefreshCollections",
                "RefreshMovie",
                "RenameFiles",
            ]
        );
    }
}
