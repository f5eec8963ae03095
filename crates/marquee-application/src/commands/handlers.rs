// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use marquee_domain::{ItemType, MovieCollection};
use marquee_infrastructure::repositories::{MovieMetadataRepository, MovieRepository};
use tracing::{debug, info, warn};

use super::{Command, CommandHandler, CommandQueue};
use crate::backup::BackupService;
use crate::collections::CollectionService;
use crate::metadata_source::{MetadataSource, MetadataSourceError};
use crate::naming::RenameService;
use crate::providers::{ImportListExtra, ProviderKind, ProviderService};

pub struct RefreshCollectionsHandler {
    collections: CollectionService,
}

impl RefreshCollectionsHandler {
    pub fn new(collections: CollectionService) -> Self {
        Self { collections }
    }
}

#[async_trait::async_trait]
impl CommandHandler for RefreshCollectionsHandler {
    fn command_name(&self) -> &'static str {
        "RefreshCollections"
    }

    async fn execute(&self, command: &Command) -> anyhow::Result<Option<String>> {
        let Command::RefreshCollections { collection_ids } = command else {
            bail!("unexpected command {}", command.name());
        };
        let refreshed = self.collections.refresh_collections(collection_ids).await?;
        Ok(Some(format!("Refreshed {refreshed} collections")))
    }
}

/// Re-fetches movie metadata and registers collections that are not tracked yet.
pub struct RefreshMovieHandler {
    movies: Arc<dyn MovieRepository>,
    metadata: Arc<dyn MovieMetadataRepository>,
    source: Arc<dyn MetadataSource>,
    collections: CollectionService,
}

impl RefreshMovieHandler {
    pub fn new(
        movies: Arc<dyn MovieRepository>,
        metadata: Arc<dyn MovieMetadataRepository>,
        source: Arc<dyn MetadataSource>,
        collections: CollectionService,
    ) -> Self {
        Self {
            movies,
            metadata,
            source,
            collections,
        }
    }
}

#[async_trait::async_trait]
impl CommandHandler for RefreshMovieHandler {
    fn command_name(&self) -> &'static str {
        "RefreshMovie"
    }

    async fn execute(&self, command: &Command) -> anyhow::Result<Option<String>> {
        let Command::RefreshMovie { movie_ids } = command else {
            bail!("unexpected command {}", command.name());
        };
        let movies = if movie_ids.is_empty() {
            self.movies.list_all().await?
        } else {
            self.movies.get_many(movie_ids).await?
        };

        let mut refreshed = 0;
        for movie in movies {
            let tmdb_id = match (movie.metadata.item_type, movie.metadata.tmdb_id) {
                (ItemType::Movie, Some(id)) => id,
                _ => {
                    debug!(target: "commands", movie_id = %movie.id, "no tmdb id to refresh from");
                    continue;
                }
            };
            self.source.evict_movie(tmdb_id);
            let mut info = match self.source.get_movie_info(tmdb_id).await {
                Ok(info) => info,
                Err(MetadataSourceError::NotFound(_)) => {
                    warn!(target: "commands", movie_id = %movie.id, tmdb_id, "movie was removed from the metadata source");
                    continue;
                }
                Err(error) => {
                    return Err(error).with_context(|| format!("refreshing movie {}", movie.id));
                }
            };
            info.foreign_id = movie.metadata.foreign_id.clone();
            let info = self.metadata.upsert(info).await?;

            if let (Some(collection_tmdb_id), Some(title)) = (info.collection_tmdb_id, info.collection_title) {
                let mut collection = MovieCollection::new(collection_tmdb_id, title);
                collection.quality_profile_id = movie.quality_profile_id;
                collection.root_folder_path = movie.root_folder_path.clone();
                collection.minimum_availability = movie.minimum_availability;
                self.collections.add_collection(collection).await?;
            }
            refreshed += 1;
        }
        Ok(Some(format!("Refreshed {refreshed} movies")))
    }
}

pub struct RenameFilesHandler {
    rename: RenameService,
}

impl RenameFilesHandler {
    pub fn new(rename: RenameService) -> Self {
        Self { rename }
    }
}

#[async_trait::async_trait]
impl CommandHandler for RenameFilesHandler {
    fn command_name(&self) -> &'static str {
        "RenameFiles"
    }

    async fn execute(&self, command: &Command) -> anyhow::Result<Option<String>> {
        let Command::RenameFiles { movie_id, files } = command else {
            bail!("unexpected command {}", command.name());
        };
        let renamed = self.rename.rename_files(*movie_id, files).await?;
        Ok(Some(format!("Renamed {} files", renamed.len())))
    }
}

pub struct BackupHandler {
    backups: BackupService,
}

impl BackupHandler {
    pub fn new(backups: BackupService) -> Self {
        Self { backups }
    }
}

#[async_trait::async_trait]
impl CommandHandler for BackupHandler {
    fn command_name(&self) -> &'static str {
        "Backup"
    }

    async fn execute(&self, command: &Command) -> anyhow::Result<Option<String>> {
        let Command::Backup { backup_type } = command else {
            bail!("unexpected command {}", command.name());
        };
        let backup = self.backups.create(*backup_type).await?;
        Ok(Some(format!("Backup written to {}", backup.name)))
    }
}

/// Expires old scheduled backups and forgets finished commands.
pub struct HousekeepingHandler {
    backups: BackupService,
    retention_days: i64,
    queue: Arc<CommandQueue>,
}

impl HousekeepingHandler {
    pub fn new(backups: BackupService, retention_days: i64, queue: Arc<CommandQueue>) -> Self {
        Self {
            backups,
            retention_days,
            queue,
        }
    }
}

#[async_trait::async_trait]
impl CommandHandler for HousekeepingHandler {
    fn command_name(&self) -> &'static str {
        "Housekeeping"
    }

    async fn execute(&self, _command: &Command) -> anyhow::Result<Option<String>> {
        let backups = self.backups.cleanup(self.retention_days).await?;
        let commands = self.queue.clean_completed(Utc::now() - Duration::days(1));
        info!(target: "commands", backups, commands, "housekeeping finished");
        Ok(Some(format!(
            "Removed {backups} expired backups and {commands} finished commands"
        )))
    }
}

pub struct ImportListSyncHandler {
    providers: ProviderService,
}

impl ImportListSyncHandler {
    pub fn new(providers: ProviderService) -> Self {
        Self { providers }
    }
}

#[async_trait::async_trait]
impl CommandHandler for ImportListSyncHandler {
    fn command_name(&self) -> &'static str {
        "ImportListSync"
    }

    async fn execute(&self, _command: &Command) -> anyhow::Result<Option<String>> {
        let lists = self.providers.list(ProviderKind::ImportList).await?;
        let mut enabled = 0;
        for list in lists.iter().filter(|l| l.enable) {
            let automatic = list
                .extra::<ImportListExtra>()
                .map(|extra| extra.enable_auto)
                .unwrap_or(false);
            info!(
                target: "commands",
                id = %list.id,
                name = %list.name,
                implementation = %list.implementation,
                automatic,
                "import list due for sync"
            );
            enabled += 1;
        }
        Ok(Some(format!("{enabled} of {} import lists enabled", lists.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandPriority, CommandTrigger};
    use crate::events::InMemoryEventBus;
    use crate::metadata_source::CollectionInfo;
    use crate::providers::{default_providers, ProviderDefinition};
    use crate::test_support::{file_pool, setup_pool};
    use marquee_domain::{BackupType, Movie, MovieMetadata};
    use marquee_infrastructure::repositories::{CollectionRepository, Repository};
    use marquee_infrastructure::sqlite_adapters::{
        SqliteCollectionRepository, SqliteImportExclusionRepository, SqliteMovieMetadataRepository,
        SqliteMovieRepository, SqliteNamingConfigRepository, SqliteProviderRepository,
    };
    use marquee_realtime::NoopRealtimeHub;
    use serde_json::json;

    #[derive(Default)]
    struct Source {
        evicted: std::sync::Mutex<Vec<i32>>,
    }

    #[async_trait::async_trait]
    impl MetadataSource for Source {
        async fn get_movie_info(&self, tmdb_id: i32) -> Result<MovieMetadata, MetadataSourceError> {
            if tmdb_id != 949 {
                return Err(MetadataSourceError::NotFound(tmdb_id.to_string()));
            }
            let mut metadata = MovieMetadata::new("949", "Heat (Remastered)", ItemType::Movie);
            metadata.tmdb_id = Some(949);
            metadata.collection_tmdb_id = Some(1000);
            metadata.collection_title = Some("Heat Collection".into());
            Ok(metadata)
        }

        async fn get_collection_info(&self, tmdb_id: i32) -> Result<CollectionInfo, MetadataSourceError> {
            Err(MetadataSourceError::NotFound(tmdb_id.to_string()))
        }

        async fn search_movies(&self, _term: &str) -> Result<Vec<MovieMetadata>, MetadataSourceError> {
            Ok(Vec::new())
        }

        fn evict_movie(&self, tmdb_id: i32) {
            self.evicted.lock().unwrap().push(tmdb_id);
        }
    }

    #[tokio::test]
    async fn refresh_movie_updates_metadata_and_adds_collection() {
        let pool = setup_pool().await;
        let movies = Arc::new(SqliteMovieRepository::new(pool.clone()));
        let metadata = Arc::new(SqliteMovieMetadataRepository::new(pool.clone()));
        let collections = Arc::new(SqliteCollectionRepository::new(pool.clone()));
        let stub = Arc::new(Source::default());
        let source: Arc<dyn MetadataSource> = stub.clone();
        let queue = Arc::new(CommandQueue::new(Arc::new(NoopRealtimeHub)));
        let service = CollectionService::new(
            collections.clone(),
            movies.clone(),
            metadata.clone(),
            Arc::new(SqliteNamingConfigRepository::new(pool.clone())),
            Arc::new(SqliteImportExclusionRepository::new(pool)),
            source.clone(),
            Arc::new(InMemoryEventBus::new()),
            queue,
        );

        let mut heat = MovieMetadata::new("tmdb:949", "Heat", ItemType::Movie);
        heat.tmdb_id = Some(949);
        let heat = movies.create(Movie::new(heat)).await.unwrap();
        movies
            .create(Movie::new(MovieMetadata::new("stash:1", "Scene", ItemType::Scene)))
            .await
            .unwrap();

        let handler = RefreshMovieHandler::new(movies.clone(), metadata, source, service);
        let message = handler
            .execute(&Command::RefreshMovie { movie_ids: vec![] })
            .await
            .unwrap();
        assert_eq!(message.as_deref(), Some("Refreshed 1 movies"));

        let stored = movies.get_by_id(heat.id).await.unwrap().unwrap();
        assert_eq!(stored.metadata.title, "Heat (Remastered)");
        assert_eq!(stored.metadata.foreign_id, "tmdb:949");
        assert!(collections.find_by_tmdb_id(1000).await.unwrap().is_some());
        // Refresh always goes past the lookup cache.
        assert_eq!(*stub.evicted.lock().unwrap(), vec![949]);
    }

    #[tokio::test]
    async fn housekeeping_cleans_commands_and_backups() {
        let pool = setup_pool().await;
        let dir = tempfile::tempdir().unwrap();
        let queue = Arc::new(CommandQueue::new(Arc::new(NoopRealtimeHub)));
        let handler = HousekeepingHandler::new(BackupService::new(pool, dir.path()), 28, queue.clone());

        let model = queue.push(Command::ImportListSync, CommandPriority::Normal, CommandTrigger::Manual).await;
        queue.start(model.id).await.unwrap();
        queue.complete(model.id, None).await.unwrap();

        let message = handler.execute(&Command::Housekeeping).await.unwrap().unwrap();
        assert!(message.contains("0 expired backups"));
        // Finished less than a day ago, so it stays.
        assert_eq!(queue.all().len(), 1);
    }

    #[tokio::test]
    async fn backup_handler_writes_requested_type() {
        let data = tempfile::tempdir().unwrap();
        let pool = file_pool(data.path()).await;
        let dir = tempfile::tempdir().unwrap();
        let backups = BackupService::new(pool, dir.path());
        let handler = BackupHandler::new(backups.clone());
        handler
            .execute(&Command::Backup {
                backup_type: BackupType::Scheduled,
            })
            .await
            .unwrap();
        let listed = backups.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].backup_type, BackupType::Scheduled);
        assert!(listed[0].size > 0);
    }

    #[tokio::test]
    async fn import_list_sync_counts_enabled_lists() {
        let pool = setup_pool().await;
        let providers = ProviderService::new(
            Arc::new(SqliteProviderRepository::new(pool)),
            default_providers(reqwest::Client::new()),
        );
        let mut list = ProviderDefinition::new(ProviderKind::ImportList, "Saga", "TMDbCollectionImport");
        list.settings = json!({ "collectionId": "10" });
        list.extra = json!({ "rootFolderPath": "/movies", "enableAuto": true });
        providers.create(ProviderKind::ImportList, list).await.unwrap();

        let handler = ImportListSyncHandler::new(providers);
        let message = handler.execute(&Command::ImportListSync).await.unwrap();
        assert_eq!(message.as_deref(), Some("1 of 1 import lists enabled"));
    }

    #[tokio::test]
    async fn handlers_reject_foreign_commands() {
        let pool = setup_pool().await;
        let handler = BackupHandler::new(BackupService::new(pool, "/tmp/unused"));
        assert!(handler.execute(&Command::Housekeeping).await.is_err());
    }
}
