// SPDX-License-Identifier: GPL-3.0-or-later
pub mod registry;
pub mod task;

use std::sync::Arc;
use std::time::Duration;

use marquee_application::{Command, CommandQueue};
use marquee_config::AppConfig;
use marquee_domain::BackupType;
use registry::TaskRegistry;
use tokio::task::JoinHandle;
use tracing::info;

pub use registry::TaskStatus;
pub use task::ScheduledTask;

pub struct Scheduler {
    config: AppConfig,
    registry: Arc<TaskRegistry>,
}

impl Scheduler {
    pub fn new(config: AppConfig, queue: Arc<CommandQueue>) -> Self {
        Self {
            config,
            registry: Arc::new(TaskRegistry::new(queue)),
        }
    }

    /// The periodic tasks with their configured intervals, in seconds
    pub fn tasks(config: &AppConfig) -> Vec<ScheduledTask> {
        let intervals = &config.scheduler;
        vec![
            ScheduledTask::new(
                "refresh-collections",
                Command::RefreshCollections {
                    collection_ids: Vec::new(),
                },
                Duration::from_secs(intervals.refresh_collections_interval),
            ),
            ScheduledTask::new(
                "import-list-sync",
                Command::ImportListSync,
                Duration::from_secs(intervals.import_list_sync_interval),
            ),
            ScheduledTask::new(
                "backup",
                Command::Backup {
                    backup_type: BackupType::Scheduled,
                },
                Duration::from_secs(intervals.backup_interval),
            ),
            ScheduledTask::new(
                "housekeeping",
                Command::Housekeeping,
                Duration::from_secs(intervals.housekeeping_interval),
            ),
        ]
    }

    pub async fn register_tasks(&self) {
        info!(target: "scheduler", "registering background tasks");
        for task in Self::tasks(&self.config) {
            self.registry.register(task).await;
        }
    }

    pub async fn status(&self) -> Vec<TaskStatus> {
        self.registry.status().await
    }

    /// Start the scheduler and return a handle to the background task
    pub fn start(self) -> JoinHandle<anyhow::Result<()>> {
        let registry = self.registry.clone();
        tokio::spawn(async move {
            for handle in registry.start().await {
                handle.await?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_application::CommandTrigger;
    use marquee_realtime::NoopRealtimeHub;

    #[tokio::test]
    async fn registers_configured_intervals() {
        let mut config = AppConfig::default();
        config.scheduler.backup_interval = 120;
        let queue = Arc::new(CommandQueue::new(Arc::new(NoopRealtimeHub)));
        let scheduler = Scheduler::new(config, queue);
        scheduler.register_tasks().await;

        let status = scheduler.status().await;
        let ids: Vec<_> = status.iter().map(|s| s.task_id).collect();
        assert_eq!(
            ids,
            vec!["backup", "housekeeping", "import-list-sync", "refresh-collections"]
        );
        assert_eq!(status[0].interval, Duration::from_secs(120));
        assert_eq!(status[3].interval, Duration::from_secs(24 * 60 * 60));
    }

    #[tokio::test(start_paused = true)]
    async fn fired_tasks_queue_scheduled_commands() {
        let mut config = AppConfig::default();
        config.scheduler.housekeeping_interval = 10;
        let queue = Arc::new(CommandQueue::new(Arc::new(NoopRealtimeHub)));
        let scheduler = Scheduler::new(config, queue.clone());
        scheduler.register_tasks().await;
        let handle = scheduler.start();

        assert!(queue.all().is_empty());
        tokio::time::sleep(Duration::from_secs(11)).await;

        let commands = queue.all();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].name, "Housekeeping");
        assert_eq!(commands[0].trigger, CommandTrigger::Scheduled);
        handle.abort();
    }
}
