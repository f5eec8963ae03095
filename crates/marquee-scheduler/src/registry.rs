// SPDX-License-Identifier: GPL-3.0-or-later
use crate::task::ScheduledTask;
use chrono::{DateTime, Utc};
use marquee_application::CommandQueue;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};
use tracing::info;

/// Snapshot of a registered task for status reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub task_id: &'static str,
    pub command_name: &'static str,
    pub interval: Duration,
    pub last_execution: Option<DateTime<Utc>>,
}

pub struct TaskRegistry {
    queue: Arc<CommandQueue>,
    tasks: RwLock<HashMap<&'static str, ScheduledTask>>,
    last_runs: Arc<RwLock<HashMap<&'static str, DateTime<Utc>>>>,
}

impl TaskRegistry {
    pub fn new(queue: Arc<CommandQueue>) -> Self {
        Self {
            queue,
            tasks: RwLock::new(HashMap::new()),
            last_runs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers a task, replacing one with the same id.
    pub async fn register(&self, task: ScheduledTask) {
        info!(target: "scheduler", task = task.id, command = task.command.name(), interval = ?task.interval, "registering task");
        self.tasks.write().await.insert(task.id, task);
    }

    pub async fn status(&self) -> Vec<TaskStatus> {
        let tasks = self.tasks.read().await;
        let last_runs = self.last_runs.read().await;
        let mut status: Vec<_> = tasks
            .values()
            .map(|task| TaskStatus {
                task_id: task.id,
                command_name: task.command.name(),
                interval: task.interval,
                last_execution: last_runs.get(task.id).copied(),
            })
            .collect();
        status.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        status
    }

    /// Spawns one timer per task. The first firing comes one full interval after start.
    pub async fn start(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        let tasks = self.tasks.read().await;
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks.values() {
            let task = task.clone();
            let registry = self.clone();
            handles.push(tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + task.interval, task.interval);
                loop {
                    ticker.tick().await;
                    registry.last_runs.write().await.insert(task.id, Utc::now());
                    task.fire(&registry.queue).await;
                }
            }));
        }

        info!(target: "scheduler", tasks = tasks.len(), "task registry started");
        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_application::Command;
    use marquee_realtime::NoopRealtimeHub;

    fn registry() -> (Arc<CommandQueue>, Arc<TaskRegistry>) {
        let queue = Arc::new(CommandQueue::new(Arc::new(NoopRealtimeHub)));
        (queue.clone(), Arc::new(TaskRegistry::new(queue)))
    }

    #[tokio::test]
    async fn registering_the_same_id_replaces_the_task() {
        let (_queue, registry) = registry();
        registry
            .register(ScheduledTask::new("sync", Command::ImportListSync, Duration::from_secs(60)))
            .await;
        registry
            .register(ScheduledTask::new("sync", Command::ImportListSync, Duration::from_secs(90)))
            .await;

        let status = registry.status().await;
        assert_eq!(status.len(), 1);
        assert_eq!(status[0].interval, Duration::from_secs(90));
        assert_eq!(status[0].command_name, Command::ImportListSync.name());
        assert!(status[0].last_execution.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn tasks_wait_one_interval_before_firing() {
        let (queue, registry) = registry();
        registry
            .register(ScheduledTask::new("tick", Command::Housekeeping, Duration::from_secs(60)))
            .await;
        let handles = registry.clone().start().await;

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(queue.all().is_empty());
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(queue.all().len(), 1);

        let status = registry.status().await;
        assert_eq!(status[0].task_id, "tick");
        assert!(status[0].last_execution.is_some());
        handles.iter().for_each(JoinHandle::abort);
    }
}
