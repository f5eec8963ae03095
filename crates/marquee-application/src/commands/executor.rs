// SPDX-License-Identifier: GPL-3.0-or-later
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::{Command, CommandError, CommandModel, CommandQueue};

/// Runs one kind of command.
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    /// Name of the command this handler accepts, e.g. `RefreshCollections`.
    fn command_name(&self) -> &'static str;

    /// Returns an optional completion message.
    async fn execute(&self, command: &Command) -> anyhow::Result<Option<String>>;
}

/// Drains the queue with a bounded number of concurrent workers.
pub struct CommandExecutor {
    queue: Arc<CommandQueue>,
    handlers: HashMap<&'static str, Arc<dyn CommandHandler>>,
    max_concurrent: usize,
}

impl CommandExecutor {
    pub fn new(queue: Arc<CommandQueue>, max_concurrent: usize) -> Self {
        Self {
            queue,
            handlers: HashMap::new(),
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        info!(target: "commands", command = handler.command_name(), "registering command handler");
        self.handlers.insert(handler.command_name(), handler);
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Runs a single claimed command to completion and records the outcome.
    pub async fn execute(&self, model: CommandModel) {
        let Some(handler) = self.handlers.get(model.name.as_str()).cloned() else {
            let error = CommandError::NoHandler(model.name.clone());
            error!(target: "commands", id = %model.id, %error, "cannot execute command");
            if let Err(error) = self.queue.fail(model.id, error.to_string()).await {
                error!(target: "commands", id = %model.id, %error, "failed to record command outcome");
            }
            return;
        };

        info!(target: "commands", id = %model.id, name = %model.name, "executing command");
        // Own task, so a panicking handler still leaves the command failed rather than started.
        let body = model.body.clone();
        let outcome = match tokio::spawn(async move { handler.execute(&body).await }).await {
            Ok(outcome) => outcome,
            Err(join_error) => Err(anyhow::anyhow!("command handler panicked: {join_error}")),
        };
        let recorded = match outcome {
            Ok(message) => self.queue.complete(model.id, message).await,
            Err(err) => self.queue.fail(model.id, format!("{err:#}")).await,
        };
        if let Err(error) = recorded {
            error!(target: "commands", id = %model.id, %error, "failed to record command outcome");
        }
    }

    /// Spawns the dispatch loop; each command runs on its own task while a
    /// permit is held.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        info!(target: "commands", max_concurrent = self.max_concurrent, "starting command executor");
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        tokio::spawn(async move {
            loop {
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };
                let model = self.queue.next().await;
                let executor = self.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    executor.execute(model).await;
                });
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandPriority, CommandStatus, CommandTrigger};
    use marquee_realtime::NoopRealtimeHub;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Counting {
        runs: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl CommandHandler for Counting {
        fn command_name(&self) -> &'static str {
            "Housekeeping"
        }

        async fn execute(&self, _command: &Command) -> anyhow::Result<Option<String>> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("disk full");
            }
            Ok(Some("done".into()))
        }
    }

    fn setup(fail: bool) -> (Arc<CommandQueue>, Arc<Counting>, CommandExecutor) {
        let queue = Arc::new(CommandQueue::new(Arc::new(NoopRealtimeHub)));
        let handler = Arc::new(Counting {
            runs: AtomicUsize::new(0),
            fail,
        });
        let mut executor = CommandExecutor::new(queue.clone(), 2);
        executor.register(handler.clone());
        (queue, handler, executor)
    }

    #[tokio::test]
    async fn execute_completes_with_handler_message() {
        let (queue, handler, executor) = setup(false);
        queue.push(Command::Housekeeping, CommandPriority::Normal, CommandTrigger::Manual).await;
        let model = queue.next().await;
        executor.execute(model.clone()).await;

        let stored = queue.get(model.id).unwrap();
        assert_eq!(stored.status, CommandStatus::Completed);
        assert_eq!(stored.message.as_deref(), Some("done"));
        assert_eq!(handler.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_errors_and_unknown_commands_fail() {
        let (queue, _, executor) = setup(true);
        queue.push(Command::Housekeeping, CommandPriority::Normal, CommandTrigger::Manual).await;
        let model = queue.next().await;
        executor.execute(model.clone()).await;
        let stored = queue.get(model.id).unwrap();
        assert_eq!(stored.status, CommandStatus::Failed);
        assert_eq!(stored.message.as_deref(), Some("disk full"));

        queue.push(Command::ImportListSync, CommandPriority::Normal, CommandTrigger::Manual).await;
        let model = queue.next().await;
        executor.execute(model.clone()).await;
        let stored = queue.get(model.id).unwrap();
        assert_eq!(stored.status, CommandStatus::Failed);
        assert!(stored.message.unwrap().contains("no handler"));
    }

    struct Panicking;

    #[async_trait::async_trait]
    impl CommandHandler for Panicking {
        fn command_name(&self) -> &'static str {
            "Housekeeping"
        }

        async fn execute(&self, _command: &Command) -> anyhow::Result<Option<String>> {
            panic!("handler bug");
        }
    }

    #[tokio::test]
    async fn panicking_handler_fails_the_command() {
        let queue = Arc::new(CommandQueue::new(Arc::new(NoopRealtimeHub)));
        let mut executor = CommandExecutor::new(queue.clone(), 1);
        executor.register(Arc::new(Panicking));

        queue.push(Command::Housekeeping, CommandPriority::Normal, CommandTrigger::Manual).await;
        let model = queue.next().await;
        executor.execute(model.clone()).await;

        let stored = queue.get(model.id).unwrap();
        assert_eq!(stored.status, CommandStatus::Failed);
        assert!(stored.message.unwrap().contains("panicked"));

        // No longer active, so the same command can be queued again.
        let again = queue.push(Command::Housekeeping, CommandPriority::Normal, CommandTrigger::Manual).await;
        assert_ne!(again.id, model.id);
    }

    #[tokio::test]
    async fn started_executor_drains_the_queue() {
        let (queue, handler, executor) = setup(false);
        let worker = Arc::new(executor).start();
        let model = queue.push(Command::Housekeeping, CommandPriority::Normal, CommandTrigger::Manual).await;

        tokio::time::timeout(Duration::from_secs(2), async {
            while queue.get(model.id).is_some_and(|m| m.status.is_active()) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("command should finish");
        assert_eq!(handler.runs.load(Ordering::SeqCst), 1);
        worker.abort();
    }
}
