// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use marquee_domain::CommandId;
use marquee_realtime::{ModelAction, RealtimeHub, ResourceChange};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::{Command, CommandError, CommandModel, CommandPriority, CommandStatus, CommandTrigger};

/// In-memory command queue. Every state change is pushed to realtime clients
/// as a `command` resource.
pub struct CommandQueue {
    commands: Mutex<Vec<CommandModel>>,
    available: Notify,
    hub: Arc<dyn RealtimeHub>,
}

impl CommandQueue {
    pub fn new(hub: Arc<dyn RealtimeHub>) -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            available: Notify::new(),
            hub,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CommandModel>> {
        self.commands.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn announce(&self, action: ModelAction, model: &CommandModel) {
        let resource = serde_json::to_value(model).ok();
        self.hub
            .publish(&ResourceChange::new("command", action, resource))
            .await;
    }

    /// Queues `command` unless an equal one is already queued or running,
    /// in which case that one is returned.
    pub async fn push(
        &self,
        command: Command,
        priority: CommandPriority,
        trigger: CommandTrigger,
    ) -> CommandModel {
        let model = {
            let mut commands = self.lock();
            if let Some(existing) = commands
                .iter()
                .find(|c| c.status.is_active() && c.body == command)
            {
                debug!(target: "commands", id = %existing.id, name = %existing.name, "command already queued");
                return existing.clone();
            }
            let model = CommandModel::new(command, priority, trigger);
            commands.push(model.clone());
            model
        };

        info!(target: "commands", id = %model.id, name = %model.name, ?priority, ?trigger, "command queued");
        self.available.notify_waiters();
        self.announce(ModelAction::Created, &model).await;
        model
    }

    /// Highest priority queued command, oldest first within a priority.
    fn peek_id(commands: &[CommandModel]) -> Option<CommandId> {
        commands
            .iter()
            .filter(|c| c.status == CommandStatus::Queued)
            .min_by(|a, b| b.priority.cmp(&a.priority).then(a.queued.cmp(&b.queued)))
            .map(|c| c.id)
    }

    fn try_start_next(&self) -> Option<CommandModel> {
        let mut commands = self.lock();
        let id = Self::peek_id(&commands)?;
        Self::mark_started(&mut commands, id).ok()
    }

    fn mark_started(commands: &mut [CommandModel], id: CommandId) -> Result<CommandModel, CommandError> {
        let model = commands
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(CommandError::NotFound(id))?;
        model.status = CommandStatus::Started;
        model.started = Some(Utc::now());
        Ok(model.clone())
    }

    /// Waits for the next command and claims it as started.
    pub async fn next(&self) -> CommandModel {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(model) = self.try_start_next() {
                debug!(target: "commands", id = %model.id, name = %model.name, "command started");
                self.announce(ModelAction::Updated, &model).await;
                return model;
            }
            notified.await;
        }
    }

    pub async fn start(&self, id: CommandId) -> Result<CommandModel, CommandError> {
        let model = Self::mark_started(&mut self.lock(), id)?;
        self.announce(ModelAction::Updated, &model).await;
        Ok(model)
    }

    async fn finish(
        &self,
        id: CommandId,
        status: CommandStatus,
        message: Option<String>,
    ) -> Result<CommandModel, CommandError> {
        let model = {
            let mut commands = self.lock();
            let model = commands
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(CommandError::NotFound(id))?;
            model.finish(status, message);
            model.clone()
        };
        self.announce(ModelAction::Updated, &model).await;
        Ok(model)
    }

    pub async fn complete(&self, id: CommandId, message: Option<String>) -> Result<CommandModel, CommandError> {
        let model = self.finish(id, CommandStatus::Completed, message).await?;
        info!(target: "commands", %id, name = %model.name, duration_ms = ?model.duration, "command completed");
        Ok(model)
    }

    pub async fn fail(&self, id: CommandId, error: impl Into<String>) -> Result<CommandModel, CommandError> {
        let model = self.finish(id, CommandStatus::Failed, Some(error.into())).await?;
        warn!(target: "commands", %id, name = %model.name, message = ?model.message, "command failed");
        Ok(model)
    }

    /// Only queued commands can be cancelled.
    pub async fn cancel(&self, id: CommandId) -> Result<CommandModel, CommandError> {
        let model = {
            let mut commands = self.lock();
            let model = commands
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(CommandError::NotFound(id))?;
            if model.status != CommandStatus::Queued {
                return Err(CommandError::NotCancellable {
                    id,
                    status: model.status,
                });
            }
            model.finish(CommandStatus::Cancelled, None);
            model.clone()
        };
        info!(target: "commands", %id, name = %model.name, "command cancelled");
        self.announce(ModelAction::Updated, &model).await;
        Ok(model)
    }

    pub fn all(&self) -> Vec<CommandModel> {
        self.lock().clone()
    }

    pub fn get(&self, id: CommandId) -> Option<CommandModel> {
        self.lock().iter().find(|c| c.id == id).cloned()
    }

    /// Drops finished commands that ended before `older_than`; returns how many.
    pub fn clean_completed(&self, older_than: DateTime<Utc>) -> usize {
        let mut commands = self.lock();
        let before = commands.len();
        commands.retain(|c| c.status.is_active() || c.ended.map_or(true, |ended| ended >= older_than));
        let removed = before - commands.len();
        debug!(target: "commands", removed, "cleaned finished commands");
        removed
    }
}
