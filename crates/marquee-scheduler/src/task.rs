// SPDX-License-Identifier: GPL-3.0-or-later
use std::time::Duration;

use marquee_application::{Command, CommandModel, CommandPriority, CommandQueue, CommandTrigger};
use tracing::debug;

/// A command queued every `interval`; the command executor does the work.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub id: &'static str,
    pub command: Command,
    pub interval: Duration,
}

impl ScheduledTask {
    pub fn new(id: &'static str, command: Command, interval: Duration) -> Self {
        Self {
            id,
            command,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    /// Queues the command at low priority so manual commands run first.
    pub async fn fire(&self, queue: &CommandQueue) -> CommandModel {
        let model = queue
            .push(self.command.clone(), CommandPriority::Low, CommandTrigger::Scheduled)
            .await;
        debug!(target: "scheduler", task = self.id, command_id = %model.id, name = %model.name, "scheduled command queued");
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_application::CommandStatus;
    use marquee_domain::BackupType;
    use marquee_realtime::NoopRealtimeHub;

    #[tokio::test]
    async fn fire_queues_a_low_priority_scheduled_command() {
        let queue = CommandQueue::new(std::sync::Arc::new(NoopRealtimeHub));
        let task = ScheduledTask::new(
            "backup",
            Command::Backup {
                backup_type: BackupType::Scheduled,
            },
            Duration::from_secs(60),
        );

        let first = task.fire(&queue).await;
        // a second firing while the first is still queued is deduplicated
        let second = task.fire(&queue).await;
        assert_eq!(first.id, second.id);

        let commands = queue.all();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].name, "Backup");
        assert_eq!(commands[0].trigger, CommandTrigger::Scheduled);
        assert_eq!(commands[0].priority, CommandPriority::Low);
        assert_eq!(commands[0].status, CommandStatus::Queued);
    }

    #[test]
    fn zero_interval_is_raised_to_one_second() {
        let task = ScheduledTask::new("housekeeping", Command::Housekeeping, Duration::ZERO);
        assert_eq!(task.interval, Duration::from_secs(1));
    }
}
