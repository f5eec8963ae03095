// SPDX-License-Identifier: GPL-3.0-or-later
//! Background commands: the queue, the worker pool that drains it and the
//! handlers that do the work.

pub mod executor;
pub mod handlers;
pub mod queue;

use chrono::{DateTime, Utc};
use marquee_domain::{BackupType, CollectionId, CommandId, MovieFileId, MovieId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use executor::{CommandExecutor, CommandHandler};
pub use handlers::{
    BackupHandler, HousekeepingHandler, ImportListSyncHandler, RefreshCollectionsHandler,
    RefreshMovieHandler, RenameFilesHandler,
};
pub use queue::CommandQueue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all_fields = "camelCase")]
pub enum Command {
    RefreshCollections {
        #[serde(default)]
        collection_ids: Vec<CollectionId>,
    },
    RefreshMovie {
        #[serde(default)]
        movie_ids: Vec<MovieId>,
    },
    RenameFiles {
        movie_id: MovieId,
        #[serde(default)]
        files: Vec<MovieFileId>,
    },
    Backup {
        #[serde(default = "manual_backup")]
        backup_type: BackupType,
    },
    Housekeeping,
    ImportListSync,
}

fn manual_backup() -> BackupType {
    BackupType::Manual
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RefreshCollections { .. } => "RefreshCollections",
            Self::RefreshMovie { .. } => "RefreshMovie",
            Self::RenameFiles { .. } => "RenameFiles",
            Self::Backup { .. } => "Backup",
            Self::Housekeeping => "Housekeeping",
            Self::ImportListSync => "ImportListSync",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Queued,
    Started,
    Completed,
    Failed,
    Cancelled,
}

impl CommandStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Started)
    }
}

/// Ordered so that `High > Normal > Low`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandPriority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandTrigger {
    #[default]
    Manual,
    Scheduled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandModel {
    pub id: CommandId,
    pub name: String,
    pub body: Command,
    pub priority: CommandPriority,
    pub status: CommandStatus,
    pub trigger: CommandTrigger,
    pub queued: DateTime<Utc>,
    pub started: Option<DateTime<Utc>>,
    pub ended: Option<DateTime<Utc>>,
    pub message: Option<String>,
    /// Run time in milliseconds, set once the command ends.
    pub duration: Option<i64>,
}

impl CommandModel {
    pub fn new(body: Command, priority: CommandPriority, trigger: CommandTrigger) -> Self {
        Self {
            id: CommandId::new(),
            name: body.name().to_string(),
            body,
            priority,
            status: CommandStatus::Queued,
            trigger,
            queued: Utc::now(),
            started: None,
            ended: None,
            message: None,
            duration: None,
        }
    }

    fn finish(&mut self, status: CommandStatus, message: Option<String>) {
        let now = Utc::now();
        self.status = status;
        self.ended = Some(now);
        self.duration = self.started.map(|s| (now - s).num_milliseconds());
        if message.is_some() {
            self.message = message;
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command {0} not found")]
    NotFound(CommandId),
    #[error("command {id} is {status:?} and can no longer be cancelled")]
    NotCancellable { id: CommandId, status: CommandStatus },
    #[error("no handler registered for command {0}")]
    NoHandler(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn command_body_is_tagged_by_name() {
        let id = MovieId::new();
        let command = Command::RenameFiles {
            movie_id: id,
            files: vec![],
        };
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["name"], "RenameFiles");
        assert_eq!(value["movieId"], json!(id));

        let parsed: Command = serde_json::from_value(json!({ "name": "Backup" })).unwrap();
        assert_eq!(
            parsed,
            Command::Backup {
                backup_type: BackupType::Manual
            }
        );
        let parsed: Command = serde_json::from_value(json!({ "name": "RefreshCollections" })).unwrap();
        assert_eq!(parsed.name(), "RefreshCollections");
    }

    #[test]
    fn priorities_order_high_first() {
        let mut priorities = vec![CommandPriority::Normal, CommandPriority::High, CommandPriority::Low];
        priorities.sort_by(|a, b| b.cmp(a));
        assert_eq!(
            priorities,
            vec![CommandPriority::High, CommandPriority::Normal, CommandPriority::Low]
        );
    }
}
