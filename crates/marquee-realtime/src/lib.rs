// SPDX-License-Identifier: GPL-3.0-or-later
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// What happened to a resource pushed to connected clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelAction {
    Created,
    Updated,
    Deleted,
    Sync,
}

/// Change notification for a named resource (`collection`, `movie`, `command`...).
/// `resource` is absent for deletes keyed only by id and for sync pings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceChange {
    pub name: String,
    pub action: ModelAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<serde_json::Value>,
}

impl ResourceChange {
    pub fn new(name: impl Into<String>, action: ModelAction, resource: Option<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            action,
            resource,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RealtimeMessage {
    pub channel: String,
    pub payload: String,
}

#[async_trait::async_trait]
pub trait RealtimeHub: Send + Sync + 'static {
    async fn broadcast(&self, channel: &str, payload: &str);

    async fn publish(&self, change: &ResourceChange) {
        match serde_json::to_string(change) {
            Ok(payload) => self.broadcast(&change.name, &payload).await,
            Err(error) => {
                warn!(target: "realtime", name = %change.name, %error, "failed to encode resource change")
            }
        }
    }
}

pub struct NoopRealtimeHub;

#[async_trait::async_trait]
impl RealtimeHub for NoopRealtimeHub {
    async fn broadcast(&self, channel: &str, payload: &str) {
        info!(target: "realtime", %channel, %payload, "noop realtime broadcast");
    }
}

/// Fan-out hub backed by a tokio broadcast channel. Messages sent while nobody
/// is subscribed are dropped.
#[derive(Clone)]
pub struct BroadcastHub {
    sender: broadcast::Sender<RealtimeMessage>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait::async_trait]
impl RealtimeHub for BroadcastHub {
    async fn broadcast(&self, channel: &str, payload: &str) {
        let message = RealtimeMessage {
            channel: channel.to_string(),
            payload: payload.to_string(),
        };
        match self.sender.send(message) {
            Ok(receivers) => debug!(target: "realtime", %channel, receivers, "broadcast sent"),
            Err(_) => debug!(target: "realtime", %channel, "no realtime subscribers"),
        }
    }
}
