// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::{Arc, Mutex, RwLock};

use marquee_domain::{
    CollectionAdded, CollectionDeleted, CollectionEdited, MovieAdded, MovieDeleted, MovieUpdated,
};
use serde_json::json;
use tracing::debug;

/// Events raised by library services after their changes are persisted.
#[derive(Debug, Clone)]
pub enum LibraryEvent {
    CollectionAdded(CollectionAdded),
    CollectionEdited(CollectionEdited),
    CollectionDeleted(CollectionDeleted),
    MovieAdded(MovieAdded),
    MovieUpdated(MovieUpdated),
    MovieDeleted(MovieDeleted),
}

impl LibraryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CollectionAdded(e) => e.name,
            Self::CollectionEdited(e) => e.name,
            Self::CollectionDeleted(e) => e.name,
            Self::MovieAdded(e) | Self::MovieUpdated(e) | Self::MovieDeleted(e) => e.name,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        let (occurred_at, payload) = match self {
            Self::CollectionAdded(e) | Self::CollectionEdited(e) | Self::CollectionDeleted(e) => {
                (e.occurred_at, serde_json::to_value(&e.payload))
            }
            Self::MovieAdded(e) | Self::MovieUpdated(e) | Self::MovieDeleted(e) => {
                (e.occurred_at, serde_json::to_value(&e.payload))
            }
        };
        json!({
            "name": self.name(),
            "occurred_at": occurred_at,
            "payload": payload.unwrap_or(serde_json::Value::Null),
        })
    }
}

/// Event publisher abstraction
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: LibraryEvent);
}

/// Reacts to published events. Handlers run in registration order.
#[async_trait::async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &LibraryEvent);
}

/// A minimal in-memory event bus that stores serialized events.
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    inner: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve and clear all captured events
    pub fn drain(&self) -> Vec<serde_json::Value> {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        std::mem::take(&mut *guard)
    }
}

#[async_trait::async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: LibraryEvent) {
        let value = event.to_json();
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(value);
    }
}

/// Dispatches every published event to the registered handlers.
#[derive(Clone, Default)]
pub struct EventAggregator {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl EventAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .push(handler);
    }
}

#[async_trait::async_trait]
impl EventPublisher for EventAggregator {
    async fn publish(&self, event: LibraryEvent) {
        let handlers: Vec<Arc<dyn EventHandler>> = self
            .handlers
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        debug!(target: "events", name = event.name(), handlers = handlers.len(), "publishing event");
        for handler in handlers {
            handler.handle(&event).await;
        }
    }
}

#[async_trait::async_trait]
impl EventHandler for InMemoryEventBus {
    async fn handle(&self, event: &LibraryEvent) {
        self.publish(event.clone()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_domain::{
        CollectionPayload, DomainEvent, MovieCollection, MovieId, MovieUpdatedPayload,
    };

    #[tokio::test]
    async fn publish_and_drain_events() {
        let bus = InMemoryEventBus::new();
        assert!(bus.is_empty());

        let payload = MovieUpdatedPayload {
            movie_id: MovieId::new(),
            title: "Heat".to_string(),
            monitored: false,
        };
        bus.publish(LibraryEvent::MovieUpdated(DomainEvent::new("movie.updated", payload)))
            .await;
        assert_eq!(bus.len(), 1);

        let drained = bus.drain();
        assert_eq!(drained[0]["name"], "movie.updated");
        assert_eq!(drained[0]["payload"]["title"], "Heat");
        assert!(bus.is_empty());
    }

    #[tokio::test]
    async fn aggregator_fans_out_to_handlers() {
        let aggregator = EventAggregator::new();
        let first = InMemoryEventBus::new();
        let second = InMemoryEventBus::new();
        aggregator.subscribe(Arc::new(first.clone()));
        aggregator.subscribe(Arc::new(second.clone()));

        let collection = MovieCollection::new(1, "Alien Collection");
        aggregator
            .publish(LibraryEvent::CollectionAdded(DomainEvent::new(
                "collection.added",
                CollectionPayload { collection },
            )))
            .await;

        assert_eq!(first.len(), 1);
        assert_eq!(second.drain()[0]["payload"]["collection"]["tmdb_id"], 1);
    }
}
