//! Change notifications for observers of the catalog.
//!
//! Delivery is best-effort: a subscriber that falls behind the channel
//! capacity skips events, and emitting with no subscribers is not an error.

use appshelf_core::AppId;
use appshelf_remote::Requirements;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 1024;

/// Something observers of a [`Library`](crate::Library) may want to redraw for.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    /// A new snapshot replaced the previous one.
    SnapshotPublished { generation: u64, records: usize },
    /// A verification probe finished for `id`.
    AvailabilityChanged {
        id: AppId,
        available: Option<bool>,
        verified: usize,
    },
    /// New classifications were fetched and cached.
    ClassificationsUpdated { fetched: usize },
    RequirementsLoaded {
        id: AppId,
        requirements: Requirements,
    },
    Status(String),
    Error(String),
}

/// Broadcast sender shared by every engine component.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CatalogEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: CatalogEvent) {
        // Err only means nobody is listening.
        let _ = self.tx.send(event);
    }

    pub fn status(&self, msg: impl Into<String>) {
        let msg = msg.into();
        log::info!("{msg}");
        self.emit(CatalogEvent::Status(msg));
    }

    pub fn error(&self, msg: impl Into<String>) {
        let msg = msg.into();
        log::warn!("{msg}");
        self.emit(CatalogEvent::Error(msg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new();
        bus.status("nobody listening");
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.status("one");
        bus.error("two");
        assert_eq!(rx.recv().await.unwrap(), CatalogEvent::Status("one".into()));
        assert_eq!(rx.recv().await.unwrap(), CatalogEvent::Error("two".into()));
    }
}
