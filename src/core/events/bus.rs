use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::base::{Event, TrashEventKind};


pub type EventHandler = Arc<dyn Fn(Event) + Send + Sync>;


pub struct EventBus {
    handlers: Arc<RwLock<HashMap<TrashEventKind, Vec<EventHandler>>>>,
    catch_all: Arc<RwLock<Vec<EventHandler>>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            catch_all: Arc::new(RwLock::new(Vec::new())),
        }
    }


    pub async fn register(&self, kind: TrashEventKind, handler: EventHandler) {
        let mut handlers = self.handlers.write().await;
        handlers.entry(kind).or_default().push(handler);
        debug!("Registered handler for event kind: {}", kind.as_str());
    }


    pub async fn register_all(&self, handler: EventHandler) {
        self.catch_all.write().await.push(handler);
    }

    /// Handlers run on spawned tasks; returns how many were scheduled.
    pub async fn emit(&self, event: Event) -> usize {
        let handlers = self.handlers.read().await;
        let catch_all = self.catch_all.read().await;

        let targeted = handlers.get(&event.kind).map(|h| h.as_slice()).unwrap_or(&[]);
        let mut scheduled = 0;

        for handler in targeted.iter().chain(catch_all.iter()) {
            let handler = Arc::clone(handler);
            let event = event.clone();

            tokio::spawn(async move {
                handler(event);
            });
            scheduled += 1;
        }

        if scheduled == 0 {
            debug!(
                "No handlers for {} (record {})",
                event.kind.as_str(),
                event.record_id
            );
        }
        scheduled
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_event_bus_routes_by_kind() {
        let bus = EventBus::new();
        let cleared = Arc::new(AtomicUsize::new(0));
        let all = Arc::new(AtomicUsize::new(0));

        let cleared_clone = Arc::clone(&cleared);
        bus.register(
            TrashEventKind::Cleared,
            Arc::new(move |_event| {
                cleared_clone.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .await;

        let all_clone = Arc::clone(&all);
        bus.register_all(Arc::new(move |_event| {
            all_clone.fetch_add(1, Ordering::SeqCst);
        }))
        .await;

        assert_eq!(
            bus.emit(Event::new(TrashEventKind::Cleared, "t1", json!({}))).await,
            2
        );
        assert_eq!(
            bus.emit(Event::new(TrashEventKind::Restored, "t2", json!({}))).await,
            1
        );

        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        assert_eq!(cleared.load(Ordering::SeqCst), 1);
        assert_eq!(all.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_emit_without_handlers() {
        let bus = EventBus::default();
        assert_eq!(
            bus.emit(Event::new(TrashEventKind::Created, "t1", json!(null))).await,
            0
        );
    }
}
