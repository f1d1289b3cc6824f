use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub node: String,
    pub status: NodeStatus,
}

/// An observer reacting to node status transitions. Dispatch is synchronous
/// and on the caller's thread — an observer that needs to do slow work
/// should hand it off itself rather than block its peers.
pub trait Observer: Send + Sync {
    fn on_status_event(&self, event: &StatusEvent);
}

/// Minimal synchronous subject: notifies every registered observer, in
/// registration order, on every event. Registration is idempotent by
/// pointer identity.
#[derive(Default)]
pub struct EventBus {
    observers: Mutex<Vec<Arc<dyn Observer>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer>) {
        let mut observers = self.observers.lock().unwrap();
        if !observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            observers.push(observer);
        }
    }

    pub fn notify(&self, event: StatusEvent) {
        let observers = self.observers.lock().unwrap().clone();
        for observer in observers {
            observer.on_status_event(&event);
        }
    }
}
