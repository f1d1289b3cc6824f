use crate::node::Node;
use dbproxy_backend::BackendExecutor;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Inner {
    order: Vec<Arc<Node>>,
    index: HashMap<String, usize>,
}

/// Owns the set of backend nodes. Mutation is serialised under a single
/// lock held only long enough to update membership or produce a snapshot —
/// never across I/O. Iteration order is insertion order, so weighted
/// strategies are deterministic across runs.
#[derive(Default)]
pub struct NodeRegistry {
    inner: Mutex<Inner>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: impl Into<String>, executor: Arc<dyn BackendExecutor>, weight: u32) {
        let name = name.into();
        let node = Arc::new(Node::new(name.clone(), executor, weight));
        let mut inner = self.inner.lock().unwrap();
        if let Some(&idx) = inner.index.get(&name) {
            inner.order[idx] = node;
        } else {
            let idx = inner.order.len();
            inner.order.push(node);
            inner.index.insert(name, idx);
        }
    }

    pub fn remove(&self, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(idx) = inner.index.remove(name) {
            inner.order.remove(idx);
            for v in inner.index.values_mut() {
                if *v > idx {
                    *v -= 1;
                }
            }
        }
    }

    pub fn enable(&self, name: &str) {
        if let Some(node) = self.get(name) {
            node.set_enabled(true);
            tracing::debug!(node = name, "node enabled");
        }
    }

    pub fn disable(&self, name: &str) {
        if let Some(node) = self.get(name) {
            node.set_enabled(false);
            tracing::debug!(node = name, "node disabled");
        }
    }

    pub fn record_latency(&self, name: &str, elapsed: Duration) {
        if let Some(node) = self.get(name) {
            node.latency.record(elapsed);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Node>> {
        let inner = self.inner.lock().unwrap();
        inner.index.get(name).map(|&idx| inner.order[idx].clone())
    }

    pub fn enabled_snapshot(&self) -> Vec<Arc<Node>> {
        let inner = self.inner.lock().unwrap();
        inner.order.iter().filter(|n| n.is_enabled()).cloned().collect()
    }

    pub fn disabled_snapshot(&self) -> Vec<Arc<Node>> {
        let inner = self.inner.lock().unwrap();
        inner.order.iter().filter(|n| !n.is_enabled()).cloned().collect()
    }

    pub fn all_snapshot(&self) -> Vec<Arc<Node>> {
        let inner = self.inner.lock().unwrap();
        inner.order.clone()
    }
}
