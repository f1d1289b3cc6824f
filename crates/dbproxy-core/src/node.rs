use dbproxy_backend::BackendExecutor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Rolling latency statistics for a node. `record` is monotonic: `count`
/// only grows. `average` is `+inf` when no samples have been recorded yet,
/// so a never-probed node never wins a least-time comparison against one
/// that has.
#[derive(Debug, Default)]
pub struct LatencyStats {
    total_micros: AtomicU64,
    count: AtomicU64,
}

impl LatencyStats {
    pub fn record(&self, elapsed: Duration) {
        self.total_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn average(&self) -> f64 {
        let count = self.count.load(Ordering::Relaxed);
        if count == 0 {
            return f64::INFINITY;
        }
        self.total_micros.load(Ordering::Relaxed) as f64 / count as f64
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// One backend replica fronted by the proxy.
pub struct Node {
    pub name: String,
    pub executor: Arc<dyn BackendExecutor>,
    pub weight: u32,
    enabled: std::sync::atomic::AtomicBool,
    pub latency: LatencyStats,
}

impl Node {
    pub fn new(name: impl Into<String>, executor: Arc<dyn BackendExecutor>, weight: u32) -> Self {
        Self {
            name: name.into(),
            executor,
            weight: weight.max(1),
            enabled: std::sync::atomic::AtomicBool::new(true),
            latency: LatencyStats::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .field("enabled", &self.is_enabled())
            .field("avg_latency_us", &self.latency.average())
            .finish()
    }
}
