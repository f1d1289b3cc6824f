use dbproxy_backend::BackendExecutor;
use dbproxy_core::{EventBus, NodeStatus, StatusEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Periodically pings every node and emits a [`StatusEvent`] on the bus only
/// when a node's status actually changes. The monitor does not schedule
/// itself — [`HealthMonitor::spawn_loop`] is the cooperative driver.
pub struct HealthMonitor {
    executors: HashMap<String, Arc<dyn BackendExecutor>>,
    last_status: Mutex<HashMap<String, NodeStatus>>,
    bus: Arc<EventBus>,
    probe_timeout: Duration,
}

impl HealthMonitor {
    pub fn new(executors: HashMap<String, Arc<dyn BackendExecutor>>, bus: Arc<EventBus>, probe_timeout: Duration) -> Self {
        Self {
            executors,
            last_status: Mutex::new(HashMap::new()),
            bus,
            probe_timeout,
        }
    }

    /// Pings every node, in no particular order, and notifies the bus for
    /// each node whose status changed since the previous call.
    pub async fn run_check(&self) {
        let mut checks = Vec::with_capacity(self.executors.len());
        for (name, executor) in &self.executors {
            let name = name.clone();
            let executor = executor.clone();
            let timeout = self.probe_timeout;
            checks.push(async move {
                let up = tokio::time::timeout(timeout, executor.ping()).await.map(|r| r.is_ok()).unwrap_or(false);
                (name, up)
            });
        }
        let results = futures_util::future::join_all(checks).await;
        for (name, up) in results {
            let candidate = if up { NodeStatus::Up } else { NodeStatus::Down };
            let mut last_status = self.last_status.lock().unwrap();
            let changed = last_status.get(&name) != Some(&candidate);
            if changed {
                last_status.insert(name.clone(), candidate);
                drop(last_status);
                tracing::info!(node = %name, status = ?candidate, "node status transition");
                self.bus.notify(StatusEvent { node: name, status: candidate });
            }
        }
    }

    /// Spawns the cooperative task that calls `run_check` every `interval`,
    /// stopping when `shutdown` fires.
    pub fn spawn_loop(self: Arc<Self>, interval: Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_check().await;
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbproxy_backend::FakeBackend;
    use dbproxy_core::Observer;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingObserver {
        events: AtomicUsize,
    }

    impl Observer for CountingObserver {
        fn on_status_event(&self, _event: &StatusEvent) {
            self.events.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn emits_exactly_one_down_transition_then_nothing() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_ping_failing(true);
        let mut executors: HashMap<String, Arc<dyn BackendExecutor>> = HashMap::new();
        executors.insert("db2".to_string(), backend);

        let bus = Arc::new(EventBus::new());
        let observer = Arc::new(CountingObserver { events: AtomicUsize::new(0) });
        bus.subscribe(observer.clone());

        let monitor = HealthMonitor::new(executors, bus, Duration::from_millis(200));
        monitor.run_check().await;
        monitor.run_check().await;
        assert_eq!(observer.events.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_and_emits_up_transition() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_ping_failing(true);
        let mut executors: HashMap<String, Arc<dyn BackendExecutor>> = HashMap::new();
        executors.insert("db2".to_string(), backend.clone());

        let bus = Arc::new(EventBus::new());
        let observer = Arc::new(CountingObserver { events: AtomicUsize::new(0) });
        bus.subscribe(observer.clone());
        let monitor = HealthMonitor::new(executors, bus, Duration::from_millis(200));

        monitor.run_check().await;
        backend.set_ping_failing(false);
        monitor.run_check().await;
        assert_eq!(observer.events.load(Ordering::SeqCst), 2);
    }
}
