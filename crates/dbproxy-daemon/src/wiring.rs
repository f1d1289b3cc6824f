use anyhow::Context;
use dbproxy_backend::{BackendExecutor, PgBackend};
use dbproxy_commandlog::CommandLog;
use dbproxy_config::ProxyConfig;
use dbproxy_core::{strategy_by_name, EventBus, ExecutorFacade, NodeRegistry, Router};
use dbproxy_health::{FailoverObserver, HealthMonitor, RecoveryObserver};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

/// Builds the shared application state and the (not yet started) health
/// monitor from a validated [`ProxyConfig`]: connects every node, opens its
/// command log, wires the router/facade/event-bus/observer graph the way
/// `main.rs` would at startup, but without starting the periodic loop —
/// callers decide when to spawn it.
pub async fn build(config: &ProxyConfig) -> anyhow::Result<(Arc<AppState>, Arc<HealthMonitor>)> {
    let registry = Arc::new(NodeRegistry::new());
    let mut executors: HashMap<String, Arc<dyn BackendExecutor>> = HashMap::new();
    let mut logs: HashMap<String, Arc<CommandLog>> = HashMap::new();

    for db in &config.databases {
        let backend: Arc<dyn BackendExecutor> = Arc::new(
            PgBackend::connect(&db.url)
                .await
                .with_context(|| format!("connect to node '{}'", db.name))?,
        );
        registry.add(&db.name, backend.clone(), db.weight);
        executors.insert(db.name.clone(), backend);

        let log_path = config.command_log_dir.join(format!("command_{}.json", db.name));
        let log = CommandLog::open(&log_path)
            .await
            .with_context(|| format!("open command log for '{}'", db.name))?;
        logs.insert(db.name.clone(), Arc::new(log));
    }

    let strategy = strategy_by_name(&config.strategy)
        .expect("config validation already rejected unknown strategies");
    let router = Arc::new(Router::new(registry.clone(), strategy));
    let facade = Arc::new(ExecutorFacade::new(router.clone(), registry.clone(), logs.clone()));

    let bus = Arc::new(EventBus::new());
    bus.subscribe(Arc::new(FailoverObserver::new(registry.clone())));
    bus.subscribe(Arc::new(RecoveryObserver::new(registry.clone(), logs, executors.clone())));

    let monitor = Arc::new(HealthMonitor::new(
        executors,
        bus.clone(),
        Duration::from_millis(config.health.probe_timeout_millis),
    ));

    let state = Arc::new(AppState::new(registry, router, facade, bus));
    Ok((state, monitor))
}
