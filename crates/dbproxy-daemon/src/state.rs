use dbproxy_core::{EventBus, ExecutorFacade, NodeRegistry, Router};
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

pub const BUILD: BuildInfo = BuildInfo {
    service: "dbproxy-daemon",
    version: env!("CARGO_PKG_VERSION"),
};

static STARTED_AT: OnceLock<Instant> = OnceLock::new();

pub fn uptime_secs() -> u64 {
    STARTED_AT.get_or_init(Instant::now).elapsed().as_secs()
}

/// Shared state behind every route handler: the registry routing decisions
/// read from, the router/facade pair that executes them, and the bus that
/// liveness transitions flow through.
pub struct AppState {
    pub registry: Arc<NodeRegistry>,
    pub router: Arc<Router>,
    pub facade: Arc<ExecutorFacade>,
    pub bus: Arc<EventBus>,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(registry: Arc<NodeRegistry>, router: Arc<Router>, facade: Arc<ExecutorFacade>, bus: Arc<EventBus>) -> Self {
        let _ = STARTED_AT.get_or_init(Instant::now);
        Self {
            registry,
            router,
            facade,
            bus,
            build: BUILD,
        }
    }
}
