use dbproxy_backend::BackendExecutor;
use dbproxy_commandlog::CommandLog;
use dbproxy_core::{NodeRegistry, NodeStatus, Observer, StatusEvent};
use std::collections::HashMap;
use std::sync::Arc;

/// Disables a node the instant it goes DOWN. Enabling is never this
/// observer's job — a node only becomes routable again after
/// [`RecoveryObserver`] has drained its command log.
pub struct FailoverObserver {
    registry: Arc<NodeRegistry>,
}

impl FailoverObserver {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self { registry }
    }
}

impl Observer for FailoverObserver {
    fn on_status_event(&self, event: &StatusEvent) {
        if event.status == NodeStatus::Down {
            self.registry.disable(&event.node);
        }
    }
}

/// On UP, replays the node's command log against its backend and only then
/// re-enables it. A node that fails replay stays disabled.
pub struct RecoveryObserver {
    registry: Arc<NodeRegistry>,
    logs: HashMap<String, Arc<CommandLog>>,
    executors: HashMap<String, Arc<dyn BackendExecutor>>,
}

impl RecoveryObserver {
    pub fn new(
        registry: Arc<NodeRegistry>,
        logs: HashMap<String, Arc<CommandLog>>,
        executors: HashMap<String, Arc<dyn BackendExecutor>>,
    ) -> Self {
        Self { registry, logs, executors }
    }
}

impl Observer for RecoveryObserver {
    fn on_status_event(&self, event: &StatusEvent) {
        if event.status != NodeStatus::Up {
            return;
        }
        let Some(log) = self.logs.get(&event.node).cloned() else {
            tracing::warn!(node = %event.node, "no command log registered, cannot recover");
            return;
        };
        let Some(executor) = self.executors.get(&event.node).cloned() else {
            tracing::warn!(node = %event.node, "no executor registered, cannot recover");
            return;
        };
        let registry = self.registry.clone();
        let node = event.node.clone();
        tokio::spawn(async move {
            match log.replay(executor.as_ref()).await {
                Ok(()) => {
                    registry.enable(&node);
                    tracing::info!(node = %node, "replay succeeded, node re-enabled");
                }
                Err(cause) => {
                    tracing::warn!(node = %node, %cause, "replay failed, node stays disabled");
                }
            }
        });
    }
}
