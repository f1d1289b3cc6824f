use crate::error::{ProxyError, RouteOp};
use crate::registry::NodeRegistry;
use crate::router::Router;
use dbproxy_backend::{Row, Statement};
use dbproxy_commandlog::{Command, CommandLog};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Result of a read or write, carrying the name of the node that actually
/// served it (§3, Result).
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub rows: Vec<Row>,
    pub served_by: String,
}

/// The single entry point client code calls to run a classified statement.
/// Read path fails over across enabled nodes; write path broadcasts and
/// journals to whatever is currently disabled.
pub struct ExecutorFacade {
    router: Arc<Router>,
    registry: Arc<NodeRegistry>,
    logs: HashMap<String, Arc<CommandLog>>,
}

impl ExecutorFacade {
    pub fn new(router: Arc<Router>, registry: Arc<NodeRegistry>, logs: HashMap<String, Arc<CommandLog>>) -> Self {
        Self { router, registry, logs }
    }

    pub async fn read(&self, stmt: &Statement) -> Result<ExecResult, ProxyError> {
        let first = self.router.route_read()?;
        let mut candidates = vec![first.clone()];
        candidates.extend(
            self.registry
                .enabled_snapshot()
                .into_iter()
                .filter(|n| n.name != first.name),
        );

        for node in candidates {
            let t0 = Instant::now();
            match node.executor.execute(stmt).await {
                Ok(result) => {
                    self.registry.record_latency(&node.name, t0.elapsed());
                    return Ok(ExecResult {
                        rows: result.rows,
                        served_by: node.name.clone(),
                    });
                }
                Err(cause) => {
                    tracing::warn!(node = %node.name, %cause, "read failed, trying next enabled node");
                }
            }
        }
        Err(ProxyError::NoEnabledNodes(RouteOp::Read))
    }

    /// Broadcasts `stmt` to every enabled node and journals `command` (when
    /// supplied) to every currently-disabled node and to any enabled node
    /// that failed mid-write.
    pub async fn write(&self, stmt: &Statement, command: Option<&Command>) -> Result<ExecResult, ProxyError> {
        let (write_set, journal_set) = self.router.route_write()?;

        let mut representative = None;
        for node in &write_set {
            match node.executor.execute_in_transaction(&[stmt.clone()]).await {
                Ok(result) => {
                    if representative.is_none() {
                        representative = Some(ExecResult {
                            rows: result.rows,
                            served_by: node.name.clone(),
                        });
                    }
                }
                Err(cause) => {
                    tracing::warn!(node = %node.name, %cause, "node was enabled but failed mid-write");
                    self.journal_to(&node.name, command).await?;
                }
            }
        }

        for node in &journal_set {
            self.journal_to(&node.name, command).await?;
        }

        representative.ok_or(ProxyError::BackendUnavailable {
            node: "all enabled nodes".to_string(),
            cause: "every write attempt failed".to_string(),
        })
    }

    /// Runs every statement in `stmts` inside one transaction per
    /// currently-enabled node, committing or rolling back each node
    /// independently — there is no cross-node consensus.
    pub async fn write_transaction(&self, stmts: &[Statement], command: Option<&Command>) -> Result<ExecResult, ProxyError> {
        let (write_set, journal_set) = self.router.route_write()?;
        let mut representative = None;
        for node in &write_set {
            match node.executor.execute_in_transaction(stmts).await {
                Ok(result) => {
                    if representative.is_none() {
                        representative = Some(ExecResult {
                            rows: result.rows,
                            served_by: node.name.clone(),
                        });
                    }
                }
                Err(cause) => {
                    tracing::warn!(node = %node.name, %cause, "node commit failed in multi-statement scope");
                    self.journal_to(&node.name, command).await?;
                }
            }
        }
        for node in &journal_set {
            self.journal_to(&node.name, command).await?;
        }
        representative.ok_or(ProxyError::BackendUnavailable {
            node: "all enabled nodes".to_string(),
            cause: "every commit failed".to_string(),
        })
    }

    async fn journal_to(&self, node_name: &str, command: Option<&Command>) -> Result<(), ProxyError> {
        let Some(command) = command else { return Ok(()) };
        let Some(log) = self.logs.get(node_name) else {
            tracing::warn!(node = node_name, "no command log configured for node, write is lost");
            return Ok(());
        };
        log.append(command.clone())
            .await
            .map_err(|e| ProxyError::LogIOError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NodeRegistry;
    use crate::strategy::RoundRobin;
    use dbproxy_backend::{FakeBackend, Scalar};
    use dbproxy_commandlog::Values;

    async fn facade_with(names: &[&str]) -> (ExecutorFacade, Arc<NodeRegistry>, HashMap<String, Arc<FakeBackend>>, tempfile::TempDir) {
        let registry = Arc::new(NodeRegistry::new());
        let dir = tempfile::tempdir().unwrap();
        let mut backends = HashMap::new();
        let mut logs = HashMap::new();
        for name in names {
            let backend = Arc::new(FakeBackend::new());
            registry.add(*name, backend.clone(), 1);
            backends.insert(name.to_string(), backend);
            let path = dir.path().join(format!("command_{name}.json"));
            logs.insert(name.to_string(), Arc::new(CommandLog::open(path).await.unwrap()));
        }
        let router = Arc::new(Router::new(registry.clone(), Arc::new(RoundRobin::default())));
        let facade = ExecutorFacade::new(router, registry.clone(), logs);
        (facade, registry, backends, dir)
    }

    #[tokio::test]
    async fn broadcast_write_journals_only_to_disabled_node() {
        let (facade, registry, backends, dir) = facade_with(&["db1", "db2", "db3"]).await;
        registry.disable("db3");

        let command = Command::insert("users", Values::from([("name".to_string(), Scalar::Text("Alice".into()))]));
        let stmt = command.to_statement().unwrap();
        let result = facade.write(&stmt, Some(&command)).await.unwrap();
        assert!(result.served_by == "db1" || result.served_by == "db2");

        assert_eq!(backends["db1"].rows_in("users").await.len(), 1);
        assert_eq!(backends["db2"].rows_in("users").await.len(), 1);
        assert!(backends["db3"].rows_in("users").await.is_empty());

        let log_path = dir.path().join("command_db3.json");
        let persisted = tokio::fs::read_to_string(&log_path).await.unwrap();
        let parsed: Vec<Command> = serde_json::from_str(&persisted).unwrap();
        assert_eq!(parsed, vec![command]);
    }

    #[tokio::test]
    async fn read_fails_over_to_next_enabled_node() {
        let (facade, _registry, backends, _dir) = facade_with(&["db1", "db2"]).await;
        backends["db1"].set_failing(true);
        let result = facade.read(&Statement::new("SELECT 1 FROM users")).await.unwrap();
        assert_eq!(result.served_by, "db2");
    }
}
