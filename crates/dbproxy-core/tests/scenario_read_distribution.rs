use std::sync::Arc;

use dbproxy_backend::{BackendExecutor, FakeBackend};
use dbproxy_core::{ExecutorFacade, NodeRegistry, Router, WeightedRoundRobin};

fn registry_with_weights() -> Arc<NodeRegistry> {
    let registry = Arc::new(NodeRegistry::new());
    registry.add("db1", Arc::new(FakeBackend::new()) as Arc<dyn BackendExecutor>, 3);
    registry.add("db2", Arc::new(FakeBackend::new()) as Arc<dyn BackendExecutor>, 1);
    registry.add("db3", Arc::new(FakeBackend::new()) as Arc<dyn BackendExecutor>, 1);
    registry
}

#[tokio::test]
async fn weighted_reads_follow_the_expected_ten_read_sequence() {
    let registry = registry_with_weights();
    let router = Router::new(registry.clone(), Arc::new(WeightedRoundRobin::default()));
    let facade = ExecutorFacade::new(Arc::new(router), registry, Default::default());

    let stmt = dbproxy_backend::Statement::new("SELECT id FROM users");
    let mut served = Vec::new();
    for _ in 0..10 {
        let result = facade.read(&stmt).await.unwrap();
        served.push(result.served_by);
    }

    assert_eq!(
        served,
        vec!["db1", "db1", "db1", "db2", "db3", "db1", "db1", "db1", "db2", "db3"],
    );
}

#[tokio::test]
async fn disabling_a_node_mid_stream_removes_it_from_later_reads() {
    let registry = registry_with_weights();
    let router = Arc::new(Router::new(registry.clone(), Arc::new(WeightedRoundRobin::default())));
    let facade = ExecutorFacade::new(router, registry.clone(), Default::default());
    let stmt = dbproxy_backend::Statement::new("SELECT id FROM users");

    for _ in 0..5 {
        facade.read(&stmt).await.unwrap();
    }
    registry.disable("db1");

    for _ in 0..4 {
        let result = facade.read(&stmt).await.unwrap();
        assert_ne!(result.served_by, "db1", "db1 is disabled and must not serve reads");
    }
}
