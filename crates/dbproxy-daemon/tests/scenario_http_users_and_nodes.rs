use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use dbproxy_backend::{BackendExecutor, FakeBackend};
use dbproxy_commandlog::CommandLog;
use dbproxy_core::{EventBus, ExecutorFacade, NodeRegistry, RoundRobin, Router};
use dbproxy_daemon::{routes, state::AppState};
use dbproxy_health::{FailoverObserver, RecoveryObserver};
use http_body_util::BodyExt;
use tower::ServiceExt;

async fn test_state(names: &[&str]) -> (Arc<AppState>, HashMap<String, Arc<FakeBackend>>, tempfile::TempDir) {
    let registry = Arc::new(NodeRegistry::new());
    let dir = tempfile::tempdir().unwrap();
    let mut backends = HashMap::new();
    let mut executors: HashMap<String, Arc<dyn BackendExecutor>> = HashMap::new();
    let mut logs = HashMap::new();
    for name in names {
        let backend = Arc::new(FakeBackend::new());
        registry.add(*name, backend.clone(), 1);
        executors.insert(name.to_string(), backend.clone() as Arc<dyn BackendExecutor>);
        backends.insert(name.to_string(), backend);
        let path = dir.path().join(format!("command_{name}.json"));
        logs.insert(name.to_string(), Arc::new(CommandLog::open(path).await.unwrap()));
    }
    let router = Arc::new(Router::new(registry.clone(), Arc::new(RoundRobin::default())));
    let facade = Arc::new(ExecutorFacade::new(router.clone(), registry.clone(), logs.clone()));
    let bus = Arc::new(EventBus::new());
    bus.subscribe(Arc::new(FailoverObserver::new(registry.clone())));
    bus.subscribe(Arc::new(RecoveryObserver::new(registry.clone(), logs, executors)));
    let state = Arc::new(AppState::new(registry, router, facade, bus));
    (state, backends, dir)
}

#[tokio::test]
async fn post_then_get_users_round_trips_through_the_router() {
    let (state, _backends, _dir) = test_state(&["db1", "db2"]).await;
    let app = routes::build_router(state);

    let create = Request::builder()
        .method("POST")
        .uri("/users")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"name":"Alice"}"#))
        .unwrap();
    let response = app.clone().oneshot(create).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let list = Request::builder().uri("/users").body(Body::empty()).unwrap();
    let response = app.oneshot(list).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["users"][0]["name"], "Alice");
}

#[tokio::test]
async fn disabling_a_node_removes_it_from_nodes_listing_as_enabled() {
    let (state, _backends, _dir) = test_state(&["db1", "db2"]).await;
    let app = routes::build_router(state);

    let disable = Request::builder()
        .method("POST")
        .uri("/nodes/db1/disable")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(disable).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let nodes = Request::builder().uri("/nodes").body(Body::empty()).unwrap();
    let response = app.oneshot(nodes).await.unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let db1 = body.as_array().unwrap().iter().find(|n| n["name"] == "db1").unwrap();
    assert_eq!(db1["enabled"], false);
}

#[tokio::test]
async fn unknown_strategy_is_rejected() {
    let (state, _backends, _dir) = test_state(&["db1"]).await;
    let app = routes::build_router(state);
    let request = Request::builder()
        .method("POST")
        .uri("/strategy/not_a_real_strategy")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
