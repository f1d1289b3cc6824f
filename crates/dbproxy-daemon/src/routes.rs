//! Axum router and all HTTP handlers. `build_router` is the single entry
//! point; `main.rs` calls it and attaches middleware layers. Scenario tests
//! under `tests/` build the router the same way and drive it with
//! `tower::ServiceExt::oneshot`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use dbproxy_backend::{Scalar, Statement};
use dbproxy_commandlog::{Command, Values};
use dbproxy_core::{strategy_by_name, NodeStatus, ProxyError, StatusEvent};
use tracing::info;

use crate::api_types::{
    proxy_error_status, users_response, ErrorResponse, HealthResponse, NodeView, QueuedResponse, StrategyResponse,
    UserCreateRequest, UserUpdateRequest, WriteResponse,
};
use crate::state::{uptime_secs, AppState};

pub struct ApiError(ProxyError);

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = proxy_error_status(&self.0);
        if status == StatusCode::ACCEPTED {
            return (status, Json(QueuedResponse { queued: true, reason: self.0.to_string() })).into_response();
        }
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", put(update_user).delete(delete_user))
        .route("/nodes", get(list_nodes))
        .route("/nodes/:name/:action", post(set_node_enabled))
        .route("/strategy/:name", post(set_strategy))
        .with_state(state)
}

async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
            uptime_secs: uptime_secs(),
        }),
    )
}

async fn list_users(State(st): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let stmt = Statement::new("SELECT id, name FROM users ORDER BY id");
    let result = st.facade.read(&stmt).await?;
    Ok((StatusCode::OK, Json(users_response(result))))
}

async fn create_user(State(st): State<Arc<AppState>>, Json(body): Json<UserCreateRequest>) -> Result<impl IntoResponse, ApiError> {
    let values: Values = BTreeMap::from([("name".to_string(), Scalar::Text(body.name))]);
    let command = Command::insert("users", values);
    let stmt = command.to_statement().map_err(|e| ProxyError::InvalidCommand(e.to_string()))?;
    let result = st.facade.write(&stmt, Some(&command)).await?;
    info!(rows = result.rows.len(), "user created");
    Ok((
        StatusCode::CREATED,
        Json(WriteResponse { served_by: result.served_by, rows_returned: result.rows.len() }),
    ))
}

async fn update_user(
    State(st): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<UserUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let set: Values = BTreeMap::from([("name".to_string(), Scalar::Text(body.name))]);
    let condition: Values = BTreeMap::from([("id".to_string(), Scalar::Int(id))]);
    let command = Command::update("users", set, condition);
    let stmt = command.to_statement().map_err(|e| ProxyError::InvalidCommand(e.to_string()))?;
    let result = st.facade.write(&stmt, Some(&command)).await?;
    Ok((
        StatusCode::OK,
        Json(WriteResponse { served_by: result.served_by, rows_returned: result.rows.len() }),
    ))
}

async fn delete_user(State(st): State<Arc<AppState>>, Path(id): Path<i64>) -> Result<impl IntoResponse, ApiError> {
    let condition: Values = BTreeMap::from([("id".to_string(), Scalar::Int(id))]);
    let command = Command::delete("users", condition);
    let stmt = command.to_statement().map_err(|e| ProxyError::InvalidCommand(e.to_string()))?;
    let result = st.facade.write(&stmt, Some(&command)).await?;
    Ok((
        StatusCode::OK,
        Json(WriteResponse { served_by: result.served_by, rows_returned: result.rows.len() }),
    ))
}

async fn list_nodes(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let nodes: Vec<NodeView> = st
        .registry
        .all_snapshot()
        .iter()
        .map(|node| NodeView {
            name: node.name.clone(),
            enabled: node.is_enabled(),
            weight: node.weight,
            avg_latency_us: (node.latency.count() > 0).then(|| node.latency.average()),
        })
        .collect();
    (StatusCode::OK, Json(nodes))
}

async fn set_node_enabled(State(st): State<Arc<AppState>>, Path((name, action)): Path<(String, String)>) -> Response {
    let status = match action.as_str() {
        "disable" => NodeStatus::Down,
        "enable" => NodeStatus::Up,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse { error: format!("unknown node action '{action}'") }),
            )
                .into_response()
        }
    };
    st.bus.notify(StatusEvent { node: name.clone(), status });
    match st.registry.get(&name) {
        Some(node) => (
            StatusCode::OK,
            Json(NodeView {
                name: node.name.clone(),
                enabled: node.is_enabled(),
                weight: node.weight,
                avg_latency_us: (node.latency.count() > 0).then(|| node.latency.average()),
            }),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, Json(ErrorResponse { error: format!("unknown node '{name}'") })).into_response(),
    }
}

async fn set_strategy(State(st): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match strategy_by_name(&name) {
        Some(strategy) => {
            st.router.set_strategy(strategy);
            (StatusCode::OK, Json(StrategyResponse { strategy: st.router.strategy_name() })).into_response()
        }
        None => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse { error: format!("unknown strategy '{name}'") }),
        )
            .into_response(),
    }
}
