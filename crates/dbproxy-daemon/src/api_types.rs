use dbproxy_backend::{Row, Scalar};
use dbproxy_core::{ExecResult, ProxyError, RouteOp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct UserCreateRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UserUpdateRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub served_by: String,
    pub users: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct WriteResponse {
    pub served_by: String,
    pub rows_returned: usize,
}

#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct NodeView {
    pub name: String,
    pub enabled: bool,
    pub weight: u32,
    pub avg_latency_us: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct StrategyResponse {
    pub strategy: &'static str,
}

pub fn scalar_to_json(value: &Scalar) -> Value {
    match value {
        Scalar::Null => Value::Null,
        Scalar::Bool(b) => Value::Bool(*b),
        Scalar::Int(i) => Value::Number((*i).into()),
        Scalar::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Scalar::Text(s) => Value::String(s.clone()),
    }
}

pub fn row_to_json(row: &Row) -> Value {
    let mut map = Map::new();
    for (k, v) in row {
        map.insert(k.clone(), scalar_to_json(v));
    }
    Value::Object(map)
}

pub fn users_response(result: ExecResult) -> UsersResponse {
    UsersResponse {
        served_by: result.served_by,
        users: result.rows.iter().map(row_to_json).collect(),
    }
}

pub fn proxy_error_status(err: &ProxyError) -> axum::http::StatusCode {
    use axum::http::StatusCode;
    match err {
        ProxyError::NoEnabledNodes(RouteOp::Read) => StatusCode::SERVICE_UNAVAILABLE,
        ProxyError::NoEnabledNodes(RouteOp::Write) => StatusCode::ACCEPTED,
        ProxyError::InvalidCommand(_) => StatusCode::BAD_REQUEST,
        ProxyError::BackendUnavailable { .. } | ProxyError::LogIOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
