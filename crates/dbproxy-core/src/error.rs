use thiserror::Error;

/// Operation a routing failure occurred for, so callers can tell a failed
/// read from a failed write without matching on the node list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOp {
    Read,
    Write,
}

impl std::fmt::Display for RouteOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteOp::Read => write!(f, "READ"),
            RouteOp::Write => write!(f, "WRITE"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no enabled nodes available for {0}")]
    NoEnabledNodes(RouteOp),
    #[error("backend '{node}' unavailable: {cause}")]
    BackendUnavailable { node: String, cause: String },
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("command log io error: {0}")]
    LogIOError(String),
}
