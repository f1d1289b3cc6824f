//! Routing, selection and broadcast-write coordination across a set of
//! homogeneous database replicas.

mod classifier;
mod error;
mod event_bus;
mod executor_facade;
mod node;
mod registry;
mod router;
mod strategy;

pub use classifier::{classify, StatementKind};
pub use error::{ProxyError, RouteOp};
pub use event_bus::{EventBus, NodeStatus, Observer, StatusEvent};
pub use executor_facade::{ExecResult, ExecutorFacade};
pub use node::{LatencyStats, Node};
pub use registry::NodeRegistry;
pub use router::Router;
pub use strategy::{strategy_by_name, LeastTime, RoundRobin, SelectionStrategy, WeightedRoundRobin};
