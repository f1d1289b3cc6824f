//! Liveness monitoring and the two observers that react to it:
//! [`FailoverObserver`] removes a node from the routing pool the instant it
//! goes down, [`RecoveryObserver`] drains its command log before letting it
//! back in.

mod monitor;
mod observers;

pub use monitor::HealthMonitor;
pub use observers::{FailoverObserver, RecoveryObserver};
