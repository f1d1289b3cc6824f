use crate::error::{ProxyError, RouteOp};
use crate::node::Node;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Pluggable node-selection policy. `pick` fails with `NoEnabledNodes` on an
/// empty set. Implementations own whatever internal cursor they need across
/// calls and must clamp it if the enabled set shrank since the last pick.
pub trait SelectionStrategy: Send + Sync {
    fn pick(&self, enabled: &[Arc<Node>]) -> Result<Arc<Node>, ProxyError>;
    fn name(&self) -> &'static str;
}

fn require_non_empty(enabled: &[Arc<Node>]) -> Result<(), ProxyError> {
    if enabled.is_empty() {
        Err(ProxyError::NoEnabledNodes(RouteOp::Read))
    } else {
        Ok(())
    }
}

#[derive(Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl SelectionStrategy for RoundRobin {
    fn pick(&self, enabled: &[Arc<Node>]) -> Result<Arc<Node>, ProxyError> {
        require_non_empty(enabled)?;
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst) % enabled.len();
        Ok(enabled[idx].clone())
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

struct WeightedCursor {
    index: usize,
    served: u32,
}

pub struct WeightedRoundRobin {
    state: Mutex<WeightedCursor>,
}

impl Default for WeightedRoundRobin {
    fn default() -> Self {
        Self {
            state: Mutex::new(WeightedCursor { index: 0, served: 0 }),
        }
    }
}

impl SelectionStrategy for WeightedRoundRobin {
    fn pick(&self, enabled: &[Arc<Node>]) -> Result<Arc<Node>, ProxyError> {
        require_non_empty(enabled)?;
        let mut state = self.state.lock().unwrap();
        if state.index >= enabled.len() {
            state.index = 0;
            state.served = 0;
        }
        let node = enabled[state.index].clone();
        state.served += 1;
        if state.served >= node.weight {
            state.index = (state.index + 1) % enabled.len();
            state.served = 0;
        }
        Ok(node)
    }

    fn name(&self) -> &'static str {
        "weighted_round_robin"
    }
}

#[derive(Default)]
pub struct LeastTime;

impl SelectionStrategy for LeastTime {
    fn pick(&self, enabled: &[Arc<Node>]) -> Result<Arc<Node>, ProxyError> {
        require_non_empty(enabled)?;
        let mut best = &enabled[0];
        let mut best_avg = best.latency.average();
        for node in &enabled[1..] {
            let avg = node.latency.average();
            if avg < best_avg {
                best = node;
                best_avg = avg;
            }
        }
        Ok(best.clone())
    }

    fn name(&self) -> &'static str {
        "least_time"
    }
}

/// Parses the `strategy` configuration value (§6) into a fresh strategy
/// instance. Unknown names fall back to round robin at the config layer,
/// not here — callers validate before reaching this point.
pub fn strategy_by_name(name: &str) -> Option<Arc<dyn SelectionStrategy>> {
    match name {
        "round_robin" => Some(Arc::new(RoundRobin::default())),
        "weighted_round_robin" => Some(Arc::new(WeightedRoundRobin::default())),
        "least_time" => Some(Arc::new(LeastTime)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NodeRegistry;
    use dbproxy_backend::FakeBackend;
    use std::time::Duration;

    fn registry_with(weights: &[(&str, u32)]) -> NodeRegistry {
        let registry = NodeRegistry::new();
        for (name, weight) in weights {
            registry.add(*name, Arc::new(FakeBackend::new()), *weight);
        }
        registry
    }

    #[test]
    fn round_robin_cycles_in_insertion_order() {
        let registry = registry_with(&[("db1", 1), ("db2", 1), ("db3", 1)]);
        let strategy = RoundRobin::default();
        let enabled = registry.enabled_snapshot();
        let picks: Vec<_> = (0..6).map(|_| strategy.pick(&enabled).unwrap().name.clone()).collect();
        assert_eq!(picks, vec!["db1", "db2", "db3", "db1", "db2", "db3"]);
    }

    #[test]
    fn weighted_round_robin_matches_scenario_s1() {
        let registry = registry_with(&[("db1", 3), ("db2", 1), ("db3", 1)]);
        let strategy = WeightedRoundRobin::default();
        let enabled = registry.enabled_snapshot();
        let picks: Vec<_> = (0..10).map(|_| strategy.pick(&enabled).unwrap().name.clone()).collect();
        assert_eq!(
            picks,
            vec!["db1", "db1", "db1", "db2", "db3", "db1", "db1", "db1", "db2", "db3"]
        );
    }

    #[test]
    fn least_time_prefers_lower_average_and_untried_over_none() {
        let registry = registry_with(&[("db1", 1), ("db2", 1)]);
        let strategy = LeastTime;
        registry.record_latency("db1", Duration::from_millis(50));
        let enabled = registry.enabled_snapshot();
        // db2 has no samples (average = +inf), db1 has a finite average, so
        // db1 wins even though it's "slower than nothing".
        assert_eq!(strategy.pick(&enabled).unwrap().name, "db1");
    }

    #[test]
    fn empty_enabled_set_is_refused() {
        let strategy = RoundRobin::default();
        let err = strategy.pick(&[]).unwrap_err();
        assert!(matches!(err, ProxyError::NoEnabledNodes(_)));
    }
}
