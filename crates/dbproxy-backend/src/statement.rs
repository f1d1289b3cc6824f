use crate::scalar::Scalar;
use std::collections::BTreeMap;

/// A parameterised statement ready to hand to a [`crate::BackendExecutor`].
///
/// Parameter placeholders are `:name`-style; `sql` and `params` are produced
/// either directly by a caller (read path) or derived from a
/// `dbproxy-commandlog::Command` (write/journal path).
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: BTreeMap<String, Scalar>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: BTreeMap<String, Scalar>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// A single row, column name to value. `BTreeMap` gives deterministic
/// iteration order for tests and JSON serialisation.
pub type Row = BTreeMap<String, Scalar>;

/// Outcome of executing a [`Statement`].
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub rows_affected: u64,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }
}
