use crate::error::BackendError;
use crate::scalar::Scalar;
use crate::statement::{QueryResult, Row, Statement};
use crate::BackendExecutor;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::Mutex;

/// Deterministic in-memory [`BackendExecutor`] for tests.
///
/// A small state machine behind a lock that records exactly what it was
/// told to do, with a failure-injection switch so node-down scenarios
/// don't need a real database.
///
/// The statement grammar understood here is intentionally narrow: it covers
/// exactly the shapes `dbproxy-commandlog::Command::to_statement` and the
/// demo daemon's hand-written `SELECT` emit, not general SQL.
pub struct FakeBackend {
    tables: Mutex<BTreeMap<String, Vec<Row>>>,
    next_id: AtomicI64,
    failing: AtomicBool,
    ping_failing: AtomicBool,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            failing: AtomicBool::new(false),
            ping_failing: AtomicBool::new(false),
        }
    }

    /// Toggle whether `execute`/`execute_in_transaction` fail from now on.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Toggle whether `ping` fails from now on, independent of `set_failing`.
    pub fn set_ping_failing(&self, failing: bool) {
        self.ping_failing.store(failing, Ordering::SeqCst);
    }

    pub async fn rows_in(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    async fn run(&self, stmt: &Statement) -> Result<QueryResult, BackendError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Query("fake backend is failing".into()));
        }
        let lowered = stmt.sql.trim_start().to_ascii_lowercase();
        if lowered.starts_with("select") {
            self.run_select(&stmt.sql).await
        } else if lowered.starts_with("insert") {
            self.run_insert(&stmt.sql, &stmt.params).await
        } else if lowered.starts_with("update") {
            self.run_update(&stmt.sql, &stmt.params).await
        } else if lowered.starts_with("delete") {
            self.run_delete(&stmt.sql, &stmt.params).await
        } else {
            Ok(QueryResult::empty())
        }
    }

    async fn run_select(&self, sql: &str) -> Result<QueryResult, BackendError> {
        let table = table_name_after(sql, "from").ok_or_else(|| {
            BackendError::Query(format!("cannot find table name in: {sql}"))
        })?;
        let mut rows = self.rows_in(&table).await;
        rows.sort_by(|a, b| a.get("id").map(|v| v.to_string()).cmp(&b.get("id").map(|v| v.to_string())));
        Ok(QueryResult {
            rows_affected: rows.len() as u64,
            rows,
        })
    }

    async fn run_insert(&self, sql: &str, params: &BTreeMap<String, Scalar>) -> Result<QueryResult, BackendError> {
        let table = table_name_after(sql, "into")
            .ok_or_else(|| BackendError::Query(format!("cannot find table name in: {sql}")))?;
        let mut row: Row = params.clone();
        row.entry("id".to_string())
            .or_insert_with(|| Scalar::Int(self.next_id.fetch_add(1, Ordering::SeqCst)));
        let mut tables = self.tables.lock().await;
        tables.entry(table).or_default().push(row.clone());
        Ok(QueryResult {
            rows: vec![row],
            rows_affected: 1,
        })
    }

    async fn run_update(&self, sql: &str, params: &BTreeMap<String, Scalar>) -> Result<QueryResult, BackendError> {
        let table = table_name_after(sql, "update")
            .ok_or_else(|| BackendError::Query(format!("cannot find table name in: {sql}")))?;
        let set_cols = columns_between(sql, "set", "where");
        let where_cols = columns_after(sql, "where");
        let mut tables = self.tables.lock().await;
        let rows = tables.entry(table).or_default();
        let mut affected = 0u64;
        for row in rows.iter_mut() {
            if matches_where(row, &where_cols, params) {
                for col in &set_cols {
                    if let Some(v) = params.get(col) {
                        row.insert(col.clone(), v.clone());
                    }
                }
                affected += 1;
            }
        }
        Ok(QueryResult {
            rows: vec![],
            rows_affected: affected,
        })
    }

    async fn run_delete(&self, sql: &str, params: &BTreeMap<String, Scalar>) -> Result<QueryResult, BackendError> {
        let table = table_name_after(sql, "from")
            .ok_or_else(|| BackendError::Query(format!("cannot find table name in: {sql}")))?;
        let where_cols = columns_after(sql, "where");
        let mut tables = self.tables.lock().await;
        let rows = tables.entry(table).or_default();
        let before = rows.len();
        rows.retain(|row| !matches_where(row, &where_cols, params));
        let affected = (before - rows.len()) as u64;
        Ok(QueryResult {
            rows: vec![],
            rows_affected: affected,
        })
    }
}

fn matches_where(row: &Row, where_cols: &[String], params: &BTreeMap<String, Scalar>) -> bool {
    if where_cols.is_empty() {
        return true;
    }
    where_cols.iter().all(|col| {
        let expected_raw = params.get(col);
        let actual_raw = row.get(col);
        match (expected_raw, actual_raw) {
            (Some(e), Some(a)) => scalars_equal(e, a),
            _ => false,
        }
    })
}

fn scalars_equal(a: &Scalar, b: &Scalar) -> bool {
    match (a, b) {
        (Scalar::Int(x), Scalar::Int(y)) => x == y,
        (Scalar::Text(x), Scalar::Text(y)) => x == y,
        (Scalar::Bool(x), Scalar::Bool(y)) => x == y,
        (Scalar::Float(x), Scalar::Float(y)) => (x - y).abs() < f64::EPSILON,
        (Scalar::Null, Scalar::Null) => true,
        _ => a.to_string() == b.to_string(),
    }
}

fn table_name_after(sql: &str, keyword: &str) -> Option<String> {
    let lowered = sql.to_ascii_lowercase();
    let idx = lowered.find(&format!("{keyword} "))?;
    let rest = sql[idx + keyword.len() + 1..].trim_start();
    rest.split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .map(|s| s.to_string())
}

fn columns_after(sql: &str, keyword: &str) -> Vec<String> {
    let lowered = sql.to_ascii_lowercase();
    match lowered.find(&format!("{keyword} ")) {
        Some(idx) => parse_columns(&sql[idx + keyword.len()..]),
        None => vec![],
    }
}

fn columns_between(sql: &str, start_kw: &str, end_kw: &str) -> Vec<String> {
    let lowered = sql.to_ascii_lowercase();
    let start = match lowered.find(&format!("{start_kw} ")) {
        Some(i) => i + start_kw.len(),
        None => return vec![],
    };
    let end = lowered[start..]
        .find(&format!(" {end_kw} "))
        .map(|i| start + i)
        .unwrap_or(sql.len());
    parse_columns(&sql[start..end])
}

/// Parses `a = :a, b = :b` / `a = :a AND b = :b` clauses into column names.
fn parse_columns(clause: &str) -> Vec<String> {
    let upper_split: Vec<&str> = clause.split(|c: char| c == ',').flat_map(|s| {
        // AND is only meaningful in WHERE clauses; splitting here is harmless
        // for SET clauses since they never contain it.
        s.split(" AND ").chain(s.split(" and "))
    }).collect();
    upper_split
        .into_iter()
        .filter_map(|part| part.split('=').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[async_trait]
impl BackendExecutor for FakeBackend {
    async fn ping(&self) -> Result<(), BackendError> {
        if self.ping_failing.load(Ordering::SeqCst) {
            return Err(BackendError::Ping("fake backend ping failing".into()));
        }
        Ok(())
    }

    async fn execute(&self, stmt: &Statement) -> Result<QueryResult, BackendError> {
        self.run(stmt).await
    }

    async fn execute_in_transaction(&self, stmts: &[Statement]) -> Result<QueryResult, BackendError> {
        // Snapshot-free best effort: a failure partway through does not undo
        // earlier statements in this fake, since FakeBackend has no real
        // transaction log to roll back against. Tests that need rollback
        // behaviour assert against PgBackend semantics instead.
        let mut last = QueryResult::empty();
        for stmt in stmts {
            last = self.run(stmt).await?;
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert_stmt(table: &str, cols: &[(&str, Scalar)]) -> Statement {
        let names: Vec<&str> = cols.iter().map(|(k, _)| *k).collect();
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            names.join(", "),
            names.iter().map(|n| format!(":{n}")).collect::<Vec<_>>().join(", ")
        );
        let params = cols.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        Statement::with_params(sql, params)
    }

    #[tokio::test]
    async fn insert_then_select_round_trips() {
        let backend = FakeBackend::new();
        backend
            .execute(&insert_stmt("users", &[("name", Scalar::Text("Alice".into()))]))
            .await
            .unwrap();
        let result = backend
            .execute(&Statement::new("SELECT id, name FROM users ORDER BY id"))
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].get("name"), Some(&Scalar::Text("Alice".into())));
    }

    #[tokio::test]
    async fn update_then_delete_affect_expected_rows() {
        let backend = FakeBackend::new();
        backend
            .execute(&insert_stmt("users", &[("id", Scalar::Int(1)), ("name", Scalar::Text("Bob".into()))]))
            .await
            .unwrap();
        let update = Statement::with_params(
            "UPDATE users SET name = :name WHERE id = :id",
            [("name".to_string(), Scalar::Text("Bobby".into())), ("id".to_string(), Scalar::Int(1))]
                .into_iter()
                .collect(),
        );
        let res = backend.execute(&update).await.unwrap();
        assert_eq!(res.rows_affected, 1);

        let delete = Statement::with_params(
            "DELETE FROM users WHERE id = :id",
            [("id".to_string(), Scalar::Int(1))].into_iter().collect(),
        );
        let res = backend.execute(&delete).await.unwrap();
        assert_eq!(res.rows_affected, 1);
        assert!(backend.rows_in("users").await.is_empty());
    }

    #[tokio::test]
    async fn failing_backend_rejects_execute_but_ping_is_independent() {
        let backend = FakeBackend::new();
        backend.set_failing(true);
        let err = backend.execute(&Statement::new("SELECT 1")).await.unwrap_err();
        assert!(matches!(err, BackendError::Query(_)));
        assert!(backend.ping().await.is_ok());
    }
}
