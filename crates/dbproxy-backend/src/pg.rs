use crate::error::BackendError;
use crate::scalar::Scalar;
use crate::statement::{QueryResult, Row, Statement};
use crate::BackendExecutor;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, Column, PgPool, Row as _};

/// Postgres-backed [`BackendExecutor`].
///
/// A single `PgPool` built once at startup and shared behind an `Arc` by
/// every caller.
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub async fn connect(database_url: &str) -> Result<Self, BackendError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .map_err(|e| BackendError::Connect(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Rewrite `:name` placeholders into positional `$1, $2, ...` markers in
/// first-occurrence order, returning the rewritten SQL and the ordered bind
/// list. Postgres has no native named-parameter support, so every statement
/// built by `Command::to_statement` is translated at the execution boundary.
fn positional(stmt: &Statement) -> (String, Vec<Scalar>) {
    let mut sql = String::with_capacity(stmt.sql.len());
    let mut binds = Vec::new();
    let bytes = stmt.sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b':' && i + 1 < bytes.len() && (bytes[i + 1].is_ascii_alphabetic() || bytes[i + 1] == b'_') {
            let start = i + 1;
            let mut j = start;
            while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
                j += 1;
            }
            let name = &stmt.sql[start..j];
            let value = stmt.params.get(name).cloned().unwrap_or(Scalar::Null);
            binds.push(value);
            sql.push('$');
            sql.push_str(&binds.len().to_string());
            i = j;
        } else {
            sql.push(bytes[i] as char);
            i += 1;
        }
    }
    (sql, binds)
}

fn bind_query<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    binds: &'q [Scalar],
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    for value in binds {
        query = match value {
            Scalar::Null => query.bind(None::<String>),
            Scalar::Bool(b) => query.bind(*b),
            Scalar::Int(i) => query.bind(*i),
            Scalar::Float(f) => query.bind(*f),
            Scalar::Text(s) => query.bind(s.as_str()),
        };
    }
    query
}

fn rows_from_pg(rows: Vec<sqlx::postgres::PgRow>) -> Vec<Row> {
    rows.into_iter()
        .map(|pg_row| {
            let mut row = Row::new();
            for col in pg_row.columns() {
                let name = col.name().to_string();
                let value: Scalar = pg_row
                    .try_get::<Option<String>, _>(col.ordinal())
                    .map(|v| v.map(Scalar::Text).unwrap_or(Scalar::Null))
                    .or_else(|_| {
                        pg_row
                            .try_get::<Option<i64>, _>(col.ordinal())
                            .map(|v| v.map(Scalar::Int).unwrap_or(Scalar::Null))
                    })
                    .or_else(|_| {
                        pg_row
                            .try_get::<Option<f64>, _>(col.ordinal())
                            .map(|v| v.map(Scalar::Float).unwrap_or(Scalar::Null))
                    })
                    .or_else(|_| {
                        pg_row
                            .try_get::<Option<bool>, _>(col.ordinal())
                            .map(|v| v.map(Scalar::Bool).unwrap_or(Scalar::Null))
                    })
                    .unwrap_or(Scalar::Null);
                row.insert(name, value);
            }
            row
        })
        .collect()
}

#[async_trait]
impl BackendExecutor for PgBackend {
    async fn ping(&self) -> Result<(), BackendError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| BackendError::Ping(e.to_string()))?;
        Ok(())
    }

    async fn execute(&self, stmt: &Statement) -> Result<QueryResult, BackendError> {
        let (sql, binds) = positional(stmt);
        let query = bind_query(sqlx::query(&sql), &binds);
        let result = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BackendError::Query(e.to_string()))?;
        let rows_affected = result.len() as u64;
        Ok(QueryResult {
            rows: rows_from_pg(result),
            rows_affected,
        })
    }

    async fn execute_in_transaction(&self, stmts: &[Statement]) -> Result<QueryResult, BackendError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| BackendError::Transaction(e.to_string()))?;
        let mut last = QueryResult::empty();
        for stmt in stmts {
            let (sql, binds) = positional(stmt);
            let query = bind_query(sqlx::query(&sql), &binds);
            match query.fetch_all(&mut *tx).await {
                Ok(rows) => {
                    last = QueryResult {
                        rows_affected: rows.len() as u64,
                        rows: rows_from_pg(rows),
                    };
                }
                Err(e) => {
                    let _ = tx.rollback().await;
                    return Err(BackendError::Transaction(e.to_string()));
                }
            }
        }
        tx.commit().await.map_err(|e| BackendError::Transaction(e.to_string()))?;
        Ok(last)
    }
}
