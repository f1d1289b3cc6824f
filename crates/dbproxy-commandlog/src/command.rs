use dbproxy_backend::{Scalar, Statement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub type Values = BTreeMap<String, Scalar>;

/// A durable record of a pending write, immutable once constructed.
///
/// Serialises as a JSON object tagged by `type`, matching the file format
/// read and written by [`crate::CommandLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Insert { table: String, values: Values },
    Update { table: String, set: Values, r#where: Values },
    Delete { table: String, r#where: Values },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("invalid command: {0}")]
    Invalid(String),
}

impl Command {
    pub fn insert(table: impl Into<String>, values: Values) -> Self {
        Command::Insert { table: table.into(), values }
    }

    pub fn update(table: impl Into<String>, set: Values, r#where: Values) -> Self {
        Command::Update { table: table.into(), set, r#where }
    }

    pub fn delete(table: impl Into<String>, r#where: Values) -> Self {
        Command::Delete { table: table.into(), r#where }
    }

    pub fn table(&self) -> &str {
        match self {
            Command::Insert { table, .. } => table,
            Command::Update { table, .. } => table,
            Command::Delete { table, .. } => table,
        }
    }

    /// Builds the parameterised statement this command represents.
    ///
    /// `Update` forbids overlap between `set` and `where` column names: the
    /// placeholder namespace is flat, so a shared name would make the
    /// backend unable to tell which clause it belongs to.
    pub fn to_statement(&self) -> Result<Statement, CommandError> {
        match self {
            Command::Insert { table, values } => {
                let cols: Vec<&String> = values.keys().collect();
                let sql = format!(
                    "INSERT INTO {table} ({}) VALUES ({})",
                    join(&cols, ", "),
                    cols.iter().map(|c| format!(":{c}")).collect::<Vec<_>>().join(", ")
                );
                Ok(Statement::with_params(sql, values.clone()))
            }
            Command::Update { table, set, r#where } => {
                for key in set.keys() {
                    if r#where.contains_key(key) {
                        return Err(CommandError::Invalid(format!(
                            "column '{key}' appears in both set and where"
                        )));
                    }
                }
                let set_clause = set
                    .keys()
                    .map(|c| format!("{c} = :{c}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let where_clause = r#where
                    .keys()
                    .map(|c| format!("{c} = :{c}"))
                    .collect::<Vec<_>>()
                    .join(" AND ");
                let sql = format!("UPDATE {table} SET {set_clause} WHERE {where_clause}");
                let mut params = set.clone();
                params.extend(r#where.clone());
                Ok(Statement::with_params(sql, params))
            }
            Command::Delete { table, r#where } => {
                let where_clause = r#where
                    .keys()
                    .map(|c| format!("{c} = :{c}"))
                    .collect::<Vec<_>>()
                    .join(" AND ");
                let sql = format!("DELETE FROM {table} WHERE {where_clause}");
                Ok(Statement::with_params(sql, r#where.clone()))
            }
        }
    }
}

fn join(cols: &[&String], sep: &str) -> String {
    cols.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_builds_expected_statement() {
        let cmd = Command::insert("users", Values::from([("name".to_string(), Scalar::Text("Alice".into()))]));
        let stmt = cmd.to_statement().unwrap();
        assert_eq!(stmt.sql, "INSERT INTO users (name) VALUES (:name)");
    }

    #[test]
    fn update_rejects_overlapping_set_and_where() {
        let cmd = Command::update(
            "users",
            Values::from([("id".to_string(), Scalar::Int(2))]),
            Values::from([("id".to_string(), Scalar::Int(1))]),
        );
        let err = cmd.to_statement().unwrap_err();
        assert!(matches!(err, CommandError::Invalid(_)));
    }

    #[test]
    fn delete_builds_where_clause_with_and() {
        let cmd = Command::delete(
            "users",
            Values::from([("id".to_string(), Scalar::Int(1)), ("active".to_string(), Scalar::Bool(true))]),
        );
        let stmt = cmd.to_statement().unwrap();
        assert!(stmt.sql.starts_with("DELETE FROM users WHERE"));
        assert!(stmt.sql.contains("AND"));
    }

    #[test]
    fn round_trips_through_json_with_type_tag() {
        let cmd = Command::insert("users", Values::from([("name".to_string(), Scalar::Text("Alice".into()))]));
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"type\":\"insert\""));
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(cmd, back);
    }
}
