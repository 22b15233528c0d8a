//! Structured statements rendered to parameterized SQL.
//!
//! The engine plans mutations as data and renders them once, so a
//! dry-run can report the exact statement a live run would execute.

use std::fmt;

use crate::row::Row;
use crate::value::Value;

/// Escape a SQL identifier for double-quoting.
fn escape_identifier(identifier: &str) -> String {
    identifier.replace('"', "\"\"")
}

/// A single WHERE condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `"field" = $n`
    Eq { field: String, value: Value },
    /// `"field" IS NULL`
    IsNull { field: String },
    /// A caller-supplied filter clause, passed through verbatim.
    Raw(String),
}

impl Predicate {
    /// Build the equality predicate for a field, using `IS NULL` when
    /// the value is null.
    #[must_use]
    pub fn for_value(field: impl Into<String>, value: &Value) -> Self {
        let field = field.into();
        if value.is_null() {
            Predicate::IsNull { field }
        } else {
            Predicate::Eq {
                field,
                value: value.clone(),
            }
        }
    }

    fn render(&self, args: &mut Vec<Value>) -> String {
        match self {
            Predicate::Eq { field, value } => {
                args.push(value.clone());
                format!("\"{}\" = ${}", escape_identifier(field), args.len())
            }
            Predicate::IsNull { field } => {
                format!("\"{}\" IS NULL", escape_identifier(field))
            }
            Predicate::Raw(clause) => clause.clone(),
        }
    }
}

/// An UPDATE over a change set, scoped by predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateStatement {
    /// Target table.
    pub table: String,
    /// Field assignments in order.
    pub assignments: Vec<(String, Value)>,
    /// WHERE conditions, ANDed together.
    pub predicates: Vec<Predicate>,
}

impl UpdateStatement {
    /// Render to SQL with `$n` placeholders and the bound arguments.
    #[must_use]
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut args = Vec::new();
        let sets: Vec<String> = self
            .assignments
            .iter()
            .map(|(field, value)| {
                args.push(value.clone());
                format!("\"{}\" = ${}", escape_identifier(field), args.len())
            })
            .collect();
        let conditions: Vec<String> = self
            .predicates
            .iter()
            .map(|p| p.render(&mut args))
            .collect();
        let mut sql = format!(
            "UPDATE \"{}\" SET {}",
            escape_identifier(&self.table),
            sets.join(", ")
        );
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        (sql, args)
    }
}

/// A DELETE scoped by predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteStatement {
    /// Target table.
    pub table: String,
    /// WHERE conditions, ANDed together.
    pub predicates: Vec<Predicate>,
}

impl DeleteStatement {
    /// Render to SQL with `$n` placeholders and the bound arguments.
    #[must_use]
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut args = Vec::new();
        let conditions: Vec<String> = self
            .predicates
            .iter()
            .map(|p| p.render(&mut args))
            .collect();
        let mut sql = format!("DELETE FROM \"{}\"", escape_identifier(&self.table));
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        (sql, args)
    }
}

/// A mutating statement the engine can issue through a [`crate::Store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// An UPDATE statement.
    Update(UpdateStatement),
    /// A DELETE statement.
    Delete(DeleteStatement),
}

impl Statement {
    /// The table the statement targets.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Statement::Update(s) => &s.table,
            Statement::Delete(s) => &s.table,
        }
    }

    /// Render to SQL with `$n` placeholders and the bound arguments.
    #[must_use]
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        match self {
            Statement::Update(s) => s.to_sql(),
            Statement::Delete(s) => s.to_sql(),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sql, args) = self.to_sql();
        write!(f, "{sql} {args:?}")
    }
}

/// A read of current rows, optionally filtered by a raw clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    /// Table to read.
    pub table: String,
    /// Optional raw WHERE clause (without the `WHERE` keyword).
    pub filter: Option<String>,
}

impl SelectQuery {
    /// Create a query over a whole table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
        }
    }

    /// Restrict the query with a raw filter clause.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Render to SQL. Raw filters carry no bound arguments.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match &self.filter {
            Some(filter) => format!(
                "SELECT * FROM \"{}\" WHERE {}",
                escape_identifier(&self.table),
                filter
            ),
            None => format!("SELECT * FROM \"{}\"", escape_identifier(&self.table)),
        }
    }
}

/// Render an INSERT for a row. Used by SQL backends; the in-memory
/// backend stores the row directly.
#[must_use]
pub fn insert_sql(table: &str, row: &Row) -> (String, Vec<Value>) {
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut args = Vec::new();
    for (name, value) in row.iter() {
        args.push(value.clone());
        columns.push(format!("\"{}\"", escape_identifier(name)));
        placeholders.push(format!("${}", args.len()));
    }
    let sql = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        escape_identifier(table),
        columns.join(", "),
        placeholders.join(", ")
    );
    (sql, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_rendering() {
        let stmt = UpdateStatement {
            table: "users".to_string(),
            assignments: vec![
                ("name".to_string(), Value::from("a2")),
                ("email".to_string(), Value::Null),
            ],
            predicates: vec![Predicate::Eq {
                field: "id".to_string(),
                value: Value::from(1i64),
            }],
        };
        let (sql, args) = stmt.to_sql();
        assert_eq!(
            sql,
            "UPDATE \"users\" SET \"name\" = $1, \"email\" = $2 WHERE \"id\" = $3"
        );
        assert_eq!(args, vec![Value::from("a2"), Value::Null, Value::from(1i64)]);
    }

    #[test]
    fn test_null_key_renders_is_null_without_argument() {
        let stmt = DeleteStatement {
            table: "users".to_string(),
            predicates: vec![
                Predicate::for_value("id", &Value::from(2i64)),
                Predicate::for_value("email", &Value::Null),
            ],
        };
        let (sql, args) = stmt.to_sql();
        assert_eq!(
            sql,
            "DELETE FROM \"users\" WHERE \"id\" = $1 AND \"email\" IS NULL"
        );
        assert_eq!(args, vec![Value::from(2i64)]);
    }

    #[test]
    fn test_raw_filter_is_anded_first() {
        let stmt = UpdateStatement {
            table: "users".to_string(),
            assignments: vec![("name".to_string(), Value::from("x"))],
            predicates: vec![
                Predicate::Raw("tenant = 'acme'".to_string()),
                Predicate::Eq {
                    field: "id".to_string(),
                    value: Value::from(7i64),
                },
            ],
        };
        let (sql, _) = stmt.to_sql();
        assert_eq!(
            sql,
            "UPDATE \"users\" SET \"name\" = $1 WHERE tenant = 'acme' AND \"id\" = $2"
        );
    }

    #[test]
    fn test_identifier_escaping() {
        let (sql, _) = insert_sql("odd\"table", &Row::new().with("a\"b", 1i64));
        assert!(sql.starts_with("INSERT INTO \"odd\"\"table\""));
        assert!(sql.contains("\"a\"\"b\""));
    }

    #[test]
    fn test_select_query() {
        assert_eq!(
            SelectQuery::new("users").to_sql(),
            "SELECT * FROM \"users\""
        );
        assert_eq!(
            SelectQuery::new("users").with_filter("active = true").to_sql(),
            "SELECT * FROM \"users\" WHERE active = true"
        );
    }
}
