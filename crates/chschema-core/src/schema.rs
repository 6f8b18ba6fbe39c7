//! Schema representation types.
//!
//! These types describe ClickHouse schema objects. A [`TableSchema`] is built
//! fresh for every reconciliation: once from the server's introspection
//! tables (current) and once from the declared configuration (desired).

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

const NULLABLE_PREFIX: &str = "Nullable(";

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Column name, unique within its table.
    pub name: String,
    /// Type name as understood by the server, without the `Nullable` wrapper.
    #[serde(rename = "type")]
    pub column_type: String,
    /// Whether the column can hold NULL values.
    #[serde(default)]
    pub nullable: bool,
    /// Free-text comment, empty when unset.
    #[serde(default)]
    pub comment: String,
}

impl Column {
    /// Creates a new non-nullable column without a comment.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: false,
            comment: String::new(),
        }
    }

    /// Builds a column from a type string reported by the server.
    ///
    /// `Nullable(T)` is unwrapped into `T` with `nullable` set.
    #[must_use]
    pub fn from_introspected(
        name: impl Into<String>,
        raw_type: &str,
        comment: impl Into<String>,
    ) -> Self {
        let (column_type, nullable) = match raw_type
            .strip_prefix(NULLABLE_PREFIX)
            .and_then(|inner| inner.strip_suffix(')'))
        {
            Some(inner) => (inner.to_string(), true),
            None => (raw_type.to_string(), false),
        };

        Self {
            name: name.into(),
            column_type,
            nullable,
            comment: comment.into(),
        }
    }

    /// Marks the column as nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Returns the type as it must be rendered, wrapped in `Nullable(..)`
    /// when the column is nullable.
    #[must_use]
    pub fn full_type(&self) -> String {
        if self.nullable {
            format!("{NULLABLE_PREFIX}{})", self.column_type)
        } else {
            self.column_type.clone()
        }
    }
}

/// Returns the column names in declaration order.
#[must_use]
pub fn names(columns: &[Column]) -> Vec<&str> {
    columns.iter().map(|c| c.name.as_str()).collect()
}

/// Returns the set of column names.
#[must_use]
pub fn column_set(columns: &[Column]) -> HashSet<&str> {
    columns.iter().map(|c| c.name.as_str()).collect()
}

/// Returns the position of the column called `name`.
#[must_use]
pub fn index_of(columns: &[Column], name: &str) -> Option<usize> {
    columns.iter().position(|c| c.name == name)
}

/// Complete schema definition for a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Database holding the table.
    pub database: String,
    /// Table name.
    pub name: String,
    /// Columns in physical order.
    pub columns: Vec<Column>,
    /// Storage engine name, e.g. `MergeTree`.
    pub engine: String,
    /// Positional engine constructor arguments.
    pub engine_params: Vec<String>,
    /// `PARTITION BY` expression, empty when the table is not partitioned.
    pub partition_by: String,
    /// `ORDER BY` expressions.
    pub order_by: Vec<String>,
    /// `PRIMARY KEY` expressions.
    pub primary_key: Vec<String>,
    /// Engine settings.
    pub settings: BTreeMap<String, String>,
    /// Table comment.
    pub comment: String,
}

impl TableSchema {
    /// Creates a new table schema with no columns.
    #[must_use]
    pub fn new(
        database: impl Into<String>,
        name: impl Into<String>,
        engine: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            columns: Vec::new(),
            engine: engine.into(),
            engine_params: Vec::new(),
            partition_by: String::new(),
            order_by: Vec::new(),
            primary_key: Vec::new(),
            settings: BTreeMap::new(),
            comment: String::new(),
        }
    }

    /// Adds a column to the table.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Replaces the column list.
    #[must_use]
    pub fn columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    /// Sets the engine parameters.
    #[must_use]
    pub fn engine_params(mut self, params: Vec<String>) -> Self {
        self.engine_params = params;
        self
    }

    /// Sets the partition expression.
    #[must_use]
    pub fn partition_by(mut self, expr: impl Into<String>) -> Self {
        self.partition_by = expr.into();
        self
    }

    /// Sets the ordering expressions.
    #[must_use]
    pub fn order_by(mut self, exprs: Vec<String>) -> Self {
        self.order_by = exprs;
        self
    }

    /// Sets the primary key expressions.
    #[must_use]
    pub fn primary_key(mut self, exprs: Vec<String>) -> Self {
        self.primary_key = exprs;
        self
    }

    /// Adds an engine setting.
    #[must_use]
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Sets the table comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns `database.name`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }
}

/// Database engines that can be declared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseEngine {
    /// The default engine with non-blocking DROP and RENAME.
    #[default]
    Atomic,
    /// Keeps tables in RAM only.
    Memory,
}

impl DatabaseEngine {
    /// Returns the engine name as the server spells it.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Atomic => "Atomic",
            Self::Memory => "Memory",
        }
    }

    /// Parses an engine name, ignoring case.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "atomic" => Some(Self::Atomic),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema definition for a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// Database name.
    pub name: String,
    /// Database engine.
    #[serde(default)]
    pub engine: DatabaseEngine,
    /// Database comment.
    #[serde(default)]
    pub comment: String,
}

impl DatabaseSchema {
    /// Creates an `Atomic` database without a comment.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            engine: DatabaseEngine::Atomic,
            comment: String::new(),
        }
    }
}

/// Schema definition for a plain view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSchema {
    /// Database holding the view.
    pub database: String,
    /// View name.
    pub name: String,
    /// The `SELECT` statement backing the view.
    pub query: String,
}

impl ViewSchema {
    /// Creates a new view definition.
    #[must_use]
    pub fn new(
        database: impl Into<String>,
        name: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            query: query.into(),
        }
    }

    /// Returns `database.name`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_type_wraps_nullable() {
        assert_eq!(Column::new("a", "Int32").full_type(), "Int32");
        assert_eq!(
            Column::new("a", "Float64").nullable().full_type(),
            "Nullable(Float64)"
        );
    }

    #[test]
    fn test_from_introspected_unwraps_nullable() {
        let col = Column::from_introspected("data", "Nullable(Float64)", "x");
        assert_eq!(col.column_type, "Float64");
        assert!(col.nullable);
        assert_eq!(col.comment, "x");

        let col = Column::from_introspected("date", "Date", "");
        assert_eq!(col.column_type, "Date");
        assert!(!col.nullable);
    }

    #[test]
    fn test_from_introspected_keeps_nested_nullable() {
        let col = Column::from_introspected("tags", "Array(Nullable(String))", "");
        assert_eq!(col.column_type, "Array(Nullable(String))");
        assert!(!col.nullable);
    }

    #[test]
    fn test_column_helpers() {
        let cols = vec![
            Column::new("a", "Int32"),
            Column::new("b", "String"),
            Column::new("c", "Date"),
        ];

        assert_eq!(names(&cols), vec!["a", "b", "c"]);
        assert_eq!(column_set(&cols).len(), 3);
        assert!(column_set(&cols).contains("b"));
        assert_eq!(index_of(&cols, "c"), Some(2));
        assert_eq!(index_of(&cols, "z"), None);
    }

    #[test]
    fn test_column_equality_is_structural() {
        let a = Column::new("a", "Int32");
        assert_eq!(a, Column::new("a", "Int32"));
        assert_ne!(a, Column::new("a", "Int32").nullable());
        assert_ne!(a, Column::new("a", "Int32").comment("c"));
        assert_ne!(a, Column::new("a", "Int64"));
    }

    #[test]
    fn test_table_schema_builder() {
        let table = TableSchema::new("default", "events", "MergeTree")
            .column(Column::new("date", "Date"))
            .column(Column::new("data", "Float64").nullable())
            .order_by(vec!["date".to_string()])
            .setting("index_granularity", "8192");

        assert_eq!(table.full_name(), "default.events");
        assert_eq!(table.columns.len(), 2);
        assert!(table.get_column("data").is_some_and(|c| c.nullable));
        assert_eq!(table.settings["index_granularity"], "8192");
    }

    #[test]
    fn test_database_engine_parse() {
        assert_eq!(DatabaseEngine::parse("Atomic"), Some(DatabaseEngine::Atomic));
        assert_eq!(DatabaseEngine::parse("memory"), Some(DatabaseEngine::Memory));
        assert_eq!(DatabaseEngine::parse("Ordinary"), None);
        assert_eq!(DatabaseEngine::Memory.to_string(), "Memory");
    }
}
