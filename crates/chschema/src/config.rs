//! Declared desired state.
//!
//! The state file lists databases, tables and views in TOML:
//!
//! ```toml
//! [[databases]]
//! name = "analytics"
//!
//! [[tables]]
//! database = "analytics"
//! name = "events"
//! engine = "MergeTree"
//! order_by = ["id", "date"]
//! columns = [
//!     { name = "id", type = "UInt64" },
//!     { name = "date", type = "Date", comment = "event day" },
//!     { name = "value", type = "Float64", nullable = true },
//! ]
//!
//! [[views]]
//! database = "analytics"
//! name = "recent"
//! query = "SELECT * FROM analytics.events WHERE date > today() - 7"
//! ```
//!
//! Names are validated against a strict identifier pattern and column types
//! against the supported type families. Types and the key, partition and
//! engine argument expressions are rendered unquoted, so they must also be
//! single balanced expressions: no statement separators, no comments, no
//! unterminated strings or parentheses.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use chschema_core::schema::{Column, DatabaseSchema, TableSchema, ViewSchema};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ChError, Result};

/// Type families a column may be declared with.
pub const SUPPORTED_TYPES: &[&str] = &[
    "UInt8",
    "UInt16",
    "UInt32",
    "UInt64",
    "UInt128",
    "UInt256",
    "Int8",
    "Int16",
    "Int32",
    "Int64",
    "Int128",
    "Int256",
    "Float32",
    "Float64",
    "Decimal",
    "Boolean",
    "Bool",
    "String",
    "FixedString",
    "Date",
    "Date32",
    "DateTime",
    "DateTime64",
    "JSON",
    "UUID",
    "LowCardinality",
    "SimpleAggregateFunction",
    "AggregateFunction",
    "IPv4",
    "IPv6",
    "Array",
    "Map",
    "Tuple",
    "Enum8",
    "Enum16",
];

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[a-zA-Z0-9_]+$").unwrap_or_else(|e| unreachable!("invalid regex: {e}"))
});

static COLUMN_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(r"^(?:{})(?:\([^;]*\))?$", SUPPORTED_TYPES.join("|"));
    Regex::new(&pattern).unwrap_or_else(|e| unreachable!("invalid regex: {e}"))
});

/// Declaration of a table.
///
/// `engine_params`, `primary_key` and `settings` are optional. When unset
/// on an existing table they adopt the server's current values, so a table
/// whose defaults were filled in by the server does not show a permanent
/// diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDeclaration {
    /// Database holding the table.
    pub database: String,
    /// Table name.
    pub name: String,
    /// Previous name, when the table is being renamed.
    #[serde(default)]
    pub renamed_from: Option<String>,
    /// Columns in desired order.
    pub columns: Vec<Column>,
    /// Storage engine.
    pub engine: String,
    /// Engine constructor arguments.
    #[serde(default)]
    pub engine_params: Option<Vec<String>>,
    /// `PARTITION BY` expression.
    #[serde(default)]
    pub partition_by: String,
    /// `ORDER BY` expressions.
    #[serde(default)]
    pub order_by: Vec<String>,
    /// `PRIMARY KEY` expressions.
    #[serde(default)]
    pub primary_key: Option<Vec<String>>,
    /// Engine settings.
    #[serde(default)]
    pub settings: Option<BTreeMap<String, String>>,
    /// Table comment.
    #[serde(default)]
    pub comment: String,
}

impl TableDeclaration {
    /// Creates a declaration with no optional attributes.
    #[must_use]
    pub fn new(
        database: impl Into<String>,
        name: impl Into<String>,
        engine: impl Into<String>,
        columns: Vec<Column>,
    ) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            renamed_from: None,
            columns,
            engine: engine.into(),
            engine_params: None,
            partition_by: String::new(),
            order_by: Vec::new(),
            primary_key: None,
            settings: None,
            comment: String::new(),
        }
    }

    /// Returns `database.name`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }

    /// Builds the desired schema, filling unset attributes from `current`.
    #[must_use]
    pub fn resolve(&self, current: Option<&TableSchema>) -> TableSchema {
        let engine_params = self
            .engine_params
            .clone()
            .or_else(|| current.map(|c| c.engine_params.clone()))
            .unwrap_or_default();
        let primary_key = self
            .primary_key
            .clone()
            .or_else(|| current.map(|c| c.primary_key.clone()))
            .unwrap_or_default();
        let settings = self
            .settings
            .clone()
            .or_else(|| current.map(|c| c.settings.clone()))
            .unwrap_or_default();

        TableSchema {
            database: self.database.clone(),
            name: self.name.clone(),
            columns: self.columns.clone(),
            engine: self.engine.clone(),
            engine_params,
            partition_by: self.partition_by.clone(),
            order_by: self.order_by.clone(),
            primary_key,
            settings,
            comment: self.comment.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        let table = self.full_name();
        check_identifier(&self.database, &format!("database of table '{table}'"))?;
        check_identifier(&self.name, "table name")?;
        check_identifier(&self.engine, &format!("engine of table '{table}'"))?;
        if let Some(old) = &self.renamed_from {
            check_identifier(old, &format!("previous name of table '{table}'"))?;
        }

        if self.columns.is_empty() {
            return Err(ChError::InvalidConfig(format!(
                "table '{table}' must declare at least one column"
            )));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            check_identifier(&column.name, &format!("column name in table '{table}'"))?;
            if !seen.insert(column.name.as_str()) {
                return Err(ChError::InvalidConfig(format!(
                    "column '{}' is declared twice in table '{table}'",
                    column.name
                )));
            }
            if !COLUMN_TYPE.is_match(&column.column_type) {
                return Err(ChError::InvalidConfig(format!(
                    "column '{}' of table '{table}' has unsupported type '{}'",
                    column.name, column.column_type
                )));
            }
            check_expression(
                &column.column_type,
                &format!("type of column '{}' in table '{table}'", column.name),
            )?;
        }

        if !self.partition_by.is_empty() {
            check_expression(&self.partition_by, &format!("partition key of table '{table}'"))?;
        }
        for expr in &self.order_by {
            check_expression(expr, &format!("sorting key of table '{table}'"))?;
        }
        for expr in self.primary_key.iter().flatten() {
            check_expression(expr, &format!("primary key of table '{table}'"))?;
        }
        for expr in self.engine_params.iter().flatten() {
            check_expression(expr, &format!("engine parameter of table '{table}'"))?;
        }

        if let Some(settings) = &self.settings {
            for key in settings.keys() {
                check_identifier(key, &format!("setting of table '{table}'"))?;
            }
        }

        Ok(())
    }
}

/// Everything a state file declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredState {
    /// Databases, created before anything else.
    #[serde(default)]
    pub databases: Vec<DatabaseSchema>,
    /// Tables.
    #[serde(default)]
    pub tables: Vec<TableDeclaration>,
    /// Views, created last since they read from tables.
    #[serde(default)]
    pub views: Vec<ViewSchema>,
}

impl DesiredState {
    /// Parses and validates a state document.
    ///
    /// # Errors
    ///
    /// Returns [`ChError::ConfigParse`] for malformed TOML and
    /// [`ChError::InvalidConfig`] when a declaration is invalid.
    pub fn from_toml(content: &str) -> Result<Self> {
        let state: Self = toml::from_str(content)?;
        state.validate()?;
        Ok(state)
    }

    /// Loads and validates a state file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Checks every declaration.
    ///
    /// # Errors
    ///
    /// Returns [`ChError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        for database in &self.databases {
            check_identifier(&database.name, "database name")?;
        }

        let mut tables = HashSet::new();
        for table in &self.tables {
            table.validate()?;
            if !tables.insert(table.full_name()) {
                return Err(ChError::InvalidConfig(format!(
                    "table '{}' is declared twice",
                    table.full_name()
                )));
            }
        }

        for view in &self.views {
            let what = format!("database of view '{}'", view.full_name());
            check_identifier(&view.database, &what)?;
            check_identifier(&view.name, "view name")?;
            if view.query.trim().is_empty() {
                return Err(ChError::InvalidConfig(format!(
                    "view '{}' has an empty query",
                    view.full_name()
                )));
            }
        }

        Ok(())
    }
}

fn check_identifier(value: &str, what: &str) -> Result<()> {
    if IDENTIFIER.is_match(value) {
        Ok(())
    } else {
        Err(ChError::InvalidConfig(format!(
            "invalid {what} '{value}': only letters, digits and underscores are allowed"
        )))
    }
}

/// Checks that `value` is a single expression safe to render verbatim.
///
/// Outside string literals it must not contain `;` or a comment marker, and
/// parentheses must balance. String literals must be terminated.
fn check_expression(value: &str, what: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(ChError::InvalidConfig(format!(
            "invalid {what} '{value}': {reason}"
        )))
    };

    if value.trim().is_empty() {
        return invalid("empty expression");
    }

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(delimiter) = quote {
            match c {
                '\\' => {
                    chars.next();
                }
                c if c == delimiter => quote = None,
                _ => {}
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return invalid("unbalanced parentheses"),
            },
            ';' => return invalid("statement separators are not allowed"),
            '#' => return invalid("comments are not allowed"),
            '-' if chars.peek() == Some(&'-') => return invalid("comments are not allowed"),
            '/' if chars.peek() == Some(&'*') => return invalid("comments are not allowed"),
            '*' if chars.peek() == Some(&'/') => return invalid("comments are not allowed"),
            _ => {}
        }
    }

    if quote.is_some() {
        return invalid("unterminated quote");
    }
    if depth != 0 {
        return invalid("unbalanced parentheses");
    }
    Ok(())
}
