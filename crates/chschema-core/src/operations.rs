//! Schema operations.
//!
//! [`AlterOperation`] is a single step of a table reconciliation plan.
//! [`SchemaOperation`] is the unit an executor applies, covering whole
//! objects as well as alterations of an existing table.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schema::{DatabaseSchema, TableSchema, ViewSchema};

/// Where a repositioned column ends up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnPlacement {
    /// Move the column to the first position.
    First,
    /// Move the column right after the named column.
    After(String),
}

/// One step transforming a current table toward its desired schema.
///
/// Names and types are carried raw; quoting happens when the operation is
/// rendered by a dialect. Types are already wrapped in `Nullable(..)` where
/// the column is nullable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlterOperation {
    /// Add a new column.
    AddColumn {
        /// Column name.
        name: String,
        /// Rendered column type.
        column_type: String,
        /// Column comment, empty when unset.
        comment: String,
    },

    /// Rewrite the type and comment of an existing column.
    ChangeColumnType {
        /// Column name.
        name: String,
        /// Rendered column type.
        column_type: String,
        /// Column comment, empty when unset.
        comment: String,
    },

    /// Move a column to a new position.
    ReorderColumn {
        /// Column name.
        name: String,
        /// Rendered column type.
        column_type: String,
        /// Target position.
        placement: ColumnPlacement,
    },

    /// Set engine settings, overwriting existing values.
    ModifySettings {
        /// Settings to apply.
        settings: BTreeMap<String, String>,
    },

    /// Restore engine settings to their defaults.
    ResetSettings {
        /// Setting names to reset.
        names: BTreeSet<String>,
    },

    /// Replace the sorting key.
    ModifyOrderBy {
        /// New `ORDER BY` expressions.
        expressions: Vec<String>,
    },
}

impl AlterOperation {
    /// Creates an `AddColumn` operation.
    #[must_use]
    pub fn add_column(
        name: impl Into<String>,
        column_type: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self::AddColumn {
            name: name.into(),
            column_type: column_type.into(),
            comment: comment.into(),
        }
    }

    /// Creates a `ChangeColumnType` operation.
    #[must_use]
    pub fn change_column_type(
        name: impl Into<String>,
        column_type: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self::ChangeColumnType {
            name: name.into(),
            column_type: column_type.into(),
            comment: comment.into(),
        }
    }

    /// Creates a `ReorderColumn` operation.
    #[must_use]
    pub fn reorder_column(
        name: impl Into<String>,
        column_type: impl Into<String>,
        placement: ColumnPlacement,
    ) -> Self {
        Self::ReorderColumn {
            name: name.into(),
            column_type: column_type.into(),
            placement,
        }
    }

    /// Returns the column this operation touches, if any.
    #[must_use]
    pub fn column_name(&self) -> Option<&str> {
        match self {
            Self::AddColumn { name, .. }
            | Self::ChangeColumnType { name, .. }
            | Self::ReorderColumn { name, .. } => Some(name),
            Self::ModifySettings { .. }
            | Self::ResetSettings { .. }
            | Self::ModifyOrderBy { .. } => None,
        }
    }

    /// Returns a human-readable description of this operation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::AddColumn {
                name, column_type, ..
            } => format!("Add column '{name}' of type {column_type}"),
            Self::ChangeColumnType {
                name, column_type, ..
            } => format!("Set type of column '{name}' to {column_type}"),
            Self::ReorderColumn {
                name, placement, ..
            } => match placement {
                ColumnPlacement::First => format!("Move column '{name}' first"),
                ColumnPlacement::After(anchor) => {
                    format!("Move column '{name}' after '{anchor}'")
                }
            },
            Self::ModifySettings { settings } => {
                let keys: Vec<&str> = settings.keys().map(String::as_str).collect();
                format!("Modify settings {}", keys.join(", "))
            }
            Self::ResetSettings { names } => {
                let keys: Vec<&str> = names.iter().map(String::as_str).collect();
                format!("Reset settings {}", keys.join(", "))
            }
            Self::ModifyOrderBy { expressions } => {
                format!("Modify ORDER BY to ({})", expressions.join(", "))
            }
        }
    }
}

/// A change applied to the server as a single statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaOperation {
    /// Create a table.
    CreateTable(TableSchema),

    /// Drop a table.
    DropTable {
        /// Database name.
        database: String,
        /// Table name.
        name: String,
    },

    /// Rename a table within its database.
    RenameTable {
        /// Database name.
        database: String,
        /// Current table name.
        from: String,
        /// New table name.
        to: String,
    },

    /// Alter an existing table.
    AlterTable {
        /// Database name.
        database: String,
        /// Table name.
        table: String,
        /// The alteration to apply.
        operation: AlterOperation,
    },

    /// Create a database.
    CreateDatabase(DatabaseSchema),

    /// Drop a database.
    DropDatabase {
        /// Database name.
        name: String,
    },

    /// Create a view, optionally replacing an existing one.
    CreateView {
        /// View definition.
        view: ViewSchema,
        /// Whether to use `OR REPLACE`.
        replace: bool,
    },

    /// Drop a view.
    DropView {
        /// Database name.
        database: String,
        /// View name.
        name: String,
    },
}

impl SchemaOperation {
    /// Wraps a reconciliation step for the given table.
    #[must_use]
    pub fn alter(
        database: impl Into<String>,
        table: impl Into<String>,
        operation: AlterOperation,
    ) -> Self {
        Self::AlterTable {
            database: database.into(),
            table: table.into(),
            operation,
        }
    }

    /// Creates a `DropTable` operation.
    #[must_use]
    pub fn drop_table(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self::DropTable {
            database: database.into(),
            name: name.into(),
        }
    }

    /// Creates a `RenameTable` operation.
    #[must_use]
    pub fn rename_table(
        database: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::RenameTable {
            database: database.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    /// Returns a human-readable description of this operation.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateTable(table) => format!("Create table '{}'", table.full_name()),
            Self::DropTable { database, name } => format!("Drop table '{database}.{name}'"),
            Self::RenameTable { database, from, to } => {
                format!("Rename table '{database}.{from}' to '{to}'")
            }
            Self::AlterTable {
                database,
                table,
                operation,
            } => format!("{} in table '{database}.{table}'", operation.description()),
            Self::CreateDatabase(db) => format!("Create database '{}'", db.name),
            Self::DropDatabase { name } => format!("Drop database '{name}'"),
            Self::CreateView { view, replace } => {
                if *replace {
                    format!("Replace view '{}'", view.full_name())
                } else {
                    format!("Create view '{}'", view.full_name())
                }
            }
            Self::DropView { database, name } => format!("Drop view '{database}.{name}'"),
        }
    }
}
