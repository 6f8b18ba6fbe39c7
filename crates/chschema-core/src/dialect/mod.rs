//! SQL dialects.
//!
//! A dialect renders [`SchemaOperation`]s to statements. Quoting of names
//! and values happens here, never in the reconciler.

mod clickhouse;

pub use clickhouse::ClickHouseDialect;

use crate::operations::{AlterOperation, SchemaOperation};

/// Trait for database-specific SQL generation.
pub trait Dialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Generates the statement for a schema operation.
    fn generate_sql(&self, operation: &SchemaOperation) -> String;

    /// Generates the statement altering `database.table`.
    fn alter_sql(&self, database: &str, table: &str, operation: &AlterOperation) -> String;
}
