//! Schema model and table reconciliation for ClickHouse.
//!
//! `chschema-core` is the pure half of `chschema`. It never talks to a
//! server: it takes two [`TableSchema`](schema::TableSchema) snapshots, the
//! current one and the desired one, and computes the ordered list of
//! alterations that turns the first into the second.
//!
//! # Architecture
//!
//! - **Schema** - `Column`, `TableSchema`, `DatabaseSchema`, `ViewSchema`
//! - **Operations** - `AlterOperation` plan steps and `SchemaOperation` statements
//! - **Reconcile** - The diff: additions, type changes, reordering, settings, sorting key
//! - **Descriptor** - Parsing of the server's free-text engine descriptor
//! - **Quote** - Identifier and literal escaping
//! - **Dialect** - Rendering of operations to ClickHouse SQL
//!
//! # Example
//!
//! ```rust
//! use chschema_core::prelude::*;
//!
//! let current = TableSchema::new("default", "events", "MergeTree")
//!     .column(Column::new("a", "Int32"));
//! let desired = TableSchema::new("default", "events", "MergeTree")
//!     .column(Column::new("a", "Int32"))
//!     .column(Column::new("b", "String").nullable());
//!
//! let plan = reconcile(&current, &desired).unwrap();
//! let dialect = ClickHouseDialect::new();
//! assert_eq!(
//!     dialect.alter_sql("default", "events", &plan[0]),
//!     r#"ALTER TABLE "default"."events" ADD COLUMN "b" Nullable(String) COMMENT ''"#
//! );
//! ```

pub mod descriptor;
pub mod dialect;
pub mod error;
pub mod operations;
pub mod quote;
pub mod reconcile;
pub mod schema;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dialect::{ClickHouseDialect, Dialect};
    pub use crate::error::{Result, SchemaError};
    pub use crate::operations::{AlterOperation, ColumnPlacement, SchemaOperation};
    pub use crate::reconcile::{
        has_immutable_settings, order_by_unreconciled, reconcile, recreation_required,
    };
    pub use crate::schema::{Column, DatabaseEngine, DatabaseSchema, TableSchema, ViewSchema};
}
