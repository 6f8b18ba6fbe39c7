//! Declarative schema management for ClickHouse.
//!
//! `chschema` reads a desired state (databases, tables, views) from a TOML
//! file, compares it with what the server reports in its `system.*` tables,
//! and applies the difference as a sequence of DDL statements.
//!
//! # Architecture
//!
//! - **Connection** - The `exec`/`query` capability and its HTTP implementation
//! - **Introspect** - Building current snapshots from `system.*` tables
//! - **Config** - The declared desired state and its validation
//! - **Executor** - Planning and applying changes
//!
//! The diff itself lives in [`chschema_core`].
//!
//! # CLI Usage
//!
//! ```bash
//! # Show the statements that would run
//! chschema plan -f state.toml
//!
//! # Apply them
//! chschema apply -f state.toml
//!
//! # Inspect a table
//! chschema show-table analytics.events
//!
//! # Drop a table, refusing if it holds rows
//! chschema drop-table analytics.events
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod introspect;

pub use chschema_core;

/// Prelude for convenient imports.
pub mod prelude {
    pub use chschema_core::prelude::*;

    pub use crate::config::{DesiredState, TableDeclaration};
    pub use crate::connection::{Connection, ConnectionOptions, HttpConnection, Row};
    pub use crate::error::{ChError, Result};
    pub use crate::executor::SchemaExecutor;
}
