//! Error types for schema management.

use chschema_core::error::SchemaError;

/// Errors that can occur while inspecting or changing a server's schema.
#[derive(Debug, thiserror::Error)]
pub enum ChError {
    /// The requested change cannot be reconciled.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// An object does not exist on the server.
    #[error("{entity} '{name}' not found (query: {query})")]
    NotFound {
        /// Kind of object, e.g. `table`.
        entity: &'static str,
        /// Qualified object name.
        name: String,
        /// The lookup query that returned nothing.
        query: String,
    },

    /// A name is taken by an object of another kind.
    #[error("'{name}' already exists as {found}, not as a {expected}")]
    KindMismatch {
        /// Qualified object name.
        name: String,
        /// Kind of object that was declared.
        expected: &'static str,
        /// Engine of the existing object.
        found: String,
    },

    /// Refused to drop a table that still holds rows.
    #[error("Table '{table}' is not empty")]
    TableNotEmpty {
        /// Qualified table name.
        table: String,
    },

    /// The desired schema changes attributes fixed at creation time.
    #[error("'{table}' must be recreated to change {}", .attributes.join(", "))]
    RequiresRecreation {
        /// Qualified table name, or the database name.
        table: String,
        /// The immutable attributes that differ.
        attributes: Vec<String>,
    },

    /// An operation failed while applying a plan.
    ///
    /// Statements before it remain applied.
    #[error("Operation '{description}' failed: {source}")]
    Operation {
        /// Description of the failed operation.
        description: String,
        /// The underlying failure.
        #[source]
        source: Box<ChError>,
    },

    /// The server rejected a statement.
    #[error("Server returned {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Error body returned by the server.
        message: String,
    },

    /// Transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed response row.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (reading the state file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The state file is not valid TOML.
    #[error("Failed to parse state file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The state file parsed but declares something invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ChError {
    /// Returns the innermost error, skipping `Operation` wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for schema management.
pub type Result<T> = std::result::Result<T, ChError>;
