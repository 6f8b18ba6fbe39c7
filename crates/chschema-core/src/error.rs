//! Error types for schema reconciliation.

/// Errors produced while reconciling or describing table schemas.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The desired schema asks for a change the reconciler refuses to guess.
    #[error("{operation} is not supported: {detail}")]
    UnsupportedChange {
        /// Short name of the refused operation.
        operation: String,
        /// Human-readable explanation.
        detail: String,
    },

    /// An engine descriptor could not be split into settings or parameters.
    #[error("Invalid engine descriptor '{descriptor}': {message}")]
    InvalidDescriptor {
        /// The full descriptor text as reported by the server.
        descriptor: String,
        /// What went wrong.
        message: String,
    },
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
