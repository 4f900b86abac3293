//! Error types for the schema layer.

use thiserror::Error;

/// Errors raised while building or applying schema changes.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// A statement could not be rendered.
    #[error("schema statement could not be rendered: {0}")]
    Render(#[from] dsql_core::Error),

    /// The server rejected a schema statement.
    #[error("schema statement failed: {0}")]
    Execute(#[from] dsql_core::ExecuteError),

    /// A required table is missing.
    #[error("table {table:?} does not exist")]
    TableNotFound {
        /// Missing table name.
        table: String,
    },

    /// A table definition snapshot could not be read back.
    #[error("invalid table definition: {0}")]
    InvalidDefinition(#[from] serde_json::Error),
}

/// Convenient result alias for schema operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
