use std::fmt;
use std::io;

use crate::collections::CrudError;
use crate::node::config::ConfigError;
use crate::schema::SchemaError;

/// Unified error type for the whole crate.
///
/// Component errors (schema, crud, config) keep their own taxonomies;
/// this type wraps them so binaries and the HTTP layer can propagate a
/// single error through `?`.
#[derive(Debug)]
pub enum RecordBaseError {
    /// Errors from schema definition operations
    Schema(SchemaError),

    /// Errors from generic CRUD operations
    Crud(CrudError),

    /// Errors from the underlying database
    Database(String),

    /// Errors from configuration loading/validation
    Config(ConfigError),

    /// Errors from the HTTP server lifecycle
    Server(String),

    /// Errors related to IO operations
    Io(io::Error),

    /// Errors related to serialization/deserialization
    Serialization(String),

    /// Other errors that don't fit into the above categories
    Other(String),
}

impl fmt::Display for RecordBaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schema(err) => write!(f, "Schema error: {}", err),
            Self::Crud(err) => write!(f, "CRUD error: {}", err),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
            Self::Config(err) => write!(f, "Configuration error: {}", err),
            Self::Server(msg) => write!(f, "Server error: {}", msg),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Self::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for RecordBaseError {}

impl From<SchemaError> for RecordBaseError {
    fn from(error: SchemaError) -> Self {
        RecordBaseError::Schema(error)
    }
}

impl From<CrudError> for RecordBaseError {
    fn from(error: CrudError) -> Self {
        RecordBaseError::Crud(error)
    }
}

impl From<ConfigError> for RecordBaseError {
    fn from(error: ConfigError) -> Self {
        RecordBaseError::Config(error)
    }
}

impl From<sled::Error> for RecordBaseError {
    fn from(error: sled::Error) -> Self {
        RecordBaseError::Database(error.to_string())
    }
}

impl From<serde_json::Error> for RecordBaseError {
    fn from(error: serde_json::Error) -> Self {
        RecordBaseError::Serialization(error.to_string())
    }
}

impl From<io::Error> for RecordBaseError {
    fn from(error: io::Error) -> Self {
        RecordBaseError::Io(error)
    }
}

/// Result type alias for operations that can fail with a [`RecordBaseError`]
pub type RecordBaseResult<T> = Result<T, RecordBaseError>;
