//! Error types for the database hub
//!
//! Configuration, registry, connection and tool-invocation failures all surface
//! through [`HubError`]. Discovery problems are not errors: they are recorded on
//! the [`DiscoveredClient`](crate::discovery::DiscoveredClient) itself.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for hub operations
pub type HubResult<T> = Result<T, HubError>;

/// Error types for hub operations
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Unsupported provider '{provider}' for database '{database}': no default template")]
    UnsupportedProvider { provider: String, database: String },

    #[error("Database not found: {name}")]
    DatabaseNotFound { name: String },

    #[error("Discovery root does not exist: {}", path.display())]
    DiscoveryRootMissing { path: PathBuf },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Connection error for '{database}': {message}")]
    Connection { database: String, message: String },

    #[error("Migration tool failed for '{database}' ({command}): {message}")]
    Tool {
        database: String,
        command: String,
        message: String,
    },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Operation on '{database}' timed out after {timeout:?}")]
    Timeout { database: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl HubError {
    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new database-not-found error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::DatabaseNotFound { name: name.into() }
    }

    /// Create a new connection error
    pub fn connection(database: impl Into<String>, message: impl ToString) -> Self {
        Self::Connection {
            database: database.into(),
            message: message.to_string(),
        }
    }

    /// Create a new invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Whether the error was raised because a database name is unknown
    pub fn is_not_found(&self) -> bool {
        matches!(self, HubError::DatabaseNotFound { .. })
    }
}
