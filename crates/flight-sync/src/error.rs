//! Error types for the flight schedule sync job.

use thiserror::Error;

/// Main error type for sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database driver error that was not attributed to a specific phase
    #[error("Database error: {0}")]
    Database(#[from] tiberius::error::Error),

    /// Connection could not be established
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// Reading a snapshot from the source or target failed
    #[error("Fetch failed for {what}: {message}")]
    Fetch { what: String, message: String },

    /// Bulk insert into the target table failed
    #[error("Bulk insert into {table} failed: {message}")]
    BulkInsert { table: String, message: String },

    /// Staging load or merge failed; the update batch was rolled back
    #[error("Bulk update of {table} failed (rolled back): {message}")]
    BulkUpdate { table: String, message: String },

    /// Failure notification could not be delivered
    #[error("Notification failed: {0}")]
    Notify(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run was cancelled (SIGINT, etc.)
    #[error("Sync cancelled")]
    Cancelled,
}

/// Row-level extraction failure raised by the field transformer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// A column the record cannot be built without is not in the row
    #[error("column {0} is missing from the source row")]
    MissingColumn(&'static str),

    /// The column holds a value that has no text form
    #[error("column {column} holds {found}, expected text")]
    UnexpectedType {
        column: &'static str,
        found: &'static str,
    },

    /// Flight code too short for the dot remap
    #[error("flight code '{0}' cannot be remapped")]
    MalformedFlightCode(String),
}

impl SyncError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        SyncError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Fetch error
    pub fn fetch(what: impl Into<String>, message: impl ToString) -> Self {
        SyncError::Fetch {
            what: what.into(),
            message: message.to_string(),
        }
    }

    /// Create a BulkInsert error
    pub fn bulk_insert(table: impl Into<String>, message: impl ToString) -> Self {
        SyncError::BulkInsert {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a BulkUpdate error
    pub fn bulk_update(table: impl Into<String>, message: impl ToString) -> Self {
        SyncError::BulkUpdate {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Config(_) | SyncError::Yaml(_) => 1,
            SyncError::Database(_) | SyncError::Connection { .. } | SyncError::Fetch { .. } => 2,
            SyncError::BulkInsert { .. } | SyncError::BulkUpdate { .. } => 3,
            SyncError::Notify(_) => 4,
            SyncError::Json(_) => 5,
            SyncError::Io(_) => 7,
            SyncError::Cancelled => 130,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
