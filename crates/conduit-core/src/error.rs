//! Error types for conduit-core

/// Result type for conduit-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in conduit-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed request or definition
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A referenced record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation conflicts with existing state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Mapping compilation or evaluation failed
    #[error(transparent)]
    Mapping(#[from] conduit_mapping::MappingError),

    /// A mapped object failed schema validation
    #[error("Validation failed: {}", errors.join("; "))]
    Validation { errors: Vec<String> },

    /// The source system could not be read
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// The target system could not be reached
    #[error("Target unavailable: {0}")]
    TargetUnavailable(String),

    /// The target refused an object
    #[error("Target rejected object: {0}")]
    TargetRejected(String),

    /// One or more stale targets could not be deleted
    #[error("Failed to delete {failed} target(s) after deleting {deleted}: {details}")]
    TargetDeletion {
        failed: usize,
        deleted: usize,
        details: String,
    },

    /// An adapter call exceeded its deadline
    #[error("Timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    /// Another run of the same synchronization holds the run lock
    #[error("Synchronization {id} is already running")]
    RunInProgress { id: i64 },

    /// The record store failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from conduit-fs
    #[error(transparent)]
    Fs(#[from] conduit_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
}

impl Error {
    /// Whether a later scheduled run may succeed without intervention
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable(_)
                | Self::TargetUnavailable(_)
                | Self::Timeout { .. }
                | Self::RunInProgress { .. }
        )
    }

    /// Whether the error concerns a single object rather than the whole run
    pub fn is_per_object(&self) -> bool {
        matches!(
            self,
            Self::Mapping(_)
                | Self::Validation { .. }
                | Self::TargetUnavailable(_)
                | Self::TargetRejected(_)
                | Self::Timeout { .. }
        )
    }
}
