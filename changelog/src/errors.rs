use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type returned by a changelog run.
///
/// Every failed run carries exactly one of these. Configuration and task-list
/// errors are raised before any store interaction; the remaining kinds are
/// raised while tasks are being processed and abort the run at that task.
#[derive(Debug, Error)]
pub enum ChangelogError {
    /// The configuration is missing or has an empty field.
    #[error(
        "wrong configuration format: expected non-empty `connection_uri`, `database_name` and `connection_options`"
    )]
    IllegalConfiguration,

    /// The task list is absent.
    #[error("wrong task list format: the task list must be present")]
    IllegalTaskListFormat,

    /// A task is missing its name, author or operation.
    #[error("wrong task format for task {name:?}: expected non-empty name, author and operation")]
    IllegalTaskFormat { name: String },

    /// An already applied changeset no longer matches its recorded fingerprint.
    #[error("wrong fingerprint for changeset \"{name}\": recorded {stored}, current value is {fingerprint}")]
    Hash {
        name: String,
        stored: String,
        fingerprint: String,
    },

    /// The changeset's own operation failed. The original error is kept as-is.
    #[error(transparent)]
    Operation(anyhow::Error),

    /// The changelog store failed, including unique index violations.
    #[error("changelog store error: {0}")]
    Store(#[from] StoreError),

    /// A manifest references a changeset that is not registered.
    #[error("unknown changeset `{0}`")]
    UnknownChangeset(String),

    /// A manifest file could not be read or parsed.
    #[error("failed to load {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },
}

impl ChangelogError {
    /// Returns the operation's original error when this is an operation failure.
    pub fn into_operation_error(self) -> Result<anyhow::Error, Self> {
        match self {
            Self::Operation(err) => Ok(err),
            other => Err(other),
        }
    }

    /// True when the run failed because an applied changeset drifted.
    pub fn is_drift(&self) -> bool {
        matches!(self, Self::Hash { .. })
    }
}

/// Errors raised by a [`ChangelogStore`](crate::store::ChangelogStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A changelog document could not be encoded or decoded.
    #[error("failed to serialize changelog entry: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A unique index rejected the insert.
    #[error("duplicate key: `{field}` = {value:?} already exists in collection `{collection}`")]
    DuplicateKey {
        collection: String,
        field: String,
        value: String,
    },

    /// A store-side script returned an unexpected response.
    #[error("store script failed: {0}")]
    Script(String),
}

/// Convenience alias used across the crate.
pub type ChangelogResult<T> = Result<T, ChangelogError>;
