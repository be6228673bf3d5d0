use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (database directory, snapshot file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The addressed row does not exist.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A persisted value is outside its expected domain
    /// (unknown enum string, malformed id or timestamp).
    #[error("Data integrity error: {0}")]
    Integrity(String),

    /// A conditional write found a different row version.
    #[error("Version mismatch: expected {expected}, found {actual}")]
    VersionMismatch { expected: u64, actual: u64 },

    /// Another product already uses this slug.
    #[error("Slug already taken: {0}")]
    DuplicateSlug(String),

    /// A profile already exists for this user id.
    #[error("Profile already exists: {0}")]
    DuplicateProfile(String),

    /// The write references a row that does not exist.
    #[error("Missing reference: {0}")]
    MissingReference(String),

    /// The row is still referenced and cannot be deleted.
    #[error("Still referenced: {0}")]
    InUse(String),

    /// Snapshot (de)serialization failure.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// The backend could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<uuid::Error> for StoreError {
    fn from(e: uuid::Error) -> Self {
        StoreError::Integrity(format!("malformed identifier: {e}"))
    }
}

impl From<chrono::ParseError> for StoreError {
    fn from(e: chrono::ParseError) -> Self {
        StoreError::Integrity(format!("malformed timestamp: {e}"))
    }
}

impl From<exportdesk_shared::ParseEnumError> for StoreError {
    fn from(e: exportdesk_shared::ParseEnumError) -> Self {
        StoreError::Integrity(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
