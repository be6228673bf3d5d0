use thiserror::Error;

use exportdesk_shared::ParseEnumError;
use exportdesk_store::StoreError;

/// Errors returned by every core operation.
///
/// Nothing in the core converts an error into an empty result; callers
/// always see the rejection.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed input.  The caller corrects it and retries.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The actor may not perform this operation.  Carries no detail so it
    /// does not reveal whether the target exists.
    #[error("Not authorized")]
    Authorization,

    /// Admin-visible only; buyers get [`CoreError::Authorization`] instead.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A conditional write lost a race, or a row is still referenced.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transient persistence failure.  Safe to retry.
    #[error("Store error: {0}")]
    Store(#[source] StoreError),

    /// A persisted value is outside its domain.  Fatal for the read that
    /// produced it only.
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Store(_))
    }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Integrity(msg) => CoreError::DataIntegrity(msg),
            StoreError::Snapshot(e) => CoreError::DataIntegrity(e.to_string()),
            StoreError::VersionMismatch { expected, actual } => CoreError::Conflict(format!(
                "record changed concurrently (expected version {expected}, found {actual})"
            )),
            StoreError::DuplicateSlug(slug) => {
                CoreError::Conflict(format!("slug already taken: {slug}"))
            }
            StoreError::DuplicateProfile(user) => {
                CoreError::Conflict(format!("profile already exists for {user}"))
            }
            StoreError::InUse(msg) => CoreError::Conflict(msg),
            StoreError::MissingReference(what) => {
                CoreError::Validation(format!("unknown reference: {what}"))
            }
            StoreError::NotFound => CoreError::not_found("record", "unknown"),
            other => CoreError::Store(other),
        }
    }
}

/// Wire enum strings coming from callers are validation failures.
impl From<ParseEnumError> for CoreError {
    fn from(e: ParseEnumError) -> Self {
        CoreError::Validation(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
