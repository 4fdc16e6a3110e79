use patient_types::{PatientId, TextError};
use std::time::Duration;

/// A request failed validation before reaching the store.
///
/// Presence is always checked before format, so a `MissingField` is reported even when
/// other supplied fields are malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("{field}: {source}")]
    InvalidFormat {
        field: &'static str,
        #[source]
        source: TextError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no patient record with id {0}")]
    NotFound(PatientId),
    #[error("unique constraint violated on {0}")]
    ConstraintViolation(&'static str),
    #[error("record table lock poisoned")]
    Poisoned,
    #[error("store file {} is already in use by another process", .0.display())]
    Locked(std::path::PathBuf),
    #[error("failed to read store file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write store file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize store: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize store: {0}")]
    Deserialization(serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Patient with this phone or email already exists")]
    Conflict,
    #[error("Patient not found")]
    NotFound,
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for PatientError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => PatientError::NotFound,
            // The store's own unique indexes caught a collision the service check missed.
            StoreError::ConstraintViolation(_) => PatientError::Conflict,
            other => PatientError::Store(other),
        }
    }
}

pub type PatientResult<T> = std::result::Result<T, PatientError>;

/// The notification queue refused a job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("notification queue is closed")]
    Closed,
}

/// A single delivery attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryFailure {
    #[error("{0}")]
    Rejected(String),
    #[error("delivery attempt timed out after {0:?}")]
    TimedOut(Duration),
}
