//! # Patient Core
//!
//! Core business logic for the patient record service.
//!
//! This crate contains the data operations and their supporting machinery:
//! - Validation of client-supplied patient fields
//! - A transactional record store with unique email/phone indexes
//! - [`PatientService`], which ties validation, uniqueness and storage together
//! - The asynchronous notification dispatcher
//!
//! **No API concerns**: Authentication, HTTP servers, or wire formats belong in `api-rest` or `api-shared`.

pub mod config;
pub mod constants;
pub mod error;
pub mod notifications;
pub mod patient;
pub mod record;
pub mod store;
pub mod validation;

pub use config::{CoreConfig, NotificationConfig, RetryPolicy};
pub use error::{
    DeliveryFailure, DispatchError, PatientError, PatientResult, StoreError, StoreResult,
    ValidationError,
};
pub use patient::PatientService;
pub use record::{NewPatient, Patient, PatientChanges};
pub use store::RecordStore;
pub use validation::PatientFields;

// Re-export the validated value types so callers need only one dependency.
pub use patient_types::{EmailAddress, NonEmptyText, PatientId, PhoneNumber, TextError};
