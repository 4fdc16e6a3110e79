//! Input validation utilities.
//!
//! Pure, synchronous checks applied to client input before anything touches the store.
//! The checks run in a fixed order, presence first and then format, and the first failure
//! is returned. Uniqueness is not a validation concern; it needs the store and lives in
//! [`crate::patient::PatientService`].

use crate::error::ValidationError;
use crate::record::{NewPatient, PatientChanges};
use patient_types::{EmailAddress, NonEmptyText, PhoneNumber};

/// Fields required to create a patient, in the order they are checked.
pub const REQUIRED_FIELDS: [&str; 3] = ["name", "email", "phone"];

/// Raw patient fields as submitted by a client.
///
/// `None` means the key was absent from the request. A present but empty value is not
/// missing; it fails the format stage instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl PatientFields {
    /// Looks a field up by its wire name.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "name" => self.name.as_deref(),
            "email" => self.email.as_deref(),
            "phone" => self.phone.as_deref(),
            _ => None,
        }
    }
}

/// Fails on the first key in `required` that is absent from `fields`.
pub fn validate_presence(
    fields: &PatientFields,
    required: &[&'static str],
) -> Result<(), ValidationError> {
    match required.iter().copied().find(|key| fields.get(key).is_none()) {
        Some(key) => Err(ValidationError::MissingField(key)),
        None => Ok(()),
    }
}

pub fn validate_name(name: &str) -> Result<NonEmptyText, ValidationError> {
    NonEmptyText::new(name).map_err(|source| ValidationError::InvalidFormat {
        field: "name",
        source,
    })
}

pub fn validate_email(email: &str) -> Result<EmailAddress, ValidationError> {
    EmailAddress::new(email).map_err(|source| ValidationError::InvalidFormat {
        field: "email",
        source,
    })
}

pub fn validate_phone(phone: &str) -> Result<PhoneNumber, ValidationError> {
    PhoneNumber::new(phone).map_err(|source| ValidationError::InvalidFormat {
        field: "phone",
        source,
    })
}

/// Validates a create request: presence of every required field, then each field's format.
///
/// # Errors
///
/// Returns the first failing check as a [`ValidationError`].
pub fn validate_new_patient(fields: &PatientFields) -> Result<NewPatient, ValidationError> {
    validate_presence(fields, &REQUIRED_FIELDS)?;

    let field = |key: &'static str| fields.get(key).ok_or(ValidationError::MissingField(key));
    Ok(NewPatient {
        name: validate_name(field("name")?)?,
        email: validate_email(field("email")?)?,
        phone: validate_phone(field("phone")?)?,
    })
}

/// Validates an update request. Only supplied fields are checked; none are required.
pub fn validate_changes(fields: &PatientFields) -> Result<PatientChanges, ValidationError> {
    Ok(PatientChanges {
        name: fields.name.as_deref().map(validate_name).transpose()?,
        email: fields.email.as_deref().map(validate_email).transpose()?,
        phone: fields.phone.as_deref().map(validate_phone).transpose()?,
    })
}
