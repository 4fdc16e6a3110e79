//! The patient record and the validated inputs used to build or change one.

use patient_types::{EmailAddress, NonEmptyText, PatientId, PhoneNumber};
use serde::{Deserialize, Serialize};

/// Validated fields for a record that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatient {
    pub name: NonEmptyText,
    pub email: EmailAddress,
    pub phone: PhoneNumber,
}

/// Validated partial update. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatientChanges {
    pub name: Option<NonEmptyText>,
    pub email: Option<EmailAddress>,
    pub phone: Option<PhoneNumber>,
}

impl PatientChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

/// A stored patient record.
///
/// Every field is a validated type, so a `Patient` cannot hold a malformed email or phone.
/// The id is fixed at construction and there is no way to change it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    id: PatientId,
    name: NonEmptyText,
    email: EmailAddress,
    phone: PhoneNumber,
}

impl Patient {
    pub fn new(id: PatientId, fields: NewPatient) -> Self {
        Self {
            id,
            name: fields.name,
            email: fields.email,
            phone: fields.phone,
        }
    }

    pub fn id(&self) -> &PatientId {
        &self.id
    }

    pub fn name(&self) -> &NonEmptyText {
        &self.name
    }

    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn phone(&self) -> &PhoneNumber {
        &self.phone
    }

    /// Returns the record that results from applying `changes`, leaving `self` untouched.
    pub fn merged(&self, changes: &PatientChanges) -> Patient {
        Patient {
            id: self.id.clone(),
            name: changes.name.clone().unwrap_or_else(|| self.name.clone()),
            email: changes.email.clone().unwrap_or_else(|| self.email.clone()),
            phone: changes.phone.clone().unwrap_or_else(|| self.phone.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn john() -> Patient {
        Patient::new(
            PatientId::generate(),
            NewPatient {
                name: NonEmptyText::new("John Doe").unwrap(),
                email: EmailAddress::new("john.doe@example.com").unwrap(),
                phone: PhoneNumber::new("+1234567890").unwrap(),
            },
        )
    }

    #[test]
    fn test_merged_keeps_omitted_fields() {
        let patient = john();
        let changes = PatientChanges {
            name: Some(NonEmptyText::new("Jane").unwrap()),
            ..Default::default()
        };

        let merged = patient.merged(&changes);
        assert_eq!(merged.id(), patient.id());
        assert_eq!(merged.name().as_str(), "Jane");
        assert_eq!(merged.email(), patient.email());
        assert_eq!(merged.phone(), patient.phone());
    }

    #[test]
    fn test_empty_changes_are_identity() {
        let patient = john();
        assert!(PatientChanges::default().is_empty());
        assert_eq!(patient.merged(&PatientChanges::default()), patient);
    }

    #[test]
    fn test_deserialise_rejects_invalid_stored_phone() {
        let raw = r#"{"id":"550e8400e29b41d4a716446655440000","name":"A","email":"a@b.c","phone":"12 34"}"#;
        assert!(serde_json::from_str::<Patient>(raw).is_err());
    }
}
