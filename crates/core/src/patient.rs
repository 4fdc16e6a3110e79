//! Patient service.
//!
//! Orchestrates validation, uniqueness checks and store writes for patient records, and hands a
//! notification job to the queue after every successful create or update.
//!
//! Each write runs the same pipeline, and the first failing stage decides the error:
//!
//! 1. presence of required fields ([`PatientError::Validation`])
//! 2. field formats ([`PatientError::Validation`])
//! 3. uniqueness of email and phone against other records ([`PatientError::Conflict`])
//!
//! Stage 3 and the write happen inside one store transaction. Notification happens after the
//! commit and cannot fail the operation.

use crate::error::{PatientError, PatientResult};
use crate::notifications::{NotificationJob, NotificationQueue};
use crate::record::Patient;
use crate::store::RecordStore;
use crate::validation::{validate_changes, validate_new_patient, PatientFields};
use patient_types::{PatientId, PhoneNumber};
use std::sync::Arc;

/// Pure patient data operations - no API concerns
#[derive(Clone)]
pub struct PatientService {
    store: Arc<RecordStore>,
    notifications: Arc<dyn NotificationQueue>,
}

impl PatientService {
    /// Creates a new instance of PatientService.
    ///
    /// # Arguments
    ///
    /// * `store` - Record store holding the patient table.
    /// * `notifications` - Queue that receives a job per successful create or update.
    pub fn new(store: Arc<RecordStore>, notifications: Arc<dyn NotificationQueue>) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Creates a patient record and queues a notification to its phone number.
    ///
    /// # Returns
    ///
    /// The identifier allocated to the new record.
    ///
    /// # Errors
    ///
    /// Returns a `PatientError` if:
    /// - a required field is missing or malformed (`Validation`),
    /// - another record already holds the email or phone (`Conflict`),
    /// - the store cannot commit (`Store`).
    pub fn create(&self, fields: &PatientFields) -> PatientResult<PatientId> {
        let new_patient = validate_new_patient(fields).inspect_err(|e| {
            tracing::warn!("create patient rejected: {}", e);
        })?;

        let mut tx = self.store.begin_transaction()?;
        if tx
            .find_by_phone_or_email(&new_patient.phone, &new_patient.email, None)
            .is_some()
        {
            tracing::warn!("create patient rejected: email or phone already registered");
            return Err(PatientError::Conflict);
        }

        let id = PatientId::generate();
        let phone = new_patient.phone.clone();
        tx.insert(Patient::new(id.clone(), new_patient))?;
        tx.commit()?;

        tracing::info!("patient {} created", id);
        self.notify(phone);
        Ok(id)
    }

    /// Returns the record with identifier `id`.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::NotFound` if no such record exists.
    pub fn get(&self, id: &str) -> PatientResult<Patient> {
        let id = parse_id(id)?;
        self.store.get(&id)?.ok_or(PatientError::NotFound)
    }

    /// Applies a partial update. Fields absent from `fields` keep their current value.
    ///
    /// An update that changes nothing is still written and still notifies.
    ///
    /// # Returns
    ///
    /// The record as stored after the update.
    ///
    /// # Errors
    ///
    /// Returns a `PatientError` if:
    /// - no record has identifier `id` (`NotFound`), which is checked before anything else,
    /// - a supplied field is malformed (`Validation`),
    /// - the resulting email or phone belongs to another record (`Conflict`),
    /// - the store cannot commit (`Store`).
    pub fn update(&self, id: &str, fields: &PatientFields) -> PatientResult<Patient> {
        let id = parse_id(id)?;

        let mut tx = self.store.begin_transaction()?;
        let current = tx.get(&id).ok_or(PatientError::NotFound)?;

        let changes = validate_changes(fields).inspect_err(|e| {
            tracing::warn!("update of patient {} rejected: {}", id, e);
        })?;

        let merged = current.merged(&changes);
        if tx
            .find_by_phone_or_email(merged.phone(), merged.email(), Some(&id))
            .is_some()
        {
            tracing::warn!(
                "update of patient {} rejected: email or phone already registered",
                id
            );
            return Err(PatientError::Conflict);
        }

        let updated = tx.update(&id, &changes)?;
        tx.commit()?;

        tracing::info!("patient {} updated", id);
        self.notify(updated.phone().clone());
        Ok(updated)
    }

    /// Removes the record with identifier `id`. No notification is sent.
    ///
    /// # Errors
    ///
    /// Returns `PatientError::NotFound` if no such record exists.
    pub fn delete(&self, id: &str) -> PatientResult<()> {
        let id = parse_id(id)?;

        let mut tx = self.store.begin_transaction()?;
        tx.delete(&id)?;
        tx.commit()?;

        tracing::info!("patient {} deleted", id);
        Ok(())
    }

    /// Lists every patient record in insertion order.
    pub fn list(&self) -> PatientResult<Vec<Patient>> {
        Ok(self.store.list_all()?)
    }

    fn notify(&self, phone: PhoneNumber) {
        match self.notifications.enqueue(NotificationJob::new(phone)) {
            Ok(job_id) => tracing::debug!("notification job {} queued", job_id),
            // The record change is already committed; a lost notification does not undo it.
            Err(e) => tracing::error!("failed to queue notification: {}", e),
        }
    }
}

/// Identifiers that are not canonical cannot name a record.
fn parse_id(id: &str) -> PatientResult<PatientId> {
    PatientId::new(id).map_err(|_| PatientError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::notifications::RecordingQueue;
    use patient_types::TextError;
    use std::sync::Barrier;

    fn setup() -> (PatientService, Arc<RecordStore>, Arc<RecordingQueue>) {
        let store = Arc::new(RecordStore::in_memory());
        let queue = Arc::new(RecordingQueue::new());
        let service = PatientService::new(store.clone(), queue.clone());
        (service, store, queue)
    }

    fn fields(name: &str, email: &str, phone: &str) -> PatientFields {
        PatientFields {
            name: Some(name.into()),
            email: Some(email.into()),
            phone: Some(phone.into()),
        }
    }

    fn john() -> PatientFields {
        fields("John Doe", "john.doe@example.com", "+1234567890")
    }

    #[test]
    fn test_create_then_get_round_trip() {
        let (service, _, _) = setup();

        let id = service.create(&john()).expect("create should succeed");
        let patient = service.get(id.as_str()).expect("get should succeed");

        assert_eq!(patient.id(), &id);
        assert_eq!(patient.name().as_str(), "John Doe");
        assert_eq!(patient.email().as_str(), "john.doe@example.com");
        assert_eq!(patient.phone().as_str(), "+1234567890");
    }

    #[test]
    fn test_create_stores_name_exactly_as_submitted() {
        let (service, _, _) = setup();
        let padded = fields("  John Doe ", "john.doe@example.com", "+1234567890");

        let id = service.create(&padded).expect("padded name is not blank");
        let patient = service.get(id.as_str()).unwrap();
        assert_eq!(patient.name().as_str(), "  John Doe ");

        let blank = fields("   ", "jane@example.com", "+2");
        assert!(matches!(
            service.create(&blank),
            Err(PatientError::Validation(ValidationError::InvalidFormat {
                field: "name",
                source: TextError::Empty
            }))
        ));
    }

    #[test]
    fn test_create_enqueues_one_notification_for_phone() {
        let (service, _, queue) = setup();
        service.create(&john()).unwrap();

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].target_contact.as_str(), "+1234567890");
    }

    #[test]
    fn test_create_rejects_duplicate_email_or_phone() {
        let (service, store, queue) = setup();
        service.create(&john()).unwrap();

        let dup_email = fields("Jane Doe", "john.doe@example.com", "+0987654321");
        assert!(matches!(
            service.create(&dup_email),
            Err(PatientError::Conflict)
        ));

        let dup_phone = fields("Jane Doe", "jane.doe@example.com", "+1234567890");
        assert!(matches!(
            service.create(&dup_phone),
            Err(PatientError::Conflict)
        ));

        assert_eq!(store.list_all().unwrap().len(), 1);
        assert_eq!(queue.jobs().len(), 1, "rejected creates must not notify");
    }

    #[test]
    fn test_create_validation_precedes_uniqueness() {
        let (service, store, queue) = setup();
        service.create(&john()).unwrap();

        // Missing phone beats the duplicate email.
        let missing = PatientFields {
            phone: None,
            ..john()
        };
        assert!(matches!(
            service.create(&missing),
            Err(PatientError::Validation(ValidationError::MissingField("phone")))
        ));

        // Malformed phone beats the duplicate email.
        let malformed = fields("John Doe", "john.doe@example.com", "039383qwe");
        assert!(matches!(
            service.create(&malformed),
            Err(PatientError::Validation(ValidationError::InvalidFormat {
                field: "phone",
                source: TextError::InvalidPhone
            }))
        ));

        assert_eq!(store.list_all().unwrap().len(), 1);
        assert_eq!(queue.jobs().len(), 1);
    }

    #[test]
    fn test_update_preserves_omitted_fields() {
        let (service, _, queue) = setup();
        let id = service.create(&john()).unwrap();

        let change = PatientFields {
            name: Some("Jane".into()),
            ..Default::default()
        };
        let updated = service.update(id.as_str(), &change).unwrap();
        assert_eq!(updated.name().as_str(), "Jane");

        let stored = service.get(id.as_str()).unwrap();
        assert_eq!(stored.name().as_str(), "Jane");
        assert_eq!(stored.email().as_str(), "john.doe@example.com");
        assert_eq!(stored.phone().as_str(), "+1234567890");

        assert_eq!(queue.jobs().len(), 2);
    }

    #[test]
    fn test_update_notifies_resulting_phone() {
        let (service, _, queue) = setup();
        let id = service.create(&john()).unwrap();

        let change = PatientFields {
            phone: Some("+447700900123".into()),
            ..Default::default()
        };
        service.update(id.as_str(), &change).unwrap();

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].target_contact.as_str(), "+447700900123");
    }

    #[test]
    fn test_update_may_keep_its_own_email_and_phone() {
        let (service, _, _) = setup();
        let id = service.create(&john()).unwrap();

        service
            .update(id.as_str(), &john())
            .expect("re-submitting the same values is not a conflict");
    }

    #[test]
    fn test_update_rejects_collision_with_other_record() {
        let (service, _, queue) = setup();
        let john_id = service.create(&john()).unwrap();
        service
            .create(&fields("Jane", "jane@example.com", "+222"))
            .unwrap();

        let change = PatientFields {
            email: Some("jane@example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(john_id.as_str(), &change),
            Err(PatientError::Conflict)
        ));

        let stored = service.get(john_id.as_str()).unwrap();
        assert_eq!(stored.email().as_str(), "john.doe@example.com");
        assert_eq!(queue.jobs().len(), 2);
    }

    #[test]
    fn test_update_checks_existence_before_validation() {
        let (service, _, _) = setup();
        let bad = PatientFields {
            email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(PatientId::generate().as_str(), &bad),
            Err(PatientError::NotFound)
        ));
    }

    #[test]
    fn test_update_rejects_malformed_field_without_writing() {
        let (service, _, queue) = setup();
        let id = service.create(&john()).unwrap();

        let bad = PatientFields {
            name: Some("Jane".into()),
            phone: Some("12 34".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update(id.as_str(), &bad),
            Err(PatientError::Validation(_))
        ));
        assert_eq!(service.get(id.as_str()).unwrap().name().as_str(), "John Doe");
        assert_eq!(queue.jobs().len(), 1);
    }

    #[test]
    fn test_delete_then_get_is_not_found() {
        let (service, _, queue) = setup();
        let id = service.create(&john()).unwrap();

        service.delete(id.as_str()).expect("delete should succeed");
        assert!(matches!(
            service.get(id.as_str()),
            Err(PatientError::NotFound)
        ));
        assert!(matches!(
            service.delete(id.as_str()),
            Err(PatientError::NotFound)
        ));
        assert_eq!(queue.jobs().len(), 1, "delete must not notify");
    }

    #[test]
    fn test_non_canonical_id_is_not_found() {
        let (service, _, _) = setup();
        assert!(matches!(
            service.get("not-a-valid-id"),
            Err(PatientError::NotFound)
        ));
    }

    #[test]
    fn test_list_returns_insertion_order() {
        let (service, _, _) = setup();
        let a = service.create(&fields("Ann", "ann@example.com", "+1")).unwrap();
        let b = service.create(&fields("Bob", "bob@example.com", "+2")).unwrap();
        let c = service.create(&fields("Cat", "cat@example.com", "+3")).unwrap();

        let ids: Vec<PatientId> = service
            .list()
            .unwrap()
            .iter()
            .map(|p| p.id().clone())
            .collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn test_closed_queue_does_not_fail_mutation() {
        let store = Arc::new(RecordStore::in_memory());
        let service = PatientService::new(store.clone(), Arc::new(RecordingQueue::closed()));

        let id = service.create(&john()).expect("create should still succeed");
        assert!(store.get(&id).unwrap().is_some());
    }

    #[test]
    fn test_concurrent_creates_never_duplicate() {
        const WRITERS: usize = 16;
        let (service, store, queue) = setup();
        let barrier = Arc::new(Barrier::new(WRITERS));

        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let service = service.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    // Same email for everyone, distinct phones.
                    service.create(&fields("Twin", "twin@example.com", &format!("+{i}")))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let created = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(PatientError::Conflict)))
            .count();

        assert_eq!(created, 1);
        assert_eq!(conflicts, WRITERS - 1);
        assert_eq!(store.list_all().unwrap().len(), 1);
        assert_eq!(queue.jobs().len(), 1);
    }

    #[test]
    fn test_update_racing_create_for_same_email() {
        for _ in 0..50 {
            let (service, store, _) = setup();
            let existing = service
                .create(&fields("Ann", "ann@example.com", "+1"))
                .unwrap();
            let barrier = Arc::new(Barrier::new(2));

            let updater = {
                let service = service.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    let changes = PatientFields {
                        email: Some("taken@example.com".into()),
                        ..PatientFields::default()
                    };
                    barrier.wait();
                    service.update(existing.as_str(), &changes).map(|_| ())
                })
            };
            let creator = {
                let service = service.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    service
                        .create(&fields("Bob", "taken@example.com", "+2"))
                        .map(|_| ())
                })
            };

            let results = [updater.join().unwrap(), creator.join().unwrap()];
            assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
            assert!(results
                .iter()
                .any(|r| matches!(r, Err(PatientError::Conflict))));

            let holders = store
                .list_all()
                .unwrap()
                .into_iter()
                .filter(|p| p.email().as_str() == "taken@example.com")
                .count();
            assert_eq!(holders, 1);
        }
    }
}
