//! The in-memory record table and its unique indexes.
//!
//! The table enforces its own constraints independently of the service layer: an insert or
//! update that would duplicate an id, email or phone is rejected here even if the caller
//! skipped its uniqueness check.

use crate::error::{StoreError, StoreResult};
use crate::record::{Patient, PatientChanges};
use patient_types::{EmailAddress, PatientId, PhoneNumber};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct Row {
    seq: u64,
    patient: Patient,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    rows: HashMap<PatientId, Row>,
    by_email: HashMap<EmailAddress, PatientId>,
    by_phone: HashMap<PhoneNumber, PatientId>,
    next_seq: u64,
}

impl Table {
    /// Rebuilds a table from records in their stored order.
    pub(crate) fn from_records(records: Vec<Patient>) -> StoreResult<Self> {
        let mut table = Table::default();
        for patient in records {
            table.insert(patient)?;
        }
        Ok(table)
    }

    pub(crate) fn get(&self, id: &PatientId) -> Option<&Patient> {
        self.rows.get(id).map(|row| &row.patient)
    }

    /// All records in insertion order.
    pub(crate) fn records(&self) -> Vec<Patient> {
        let mut rows: Vec<&Row> = self.rows.values().collect();
        rows.sort_by_key(|row| row.seq);
        rows.into_iter().map(|row| row.patient.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    /// First record, other than `excluding`, that holds either `phone` or `email`.
    pub(crate) fn find_by_phone_or_email(
        &self,
        phone: &PhoneNumber,
        email: &EmailAddress,
        excluding: Option<&PatientId>,
    ) -> Option<&Patient> {
        [self.by_phone.get(phone), self.by_email.get(email)]
            .into_iter()
            .flatten()
            .find(|id| Some(*id) != excluding)
            .and_then(|id| self.get(id))
    }

    pub(crate) fn insert(&mut self, patient: Patient) -> StoreResult<()> {
        if self.rows.contains_key(patient.id()) {
            return Err(StoreError::ConstraintViolation("id"));
        }
        self.check_unique(&patient)?;

        let id = patient.id().clone();
        self.by_email.insert(patient.email().clone(), id.clone());
        self.by_phone.insert(patient.phone().clone(), id.clone());
        self.rows.insert(
            id,
            Row {
                seq: self.next_seq,
                patient,
            },
        );
        self.next_seq += 1;
        Ok(())
    }

    /// Applies `changes` to the record `id` and returns the merged record.
    pub(crate) fn update(
        &mut self,
        id: &PatientId,
        changes: &PatientChanges,
    ) -> StoreResult<Patient> {
        let current = self
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let merged = current.merged(changes);
        self.check_unique(&merged)?;

        let previous = self.replace(merged.clone())?;
        self.by_email.remove(previous.email());
        self.by_phone.remove(previous.phone());
        self.by_email.insert(merged.email().clone(), id.clone());
        self.by_phone.insert(merged.phone().clone(), id.clone());
        Ok(merged)
    }

    pub(crate) fn delete(&mut self, id: &PatientId) -> StoreResult<Patient> {
        let row = self
            .rows
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        self.by_email.remove(row.patient.email());
        self.by_phone.remove(row.patient.phone());
        Ok(row.patient)
    }

    fn replace(&mut self, patient: Patient) -> StoreResult<Patient> {
        let row = self
            .rows
            .get_mut(patient.id())
            .ok_or_else(|| StoreError::NotFound(patient.id().clone()))?;
        Ok(std::mem::replace(&mut row.patient, patient))
    }

    /// Rejects `patient` if its email or phone belongs to a different record.
    fn check_unique(&self, patient: &Patient) -> StoreResult<()> {
        let owned_by_other =
            |owner: Option<&PatientId>| owner.is_some_and(|owner| owner != patient.id());

        if owned_by_other(self.by_email.get(patient.email())) {
            return Err(StoreError::ConstraintViolation("email"));
        }
        if owned_by_other(self.by_phone.get(patient.phone())) {
            return Err(StoreError::ConstraintViolation("phone"));
        }
        Ok(())
    }
}
