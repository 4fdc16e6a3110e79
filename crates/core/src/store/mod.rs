//! Transactional patient record store.
//!
//! ## Transactions
//!
//! [`RecordStore::begin_transaction`] takes the table lock and hands back a [`Transaction`]
//! working on a private copy of the table. Reads inside the transaction see its own writes.
//! [`Transaction::commit`] persists the copy through the configured [`Durability`] backend and
//! only then swaps it in. Dropping a transaction without committing discards the copy.
//!
//! Because the lock is held from begin to commit, a uniqueness check and the write that
//! depends on it cannot interleave with another writer.

mod durability;
mod table;

pub use durability::{Durability, JsonFile, Volatile};

use crate::error::{StoreError, StoreResult};
use crate::record::{Patient, PatientChanges};
use patient_types::{EmailAddress, PatientId, PhoneNumber};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use table::Table;

pub struct RecordStore {
    table: Mutex<Table>,
    durability: Box<dyn Durability>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore").finish_non_exhaustive()
    }
}

impl RecordStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            table: Mutex::new(Table::default()),
            durability: Box::new(Volatile),
        }
    }

    /// Opens (or starts) a JSON-file backed store at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Locked` if another store already has the file open. Otherwise
    /// returns a `StoreError` if the file cannot be read or parsed, or holds records that
    /// violate the table's constraints.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::with_durability(Box::new(JsonFile::open(path)?))
    }

    /// Builds a store over any backend, loading whatever it already holds.
    pub fn with_durability(durability: Box<dyn Durability>) -> StoreResult<Self> {
        let table = Table::from_records(durability.load()?)?;
        tracing::info!("record store opened with {} patient records", table.len());
        Ok(Self {
            table: Mutex::new(table),
            durability,
        })
    }

    pub fn begin_transaction(&self) -> StoreResult<Transaction<'_>> {
        let guard = self.lock()?;
        let staged = guard.clone();
        Ok(Transaction {
            guard,
            staged,
            durability: self.durability.as_ref(),
        })
    }

    pub fn get(&self, id: &PatientId) -> StoreResult<Option<Patient>> {
        Ok(self.lock()?.get(id).cloned())
    }

    pub fn list_all(&self) -> StoreResult<Vec<Patient>> {
        Ok(self.lock()?.records())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Table>> {
        self.table.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Exclusive unit of work against a [`RecordStore`].
pub struct Transaction<'a> {
    guard: MutexGuard<'a, Table>,
    staged: Table,
    durability: &'a dyn Durability,
}

impl Transaction<'_> {
    pub fn find_by_phone_or_email(
        &self,
        phone: &PhoneNumber,
        email: &EmailAddress,
        excluding: Option<&PatientId>,
    ) -> Option<Patient> {
        self.staged
            .find_by_phone_or_email(phone, email, excluding)
            .cloned()
    }

    pub fn get(&self, id: &PatientId) -> Option<Patient> {
        self.staged.get(id).cloned()
    }

    pub fn list_all(&self) -> Vec<Patient> {
        self.staged.records()
    }

    pub fn insert(&mut self, patient: Patient) -> StoreResult<()> {
        self.staged.insert(patient)
    }

    pub fn update(&mut self, id: &PatientId, changes: &PatientChanges) -> StoreResult<Patient> {
        self.staged.update(id, changes)
    }

    pub fn delete(&mut self, id: &PatientId) -> StoreResult<Patient> {
        self.staged.delete(id)
    }

    /// Persists the staged table and makes it visible to other callers.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if persisting fails; the store keeps its previous state.
    pub fn commit(self) -> StoreResult<()> {
        let Transaction {
            mut guard,
            staged,
            durability,
        } = self;
        durability.persist(&staged.records())?;
        *guard = staged;
        Ok(())
    }

    /// Discards every staged change. Equivalent to dropping the transaction.
    pub fn rollback(self) {}
}
