//! Where committed tables go.
//!
//! A [`Durability`] backend is handed the full list of records on every commit. The commit
//! only becomes visible once `persist` returns `Ok`, so a failed write leaves the previous
//! state in place.

use crate::constants::STORE_FILE_VERSION;
use crate::error::{StoreError, StoreResult};
use crate::record::Patient;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub trait Durability: Send + Sync {
    /// Records persisted by a previous process, in insertion order.
    fn load(&self) -> StoreResult<Vec<Patient>>;

    /// Makes `records` the durable state.
    fn persist(&self, records: &[Patient]) -> StoreResult<()>;
}

/// Keeps nothing. Used by tests and by servers started without a data file.
#[derive(Debug, Default, Clone, Copy)]
pub struct Volatile;

impl Durability for Volatile {
    fn load(&self) -> StoreResult<Vec<Patient>> {
        Ok(Vec::new())
    }

    fn persist(&self, _records: &[Patient]) -> StoreResult<()> {
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    patients: Vec<Patient>,
}

/// A single JSON document holding the whole table.
///
/// Writes go to a sibling temporary file which is synced and then renamed over the target, so
/// readers never observe a half-written table.
///
/// The file is owned by one `JsonFile` at a time. Opening takes an exclusive advisory lock on
/// a sibling `<name>.lock` file, held until the `JsonFile` is dropped.
#[derive(Debug)]
pub struct JsonFile {
    path: PathBuf,
    _lock: File,
}

impl JsonFile {
    /// Claims the store file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Locked` if another handle, in this process or another, already
    /// holds the file, or `StoreError::FileWrite` if the lock file cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(StoreError::FileWrite)?;
        }

        let lock_path = sibling(&path, ".lock");
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(StoreError::FileWrite)?;
        lock.try_lock_exclusive().map_err(|_| StoreError::Locked(path.clone()))?;

        tracing::debug!("acquired store lock {}", lock_path.display());
        Ok(Self { path, _lock: lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        sibling(&self.path, ".tmp")
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

impl Durability for JsonFile {
    fn load(&self) -> StoreResult<Vec<Patient>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&self.path).map_err(StoreError::FileRead)?;
        let file: StoreFile = serde_json::from_str(&raw).map_err(StoreError::Deserialization)?;
        if file.version != STORE_FILE_VERSION {
            tracing::warn!(
                "store file {} has version {}, expected {}",
                self.path.display(),
                file.version,
                STORE_FILE_VERSION
            );
        }
        Ok(file.patients)
    }

    fn persist(&self, records: &[Patient]) -> StoreResult<()> {
        #[derive(Serialize)]
        struct StoreFileRef<'a> {
            version: u32,
            patients: &'a [Patient],
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(StoreError::FileWrite)?;
        }

        let json = serde_json::to_string_pretty(&StoreFileRef {
            version: STORE_FILE_VERSION,
            patients: records,
        })
        .map_err(StoreError::Serialization)?;

        let temp = self.temp_path();
        let mut file = File::create(&temp).map_err(StoreError::FileWrite)?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(StoreError::FileWrite)?;
        drop(file);
        fs::rename(&temp, &self.path).map_err(StoreError::FileWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NewPatient;
    use patient_types::{EmailAddress, NonEmptyText, PatientId, PhoneNumber};
    use tempfile::TempDir;

    fn patient(name: &str, email: &str, phone: &str) -> Patient {
        Patient::new(
            PatientId::generate(),
            NewPatient {
                name: NonEmptyText::new(name).unwrap(),
                email: EmailAddress::new(email).unwrap(),
                phone: PhoneNumber::new(phone).unwrap(),
            },
        )
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file = JsonFile::open(temp_dir.path().join("patients.json")).unwrap();
        assert!(file.load().expect("load should succeed").is_empty());
    }

    #[test]
    fn test_persist_then_load_preserves_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file = JsonFile::open(temp_dir.path().join("nested").join("patients.json")).unwrap();
        let records = vec![
            patient("Ann", "ann@example.com", "+1"),
            patient("Bob", "bob@example.com", "+2"),
        ];

        file.persist(&records).expect("persist should succeed");
        assert!(!file.temp_path().exists(), "temp file should be renamed away");

        let loaded = file.load().expect("load should succeed");
        assert_eq!(loaded, records);
    }

    #[test]
    fn test_load_rejects_invalid_records() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("patients.json");
        fs::write(
            &path,
            r#"{"version":1,"patients":[{"id":"550e8400e29b41d4a716446655440000","name":"A","email":"broken","phone":"1"}]}"#,
        )
        .unwrap();

        let err = JsonFile::open(&path)
            .unwrap()
            .load()
            .expect_err("invalid email on disk should fail the load");
        assert!(matches!(err, StoreError::Deserialization(_)));
    }

    #[test]
    fn test_second_open_is_locked_out() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("patients.json");

        let first = JsonFile::open(&path).expect("first open should succeed");
        let err = JsonFile::open(&path).expect_err("second open should be refused");
        assert!(matches!(err, StoreError::Locked(ref p) if p == &path));

        drop(first);
        JsonFile::open(&path).expect("lock should be released on drop");
    }

    #[test]
    fn test_persist_replaces_previous_contents() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let file = JsonFile::open(temp_dir.path().join("patients.json")).unwrap();

        file.persist(&[patient("Ann", "ann@example.com", "+1")]).unwrap();
        let second = vec![patient("Bob", "bob@example.com", "+2")];
        file.persist(&second).unwrap();

        assert_eq!(file.load().unwrap(), second);
    }
}
