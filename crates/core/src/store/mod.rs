//! Persistence port and its backends.
//!
//! Every collection (patients, users, doctor profiles) is stored through the same
//! [`Repository`] trait. Services hold an `Arc<dyn Repository<T>>` and never know which backend
//! they run on:
//!
//! - [`MemoryRepository`] keeps records in a `RwLock<Vec<T>>` (tests, demos, `SEPSHIELD_STORE=memory`).
//! - [`FileRepository`] keeps one JSON document per record in a sharded directory tree.
//!
//! Both backends serialise writers, check the optional unique key inside the same critical
//! section as the write, and apply [`Repository::update`] closures atomically: either the
//! closure's whole effect is stored or nothing is.

mod file;
mod memory;

pub use file::FileRepository;
pub use memory::MemoryRepository;

use crate::config::{CoreConfig, StoreBackend};
use crate::constants::{DOCTORS_DIR_NAME, PATIENTS_DIR_NAME, USERS_DIR_NAME};
use crate::doctor::Doctor;
use crate::patient::Patient;
use crate::user::User;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use sepshield_uuid::RecordId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// A type that can be stored in a [`Repository`].
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human-readable entity name used in errors and logs.
    const KIND: &'static str;
    /// Directory name under the data directory for the file backend.
    const COLLECTION: &'static str;
    /// Wire name of the unique field, if the record has one.
    const UNIQUE_FIELD: &'static str = "";

    fn id(&self) -> &RecordId;

    fn created_at(&self) -> DateTime<Utc>;

    /// Value that must be unique across the collection, if any.
    fn unique_key(&self) -> Option<String> {
        None
    }

    /// Hook run on every record read back from storage.
    fn after_load(&mut self) {}
}

impl Record for Patient {
    const KIND: &'static str = "patient";
    const COLLECTION: &'static str = PATIENTS_DIR_NAME;
    const UNIQUE_FIELD: &'static str = "medicalRecordNumber";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn unique_key(&self) -> Option<String> {
        self.medical_record_number.clone()
    }

    fn after_load(&mut self) {
        self.normalise_risk_level();
    }
}

impl Record for User {
    const KIND: &'static str = "user";
    const COLLECTION: &'static str = USERS_DIR_NAME;
    const UNIQUE_FIELD: &'static str = "email";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.email.as_str().to_string())
    }
}

impl Record for Doctor {
    const KIND: &'static str = "doctor";
    const COLLECTION: &'static str = DOCTORS_DIR_NAME;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Closure applied by [`Repository::update`].
pub type UpdateFn<'a, T> = &'a mut dyn FnMut(&mut T) -> CoreResult<()>;

/// Storage operations for one collection.
pub trait Repository<T: Record>: Send + Sync {
    /// Stores a new record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Conflict`] if the id or the unique key is already taken.
    fn insert(&self, record: T) -> CoreResult<T>;

    fn get(&self, id: &RecordId) -> CoreResult<Option<T>>;

    fn find_by_unique_key(&self, key: &str) -> CoreResult<Option<T>>;

    /// All records, oldest first.
    fn list(&self) -> CoreResult<Vec<T>>;

    /// Atomically applies `apply` to the stored record.
    ///
    /// Returns `Ok(None)` when no record has this id. If `apply` fails, or the result would
    /// duplicate another record's unique key, the stored record is left untouched.
    fn update(&self, id: &RecordId, apply: UpdateFn<'_, T>) -> CoreResult<Option<T>>;

    /// Removes the record. Returns `false` when it did not exist.
    fn delete(&self, id: &RecordId) -> CoreResult<bool>;

    fn count(&self) -> CoreResult<usize> {
        Ok(self.list()?.len())
    }
}

pub type PatientRepository = dyn Repository<Patient>;
pub type UserRepository = dyn Repository<User>;
pub type DoctorRepository = dyn Repository<Doctor>;

pub(crate) fn duplicate_key_error<T: Record>(key: &str) -> CoreError {
    CoreError::Conflict(format!(
        "a {} with {} '{}' already exists",
        T::KIND,
        T::UNIQUE_FIELD,
        key
    ))
}

/// Sorts oldest first, breaking ties by id so listings are deterministic.
pub(crate) fn sort_by_creation<T: Record>(records: &mut [T]) {
    records.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(b.id()))
    });
}

/// The three collections a running service needs.
#[derive(Clone)]
pub struct Stores {
    pub patients: Arc<PatientRepository>,
    pub users: Arc<UserRepository>,
    pub doctors: Arc<DoctorRepository>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            patients: Arc::new(MemoryRepository::<Patient>::new()),
            users: Arc::new(MemoryRepository::<User>::new()),
            doctors: Arc::new(MemoryRepository::<Doctor>::new()),
        }
    }

    /// Opens file-backed collections under `cfg.patient_data_dir()`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StorageDirCreation`] if a collection directory cannot be created.
    pub fn open_files(cfg: &CoreConfig) -> CoreResult<Self> {
        Ok(Self {
            patients: Arc::new(FileRepository::<Patient>::open(cfg.patient_data_dir())?),
            users: Arc::new(FileRepository::<User>::open(cfg.patient_data_dir())?),
            doctors: Arc::new(FileRepository::<Doctor>::open(cfg.patient_data_dir())?),
        })
    }

    /// Opens the backend selected in `cfg`.
    pub fn from_config(cfg: &CoreConfig) -> CoreResult<Self> {
        match cfg.store_backend() {
            StoreBackend::Memory => Ok(Self::in_memory()),
            StoreBackend::File => Self::open_files(cfg),
        }
    }
}
