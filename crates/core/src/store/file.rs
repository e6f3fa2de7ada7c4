use super::{duplicate_key_error, sort_by_creation, Record, Repository, UpdateFn};
use crate::constants::{RECORD_JSON_FILENAME, TEMP_FILE_SUFFIX};
use crate::{CoreError, CoreResult};
use sepshield_uuid::RecordId;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// JSON-file store.
///
/// Each record lives at `<data_dir>/<collection>/<s1>/<s2>/<id>/record.json`, where `s1`/`s2`
/// are the first two pairs of hex characters of the id. Writes go to a temporary file that is
/// then renamed over the target, so readers never observe a half-written document.
///
/// A single mutex serialises all writers of one collection. Reads do not take the lock.
pub struct FileRepository<T: Record> {
    root: PathBuf,
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> FileRepository<T> {
    /// Opens (creating if needed) the collection directory under `data_dir`.
    pub fn open(data_dir: &Path) -> CoreResult<Self> {
        let root = data_dir.join(T::COLLECTION);
        fs::create_dir_all(&root).map_err(CoreError::StorageDirCreation)?;

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| CoreError::LockPoisoned)
    }

    fn record_dir(&self, id: &RecordId) -> PathBuf {
        id.sharded_dir(&self.root)
    }

    fn record_path(&self, id: &RecordId) -> PathBuf {
        self.record_dir(id).join(RECORD_JSON_FILENAME)
    }

    fn read_record(path: &Path) -> CoreResult<T> {
        let contents = fs::read_to_string(path).map_err(CoreError::FileRead)?;
        let mut record: T = serde_json::from_str(&contents).map_err(CoreError::Deserialization)?;
        record.after_load();
        Ok(record)
    }

    fn write_record(&self, record: &T) -> CoreResult<()> {
        let dir = self.record_dir(record.id());
        fs::create_dir_all(&dir).map_err(CoreError::StorageDirCreation)?;

        let json = serde_json::to_string_pretty(record).map_err(CoreError::Serialization)?;
        let target = dir.join(RECORD_JSON_FILENAME);
        let temp = target.with_extension(format!("json.{TEMP_FILE_SUFFIX}"));

        fs::write(&temp, json).map_err(CoreError::FileWrite)?;
        fs::rename(&temp, &target).map_err(CoreError::FileWrite)
    }

    /// Walks the three shard levels and yields every `record.json` path.
    fn record_paths(&self) -> Vec<PathBuf> {
        fn subdirs(dir: &Path) -> Vec<PathBuf> {
            match fs::read_dir(dir) {
                Ok(entries) => entries
                    .flatten()
                    .map(|e| e.path())
                    .filter(|p| p.is_dir())
                    .collect(),
                Err(_) => Vec::new(),
            }
        }

        let mut paths = Vec::new();
        for s1 in subdirs(&self.root) {
            for s2 in subdirs(&s1) {
                for record_dir in subdirs(&s2) {
                    let path = record_dir.join(RECORD_JSON_FILENAME);
                    if path.is_file() {
                        paths.push(path);
                    }
                }
            }
        }
        paths
    }

    /// Loads every parsable record. Unreadable files are logged and skipped.
    fn load_all(&self) -> Vec<T> {
        let mut records: Vec<T> = self
            .record_paths()
            .into_iter()
            .filter_map(|path| match Self::read_record(&path) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(
                        "skipping unreadable {} record {}: {}",
                        T::KIND,
                        path.display(),
                        e
                    );
                    None
                }
            })
            .collect();
        sort_by_creation(&mut records);
        records
    }

    fn key_taken(&self, key: &str, except: Option<&RecordId>) -> bool {
        self.load_all()
            .iter()
            .filter(|r| Some(r.id()) != except)
            .any(|r| r.unique_key().as_deref() == Some(key))
    }
}

impl<T: Record> Repository<T> for FileRepository<T> {
    fn insert(&self, record: T) -> CoreResult<T> {
        let _guard = self.lock()?;

        if self.record_path(record.id()).exists() {
            return Err(CoreError::Conflict(format!(
                "{} {} already exists",
                T::KIND,
                record.id()
            )));
        }
        if let Some(key) = record.unique_key() {
            if self.key_taken(&key, None) {
                return Err(duplicate_key_error::<T>(&key));
            }
        }

        self.write_record(&record)?;
        tracing::debug!("stored {} {}", T::KIND, record.id());
        Ok(record)
    }

    fn get(&self, id: &RecordId) -> CoreResult<Option<T>> {
        let path = self.record_path(id);
        if !path.is_file() {
            return Ok(None);
        }
        Self::read_record(&path).map(Some)
    }

    fn find_by_unique_key(&self, key: &str) -> CoreResult<Option<T>> {
        Ok(self
            .load_all()
            .into_iter()
            .find(|r| r.unique_key().as_deref() == Some(key)))
    }

    fn list(&self) -> CoreResult<Vec<T>> {
        Ok(self.load_all())
    }

    fn update(&self, id: &RecordId, apply: UpdateFn<'_, T>) -> CoreResult<Option<T>> {
        let _guard = self.lock()?;

        let path = self.record_path(id);
        if !path.is_file() {
            return Ok(None);
        }

        let before = Self::read_record(&path)?;
        let mut updated = before.clone();
        apply(&mut updated)?;

        if let Some(key) = updated.unique_key() {
            if updated.unique_key() != before.unique_key() && self.key_taken(&key, Some(id)) {
                return Err(duplicate_key_error::<T>(&key));
            }
        }

        self.write_record(&updated)?;
        Ok(Some(updated))
    }

    fn delete(&self, id: &RecordId) -> CoreResult<bool> {
        let _guard = self.lock()?;

        let dir = self.record_dir(id);
        if !dir.is_dir() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).map_err(CoreError::FileDelete)?;
        tracing::debug!("deleted {} {}", T::KIND, id);
        Ok(true)
    }
}
