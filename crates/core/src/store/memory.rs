use super::{duplicate_key_error, Record, Repository, UpdateFn};
use crate::{CoreError, CoreResult};
use sepshield_uuid::RecordId;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-process store. Records are kept in insertion order.
pub struct MemoryRepository<T: Record> {
    records: RwLock<Vec<T>>,
}

impl<T: Record> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> MemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> CoreResult<RwLockReadGuard<'_, Vec<T>>> {
        self.records.read().map_err(|_| CoreError::LockPoisoned)
    }

    fn write(&self) -> CoreResult<RwLockWriteGuard<'_, Vec<T>>> {
        self.records.write().map_err(|_| CoreError::LockPoisoned)
    }
}

fn key_taken<T: Record>(records: &[T], key: &str, except: Option<&RecordId>) -> bool {
    records
        .iter()
        .filter(|r| Some(r.id()) != except)
        .any(|r| r.unique_key().as_deref() == Some(key))
}

impl<T: Record> Repository<T> for MemoryRepository<T> {
    fn insert(&self, record: T) -> CoreResult<T> {
        let mut records = self.write()?;

        if records.iter().any(|r| r.id() == record.id()) {
            return Err(CoreError::Conflict(format!(
                "{} {} already exists",
                T::KIND,
                record.id()
            )));
        }
        if let Some(key) = record.unique_key() {
            if key_taken(&records, &key, None) {
                return Err(duplicate_key_error::<T>(&key));
            }
        }

        records.push(record.clone());
        Ok(record)
    }

    fn get(&self, id: &RecordId) -> CoreResult<Option<T>> {
        Ok(self.read()?.iter().find(|r| r.id() == id).cloned())
    }

    fn find_by_unique_key(&self, key: &str) -> CoreResult<Option<T>> {
        Ok(self
            .read()?
            .iter()
            .find(|r| r.unique_key().as_deref() == Some(key))
            .cloned())
    }

    fn list(&self) -> CoreResult<Vec<T>> {
        Ok(self.read()?.clone())
    }

    fn update(&self, id: &RecordId, apply: UpdateFn<'_, T>) -> CoreResult<Option<T>> {
        // The write guard is held across the closure so concurrent updates serialise.
        let mut records = self.write()?;

        let Some(index) = records.iter().position(|r| r.id() == id) else {
            return Ok(None);
        };

        let mut updated = records[index].clone();
        apply(&mut updated)?;

        if let Some(key) = updated.unique_key() {
            if key_taken(&records, &key, Some(id)) {
                return Err(duplicate_key_error::<T>(&key));
            }
        }

        records[index] = updated.clone();
        Ok(Some(updated))
    }

    fn delete(&self, id: &RecordId) -> CoreResult<bool> {
        let mut records = self.write()?;
        let before = records.len();
        records.retain(|r| r.id() != id);
        Ok(records.len() != before)
    }

    fn count(&self) -> CoreResult<usize> {
        Ok(self.read()?.len())
    }
}
