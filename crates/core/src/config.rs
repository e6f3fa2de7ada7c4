//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Environment variables are read by the binaries only; the helpers
//! here take the raw values so they can be tested without touching process-wide state.

use crate::{CoreError, CoreResult};
use std::fmt;
use std::path::{Path, PathBuf};

/// Which persistence backend the services run on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// Records live in process memory and vanish on exit.
    Memory,
    /// Records are JSON documents in a sharded directory tree.
    #[default]
    File,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::File => write!(f, "file"),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    patient_data_dir: PathBuf,
    store_backend: StoreBackend,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] if the file backend is selected with an empty data
    /// directory path.
    pub fn new(patient_data_dir: PathBuf, store_backend: StoreBackend) -> CoreResult<Self> {
        if store_backend == StoreBackend::File && patient_data_dir.as_os_str().is_empty() {
            return Err(CoreError::InvalidInput(
                "patient data directory cannot be empty for the file store".into(),
            ));
        }

        Ok(Self {
            patient_data_dir,
            store_backend,
        })
    }

    pub fn patient_data_dir(&self) -> &Path {
        &self.patient_data_dir
    }

    pub fn store_backend(&self) -> StoreBackend {
        self.store_backend
    }
}

/// Parse the store backend from an optional environment value.
///
/// An unset or blank value selects the file backend.
///
/// # Errors
///
/// Returns [`CoreError::InvalidInput`] for anything other than `memory` or `file`.
pub fn store_backend_from_env_value(value: Option<String>) -> CoreResult<StoreBackend> {
    let Some(raw) = value else {
        return Ok(StoreBackend::default());
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(StoreBackend::default()),
        "memory" => Ok(StoreBackend::Memory),
        "file" => Ok(StoreBackend::File),
        other => Err(CoreError::InvalidInput(format!(
            "unsupported store backend '{other}' (expected 'memory' or 'file')"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_defaults_to_file() {
        assert_eq!(
            store_backend_from_env_value(None).expect("unset should default"),
            StoreBackend::File
        );
        assert_eq!(
            store_backend_from_env_value(Some("  ".into())).expect("blank should default"),
            StoreBackend::File
        );
    }

    #[test]
    fn test_store_backend_parses_case_insensitively() {
        assert_eq!(
            store_backend_from_env_value(Some("Memory".into())).expect("should parse"),
            StoreBackend::Memory
        );
        assert!(store_backend_from_env_value(Some("postgres".into())).is_err());
    }

    #[test]
    fn test_core_config_keeps_data_dir() {
        let cfg = CoreConfig::new(PathBuf::from("/data"), StoreBackend::File)
            .expect("config should build");

        assert_eq!(cfg.patient_data_dir(), Path::new("/data"));
        assert_eq!(cfg.store_backend(), StoreBackend::File);
    }

    #[test]
    fn test_core_config_rejects_empty_dir_for_file_store() {
        let result = CoreConfig::new(PathBuf::new(), StoreBackend::File);
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));

        CoreConfig::new(PathBuf::new(), StoreBackend::Memory)
            .expect("memory store does not need a directory");
    }
}
