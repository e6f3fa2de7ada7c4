//! Record identifiers and sharded-path utilities.
//!
//! SepShield identifies every stored record (patients, users, doctor profiles, and the readings
//! inside a patient) with a *canonical* UUID: **32 lowercase hexadecimal characters** with no
//! hyphens.
//!
//! This crate provides:
//! - A wrapper type ([`RecordId`]) that guarantees the canonical format once constructed.
//! - Shared sharding logic used by the file-backed store to derive a record's directory.
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Externally supplied identifiers (HTTP path segments, CLI arguments) must already be canonical.
//! Use [`RecordId::parse`] to validate them.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, records are stored under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `patient_data/patients/55/0e/550e8400e29b41d4a716446655440000/`

mod service;

pub use service::RecordId;

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;
