//! Constants used throughout the SepShield core crate.
//!
//! Path and filename constants for the file-backed store live here together with the
//! defaults that the binaries fall back to when the environment does not override them.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_PATIENT_DATA_DIR: &str = "patient_data";

/// Directory name for patient records.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Directory name for user accounts.
pub const USERS_DIR_NAME: &str = "users";

/// Directory name for doctor directory profiles.
pub const DOCTORS_DIR_NAME: &str = "doctors";

/// Filename of the JSON document inside each record directory.
pub const RECORD_JSON_FILENAME: &str = "record.json";

/// Suffix of the temporary file written before an atomic rename.
pub const TEMP_FILE_SUFFIX: &str = "tmp";

/// Default page number for paginated listings (1-based).
pub const DEFAULT_PAGE: u32 = 1;

/// Default page size for paginated listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Minimum accepted password length for user accounts.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Avatar assigned to users who do not upload one.
pub const DEFAULT_AVATAR: &str = "default-avatar.jpg";

/// Image assigned to doctor profiles without an explicit image.
pub const DEFAULT_DOCTOR_IMAGE: &str = "/placeholder.svg";
