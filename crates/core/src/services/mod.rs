//! Use-case services sitting between the transports and the stores.
//!
//! Services are cheap to clone and synchronous; each holds an `Arc` to the repository it needs.

pub mod analytics;
pub mod doctors;
pub mod patients;
pub mod users;

pub use analytics::AnalyticsService;
pub use doctors::{DoctorQuery, DoctorService, DoctorSortField};
pub use patients::{ImportSummary, PatientFilter, PatientQuery, PatientService, PatientSortField};
pub use users::UserService;
