//! # SepShield Core
//!
//! Core business logic for the SepShield sepsis monitoring system.
//!
//! This crate contains the clinical domain model and data operations:
//! - Patients with their vital signs and lab results, kept under `PATIENT_DATA_DIR`
//! - The rule-based sepsis risk score and its Low/Medium/High banding
//! - Ward analytics and per-patient SOFA/qSOFA progress
//! - Staff accounts and the doctor directory
//!
//! **No API concerns**: authentication tokens, HTTP servers, or response envelopes belong in
//! `api-rest` or `api-shared`.

pub mod config;
pub mod constants;
pub mod doctor;
pub mod error;
pub mod labs;
pub mod patient;
pub mod progress;
pub mod query;
pub mod risk;
pub mod seed;
pub mod services;
pub mod store;
pub mod user;
pub mod vitals;

pub use config::{store_backend_from_env_value, CoreConfig, StoreBackend};
pub use constants::DEFAULT_PATIENT_DATA_DIR;
pub use error::{CoreError, CoreResult};
pub use patient::{Department, NewPatient, Patient, PatientDetail, PatientStatus, PatientUpdate};
pub use query::{Page, PageRequest, SortSpec};
pub use risk::{calculate_risk_score, RiskLevel, RiskScore, ScoringInputs};
pub use services::{AnalyticsService, DoctorService, PatientService, UserService};
pub use store::{Repository, Stores};
pub use user::{Role, User, UserProfile};
pub use vitals::{NewVitalSigns, VitalSigns};
