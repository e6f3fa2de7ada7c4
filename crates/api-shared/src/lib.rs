//! # API Shared
//!
//! Shared utilities and definitions for SepShield APIs.
//!
//! Contains:
//! - The JSON response envelopes returned by every endpoint (`ApiResponse`, `AuthRes`)
//! - Shared services like `HealthService`
//! - Authentication utilities: JWT issuing/verification and token extraction
//!
//! Used by `api-rest` and the `sepshield-run` binary for common functionality.

pub mod auth;
pub mod health;
pub mod response;

pub use auth::{AuthError, Claims, TokenKeys};
pub use health::{HealthRes, HealthService};
pub use response::{ApiResponse, AuthRes};
