pub mod analytics;
pub mod auth;
pub mod doctors;
pub mod health;
pub mod patients;

use crate::error::ApiError;
use serde::Serialize;

/// Serialises a domain value for the `data` field of the envelope.
pub(crate) fn to_data<T: Serialize>(value: &T) -> Result<serde_json::Value, ApiError> {
    Ok(serde_json::to_value(value)?)
}
