//! JSON envelopes.
//!
//! Every endpoint answers with `{"success": bool, ...}`. Successful reads carry `data` and, for
//! collections, `count`; paginated listings add `total`, `totalPages` and `currentPage`. Errors
//! carry only `message`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<usize>,
}

impl ApiResponse {
    pub fn data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            ..Default::default()
        }
    }

    /// A collection together with its length.
    pub fn list(data: serde_json::Value, count: usize) -> Self {
        Self {
            count: Some(count),
            ..Self::data(data)
        }
    }

    pub fn page(
        data: serde_json::Value,
        count: usize,
        total: usize,
        total_pages: usize,
        current_page: usize,
    ) -> Self {
        Self {
            total: Some(total),
            total_pages: Some(total_pages),
            current_page: Some(current_page),
            ..Self::list(data, count)
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Body returned by register and login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuthRes {
    pub success: bool,
    pub token: String,
    #[schema(value_type = Object)]
    pub user: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_envelope_uses_camel_case_and_skips_empty_fields() {
        let body = ApiResponse::page(json!([1, 2]), 2, 12, 6, 1);
        let value = serde_json::to_value(&body).expect("envelope should serialise");

        assert_eq!(value["totalPages"], 6);
        assert_eq!(value["currentPage"], 1);
        assert!(value.get("message").is_none());
    }

    #[test]
    fn test_error_envelope_has_only_success_and_message() {
        let value = serde_json::to_value(ApiResponse::error("Patient not found"))
            .expect("envelope should serialise");
        assert_eq!(value, json!({"success": false, "message": "Patient not found"}));
    }
}
