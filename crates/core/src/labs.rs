//! Laboratory results.
//!
//! A lab result carries a free-form primary value (`value` may be a number, a string such as
//! `"Negative"`, or any other JSON value) plus an optional panel of named biomarkers that the
//! progress scorer and the external sepsis model read.

use crate::risk::RiskLevel;
use crate::CoreResult;
use chrono::{DateTime, Utc};
use sepshield_types::NonEmptyText;
use sepshield_uuid::RecordId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Optional biomarker panel. Field names on the wire follow the laboratory export format.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Biomarkers {
    #[serde(rename = "BaseExcess", skip_serializing_if = "Option::is_none")]
    pub base_excess: Option<f64>,
    #[serde(rename = "HCO3", skip_serializing_if = "Option::is_none")]
    pub hco3: Option<f64>,
    #[serde(rename = "FiO2", skip_serializing_if = "Option::is_none")]
    pub fio2: Option<f64>,
    #[serde(rename = "pH", skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    #[serde(rename = "PaCO2", skip_serializing_if = "Option::is_none")]
    pub paco2: Option<f64>,
    #[serde(rename = "SaO2", skip_serializing_if = "Option::is_none")]
    pub sao2: Option<f64>,
    #[serde(rename = "AST", skip_serializing_if = "Option::is_none")]
    pub ast: Option<f64>,
    #[serde(rename = "BUN", skip_serializing_if = "Option::is_none")]
    pub bun: Option<f64>,
    #[serde(rename = "Alkalinephos", skip_serializing_if = "Option::is_none")]
    pub alkalinephos: Option<f64>,
    #[serde(rename = "Calcium", skip_serializing_if = "Option::is_none")]
    pub calcium: Option<f64>,
    #[serde(rename = "Chloride", skip_serializing_if = "Option::is_none")]
    pub chloride: Option<f64>,
    #[serde(rename = "Creatinine", skip_serializing_if = "Option::is_none")]
    pub creatinine: Option<f64>,
    #[serde(rename = "Bilirubin_direct", skip_serializing_if = "Option::is_none")]
    pub bilirubin_direct: Option<f64>,
    #[serde(rename = "Glucose", skip_serializing_if = "Option::is_none")]
    pub glucose: Option<f64>,
    #[serde(rename = "Lactate", skip_serializing_if = "Option::is_none")]
    pub lactate: Option<f64>,
    #[serde(rename = "Magnesium", skip_serializing_if = "Option::is_none")]
    pub magnesium: Option<f64>,
    #[serde(rename = "Phosphate", skip_serializing_if = "Option::is_none")]
    pub phosphate: Option<f64>,
    #[serde(rename = "Potassium", skip_serializing_if = "Option::is_none")]
    pub potassium: Option<f64>,
    #[serde(rename = "Bilirubin_total", skip_serializing_if = "Option::is_none")]
    pub bilirubin_total: Option<f64>,
    #[serde(rename = "TroponinI", skip_serializing_if = "Option::is_none")]
    pub troponin_i: Option<f64>,
    #[serde(rename = "Hct", skip_serializing_if = "Option::is_none")]
    pub hct: Option<f64>,
    #[serde(rename = "Hgb", skip_serializing_if = "Option::is_none")]
    pub hgb: Option<f64>,
    #[serde(rename = "PTT", skip_serializing_if = "Option::is_none")]
    pub ptt: Option<f64>,
    #[serde(rename = "WBC", skip_serializing_if = "Option::is_none")]
    pub wbc: Option<f64>,
    #[serde(rename = "Fibrinogen", skip_serializing_if = "Option::is_none")]
    pub fibrinogen: Option<f64>,
    #[serde(rename = "Platelets", skip_serializing_if = "Option::is_none")]
    pub platelets: Option<f64>,
}

/// The measured part of a lab result, shared by stored and submitted results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabReading {
    #[schema(value_type = String)]
    pub test_type: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_abnormal: Option<bool>,
    #[serde(flatten)]
    pub biomarkers: Biomarkers,
    /// Probability of sepsis reported by the external prediction model, in percent.
    #[serde(default, alias = "risk_percent", skip_serializing_if = "Option::is_none")]
    pub risk_percent: Option<f64>,
    #[serde(default, alias = "risk_level", skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
}

/// One stored lab result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[serde(flatten)]
    pub reading: LabReading,
    pub recorded_at: DateTime<Utc>,
}

/// A lab result as submitted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewLabResult {
    #[serde(flatten)]
    pub reading: LabReading,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl NewLabResult {
    pub fn into_lab_result(self, now: DateTime<Utc>) -> CoreResult<LabResult> {
        if let Some(percent) = self.reading.risk_percent {
            if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
                return Err(crate::CoreError::InvalidInput(format!(
                    "riskPercent must be between 0 and 100, got {percent}"
                )));
            }
        }

        Ok(LabResult {
            id: RecordId::new(),
            reading: self.reading,
            recorded_at: self.recorded_at.unwrap_or(now),
        })
    }
}
