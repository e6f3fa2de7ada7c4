//! Vital signs readings.
//!
//! A [`VitalSigns`] record is an immutable snapshot. Readings arrive as [`NewVitalSigns`], are
//! validated, stamped with an id and timestamp, and then appended to the owning patient.

use crate::risk::{calculate_risk_score, RiskScore, ScoringInputs};
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use sepshield_uuid::RecordId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One stored vital signs snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    #[schema(value_type = String)]
    pub id: RecordId,
    /// Body temperature in °C.
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure_systolic: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure_diastolic: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_arterial_pressure: Option<u32>,
    /// Peripheral oxygen saturation in percent.
    pub oxygen_saturation: f64,
    pub recorded_at: DateTime<Utc>,
}

impl VitalSigns {
    pub fn scoring_inputs(&self) -> ScoringInputs {
        ScoringInputs {
            temperature: self.temperature,
            heart_rate: self.heart_rate,
            respiratory_rate: self.respiratory_rate,
            oxygen_saturation: self.oxygen_saturation,
        }
    }

    pub fn risk_score(&self) -> RiskScore {
        calculate_risk_score(&self.scoring_inputs())
    }
}

/// A vital signs reading as submitted by a client.
///
/// Blood pressure may be given either as the two integer fields or as a single
/// `bloodPressure: "120/80"` string. Explicit integer fields win when both are present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewVitalSigns {
    pub temperature: f64,
    #[serde(default)]
    pub heart_rate: Option<u32>,
    #[serde(default)]
    pub respiratory_rate: Option<u32>,
    #[serde(default)]
    pub blood_pressure: Option<String>,
    #[serde(default)]
    pub blood_pressure_systolic: Option<u32>,
    #[serde(default)]
    pub blood_pressure_diastolic: Option<u32>,
    #[serde(default)]
    pub mean_arterial_pressure: Option<u32>,
    pub oxygen_saturation: f64,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl NewVitalSigns {
    /// Validates the reading and stamps it with a fresh id.
    ///
    /// `now` is used when the client did not supply `recordedAt`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] if:
    /// - the temperature is not a finite number,
    /// - oxygen saturation is outside `0..=100`, or
    /// - the `bloodPressure` string is not of the form `SBP/DBP`.
    pub fn into_vital_signs(self, now: DateTime<Utc>) -> CoreResult<VitalSigns> {
        if !self.temperature.is_finite() {
            return Err(CoreError::InvalidInput(
                "temperature must be a finite number".into(),
            ));
        }
        if !self.oxygen_saturation.is_finite() || !(0.0..=100.0).contains(&self.oxygen_saturation)
        {
            return Err(CoreError::InvalidInput(format!(
                "oxygenSaturation must be between 0 and 100, got {}",
                self.oxygen_saturation
            )));
        }

        let (parsed_systolic, parsed_diastolic) = match self.blood_pressure.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                let (sbp, dbp) = parse_blood_pressure(raw)?;
                (Some(sbp), Some(dbp))
            }
            _ => (None, None),
        };

        Ok(VitalSigns {
            id: RecordId::new(),
            temperature: self.temperature,
            heart_rate: self.heart_rate,
            respiratory_rate: self.respiratory_rate,
            blood_pressure_systolic: self.blood_pressure_systolic.or(parsed_systolic),
            blood_pressure_diastolic: self.blood_pressure_diastolic.or(parsed_diastolic),
            mean_arterial_pressure: self.mean_arterial_pressure,
            oxygen_saturation: self.oxygen_saturation,
            recorded_at: self.recorded_at.unwrap_or(now),
        })
    }
}

/// Splits a `"SBP/DBP"` string into its two integer parts.
pub fn parse_blood_pressure(raw: &str) -> CoreResult<(u32, u32)> {
    let invalid = || {
        CoreError::InvalidInput(format!(
            "bloodPressure must look like '120/80', got '{}'",
            raw
        ))
    };

    let (sbp, dbp) = raw.split_once('/').ok_or_else(invalid)?;
    let sbp = sbp.trim().parse::<u32>().map_err(|_| invalid())?;
    let dbp = dbp.trim().parse::<u32>().map_err(|_| invalid())?;
    Ok((sbp, dbp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading() -> NewVitalSigns {
        NewVitalSigns {
            temperature: 37.2,
            heart_rate: Some(88),
            respiratory_rate: Some(16),
            oxygen_saturation: 97.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_recorded_at_defaults_to_now() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let vitals = reading().into_vital_signs(now).expect("reading should be valid");
        assert_eq!(vitals.recorded_at, now);
    }

    #[test]
    fn test_blood_pressure_string_is_split() {
        let mut input = reading();
        input.blood_pressure = Some(" 118 / 76 ".into());
        let vitals = input.into_vital_signs(Utc::now()).expect("reading should be valid");
        assert_eq!(vitals.blood_pressure_systolic, Some(118));
        assert_eq!(vitals.blood_pressure_diastolic, Some(76));
    }

    #[test]
    fn test_explicit_blood_pressure_fields_take_precedence() {
        let mut input = reading();
        input.blood_pressure = Some("118/76".into());
        input.blood_pressure_systolic = Some(130);
        let vitals = input.into_vital_signs(Utc::now()).expect("reading should be valid");
        assert_eq!(vitals.blood_pressure_systolic, Some(130));
        assert_eq!(vitals.blood_pressure_diastolic, Some(76));
    }

    #[test]
    fn test_malformed_blood_pressure_is_rejected() {
        for bad in ["120", "120/", "abc/80", "120-80"] {
            let mut input = reading();
            input.blood_pressure = Some(bad.into());
            assert!(
                matches!(input.into_vital_signs(Utc::now()), Err(CoreError::InvalidInput(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_oxygen_saturation_range_is_enforced() {
        for bad in [-1.0, 100.5, f64::NAN] {
            let mut input = reading();
            input.oxygen_saturation = bad;
            assert!(input.into_vital_signs(Utc::now()).is_err());
        }
    }

    #[test]
    fn test_negative_integer_vitals_fail_to_deserialize() {
        let json = r#"{"temperature": 37.0, "heartRate": -5, "oxygenSaturation": 98}"#;
        let parsed: Result<NewVitalSigns, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_camel_case_payload_parses() {
        let json = r#"{
            "temperature": 38.9,
            "heartRate": 112,
            "respiratoryRate": 24,
            "bloodPressure": "95/60",
            "oxygenSaturation": 91
        }"#;
        let parsed: NewVitalSigns = serde_json::from_str(json).expect("payload should parse");
        let vitals = parsed.into_vital_signs(Utc::now()).expect("reading should be valid");
        assert_eq!(vitals.risk_score().value(), 100);
        assert_eq!(vitals.blood_pressure_systolic, Some(95));
    }
}
