//! Clinical progress timeline.
//!
//! Produces one point per lab result (at most [`MAX_PROGRESS_POINTS`], oldest first) with a
//! simplified SOFA score and a qSOFA score. Each lab result is paired with the vital signs
//! recorded at exactly the same instant, or else with the latest of the first
//! [`MAX_VITALS_CONSIDERED`] readings.

use crate::labs::LabResult;
use crate::patient::Patient;
use crate::vitals::VitalSigns;
use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

pub const MAX_PROGRESS_POINTS: usize = 3;
pub const MAX_VITALS_CONSIDERED: usize = 10;

const NO_ANTIBIOTICS: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPoint {
    pub date: NaiveDate,
    pub sofa: u8,
    pub qsofa: u8,
    /// Model risk in percent when the lab carried one, otherwise the patient's risk score.
    pub risk: f64,
    pub lactate: f64,
    pub antibiotics: String,
}

fn points_below(value: Option<f64>, major: f64, minor: f64) -> u8 {
    match value {
        Some(v) if v < major => 2,
        Some(v) if v < minor => 1,
        _ => 0,
    }
}

fn points_above(value: Option<f64>, major: f64, minor: f64) -> u8 {
    match value {
        Some(v) if v > major => 2,
        Some(v) if v > minor => 1,
        _ => 0,
    }
}

/// Simplified SOFA from one vital signs reading and one lab panel.
pub fn sofa_score(vitals: Option<&VitalSigns>, lab: &LabResult) -> u8 {
    let biomarkers = &lab.reading.biomarkers;

    let respiration = points_below(vitals.map(|v| v.oxygen_saturation), 90.0, 95.0);
    let cardiovascular = match vitals.and_then(|v| v.mean_arterial_pressure) {
        Some(map) if map < 70 => 1,
        _ => 0,
    };
    let renal = points_above(biomarkers.creatinine, 2.0, 1.2);
    let liver = points_above(biomarkers.bilirubin_total, 2.0, 1.2);
    let coagulation = points_below(biomarkers.platelets, 100.0, 150.0);

    respiration + cardiovascular + renal + liver + coagulation
}

/// qSOFA from one vital signs reading: tachypnoea and hypotension each add a point.
pub fn qsofa_score(vitals: Option<&VitalSigns>) -> u8 {
    let Some(vitals) = vitals else {
        return 0;
    };

    let tachypnoea = u8::from(vitals.respiratory_rate.is_some_and(|rr| rr >= 22));
    let hypotension = u8::from(vitals.blood_pressure_systolic.is_some_and(|sbp| sbp <= 100));
    tachypnoea + hypotension
}

fn antibiotics(patient: &Patient) -> String {
    match patient.medications.as_deref().map(str::trim) {
        Some(meds) if !meds.is_empty() && !meds.eq_ignore_ascii_case("none") => meds.to_string(),
        _ => NO_ANTIBIOTICS.to_string(),
    }
}

/// Builds the progress timeline for `patient`. Empty when there are no lab results.
pub fn patient_progress(patient: &Patient) -> Vec<ProgressPoint> {
    let mut labs: Vec<&LabResult> = patient.lab_results.iter().collect();
    labs.sort_by_key(|l| l.recorded_at);
    labs.truncate(MAX_PROGRESS_POINTS);

    let mut vitals: Vec<&VitalSigns> = patient.vital_signs.iter().collect();
    vitals.sort_by_key(|v| v.recorded_at);
    vitals.truncate(MAX_VITALS_CONSIDERED);

    let antibiotics = antibiotics(patient);

    labs.into_iter()
        .map(|lab| {
            let matched = vitals
                .iter()
                .find(|v| v.recorded_at == lab.recorded_at)
                .or_else(|| vitals.last())
                .copied();

            ProgressPoint {
                date: lab.recorded_at.date_naive(),
                sofa: sofa_score(matched, lab),
                qsofa: qsofa_score(matched),
                risk: lab
                    .reading
                    .risk_percent
                    .unwrap_or_else(|| f64::from(patient.risk_score().value())),
                lactate: lab.reading.biomarkers.lactate.unwrap_or(0.0),
                antibiotics: antibiotics.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labs::{Biomarkers, LabReading, NewLabResult};
    use crate::patient::tests::{new_patient, vitals};
    use crate::patient::Department;
    use chrono::{Duration, TimeZone, Utc};
    use sepshield_types::NonEmptyText;

    fn lab(at: chrono::DateTime<Utc>, biomarkers: Biomarkers) -> NewLabResult {
        NewLabResult {
            reading: LabReading {
                test_type: NonEmptyText::new("Panel").expect("valid text"),
                value: None,
                unit: None,
                normal_range: None,
                is_abnormal: None,
                biomarkers,
                risk_percent: None,
                risk_level: None,
            },
            recorded_at: Some(at),
        }
    }

    #[test]
    fn test_no_labs_gives_empty_timeline() {
        let mut input = new_patient("Ada", Department::Icu);
        input.vital_signs = vec![vitals(37.0, 80, 16, 98.0)];
        let patient = input.into_patient(Utc::now()).expect("patient should build");
        assert!(patient_progress(&patient).is_empty());
    }

    #[test]
    fn test_sofa_and_qsofa_with_matching_vitals() {
        let t0 = Utc.with_ymd_and_hms(2024, 4, 2, 8, 0, 0).unwrap();
        let mut input = new_patient("Ada", Department::Icu);
        input.medications = Some("Piperacillin".into());

        let mut matched = vitals(38.2, 105, 24, 89.0);
        matched.recorded_at = Some(t0);
        matched.mean_arterial_pressure = Some(65);
        matched.blood_pressure_systolic = Some(95);
        let mut other = vitals(37.0, 80, 16, 99.0);
        other.recorded_at = Some(t0 + Duration::hours(6));
        input.vital_signs = vec![matched, other];

        input.lab_results = vec![lab(
            t0,
            Biomarkers {
                creatinine: Some(2.5),
                bilirubin_total: Some(1.5),
                platelets: Some(120.0),
                lactate: Some(3.1),
                ..Default::default()
            },
        )];

        let patient = input.into_patient(t0).expect("patient should build");
        let points = patient_progress(&patient);
        assert_eq!(points.len(), 1);

        let point = &points[0];
        // 2 (SpO2 < 90) + 1 (MAP < 70) + 2 (creatinine) + 1 (bilirubin) + 1 (platelets)
        assert_eq!(point.sofa, 7);
        assert_eq!(point.qsofa, 2);
        assert_eq!(point.lactate, 3.1);
        assert_eq!(point.antibiotics, "Piperacillin");
        assert_eq!(point.date, t0.date_naive());
    }

    #[test]
    fn test_falls_back_to_latest_vitals_and_patient_risk() {
        let t0 = Utc.with_ymd_and_hms(2024, 4, 2, 8, 0, 0).unwrap();
        let mut input = new_patient("Ada", Department::Icu);
        input.medications = Some("None".into());

        let mut early = vitals(37.0, 80, 25, 99.0);
        early.recorded_at = Some(t0);
        let mut late = vitals(37.0, 80, 16, 93.0);
        late.recorded_at = Some(t0 + Duration::hours(2));
        input.vital_signs = vec![late, early];
        input.lab_results = vec![lab(t0 + Duration::hours(1), Biomarkers::default())];

        let patient = input.into_patient(t0).expect("patient should build");
        let point = &patient_progress(&patient)[0];

        // The latest reading (SpO2 93, RR 16) is used.
        assert_eq!(point.sofa, 1);
        assert_eq!(point.qsofa, 0);
        assert_eq!(point.risk, f64::from(patient.risk_score().value()));
        assert_eq!(point.lactate, 0.0);
        assert_eq!(point.antibiotics, "N/A");
    }

    #[test]
    fn test_timeline_is_capped_and_ascending() {
        let t0 = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();
        let mut input = new_patient("Ada", Department::Icu);
        input.lab_results = (0..5)
            .rev()
            .map(|day| lab(t0 + Duration::days(day), Biomarkers::default()))
            .collect();

        let patient = input.into_patient(t0).expect("patient should build");
        let points = patient_progress(&patient);

        assert_eq!(points.len(), MAX_PROGRESS_POINTS);
        assert_eq!(points[0].date, t0.date_naive());
        assert_eq!(points[2].date, (t0 + Duration::days(2)).date_naive());
        assert_eq!(points[0].sofa, 0);
        assert_eq!(points[0].qsofa, 0);
    }
}
