//! Read-only aggregations over the patient collection for dashboard charts.
//!
//! The aggregation functions are pure over a slice of patients; [`AnalyticsService`] only loads
//! the collection and hands it over. Every function copes with an empty slice.

use crate::patient::{Department, Patient, PatientStatus};
use crate::risk::RiskLevel;
use crate::store::PatientRepository;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Share of cases assumed to be caught early, pending a real detection signal.
pub const EARLY_DETECTION_RATIO: f64 = 0.65;

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRate {
    pub early_detection: usize,
    pub total_cases: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientOutcomes {
    pub recovered: usize,
    pub under_treatment: usize,
    pub critical: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct RiskLevelCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total: usize,
    pub resolved: usize,
    pub active: usize,
    pub detection_rate: DetectionRate,
    pub patient_outcomes: PatientOutcomes,
    pub risk_levels: RiskLevelCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCases {
    pub month: String,
    pub month_start: NaiveDate,
    pub cases: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DepartmentCases {
    pub department: Department,
    pub cases: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RiskBucket {
    pub name: RiskLevel,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub active_patients: usize,
    pub active_patients_change: i64,
    pub sepsis_alerts: usize,
    pub sepsis_alerts_change: usize,
    pub predicted_outcomes: usize,
    pub average_risk_score: f64,
    pub department_counts: Vec<DepartmentCases>,
}

fn count_status(patients: &[Patient], status: PatientStatus) -> usize {
    patients.iter().filter(|p| p.status == status).count()
}

fn count_level(patients: &[Patient], level: RiskLevel) -> usize {
    patients.iter().filter(|p| p.risk_level() == level).count()
}

pub fn detection_rate(patients: &[Patient]) -> DetectionRate {
    let total = patients.len();
    DetectionRate {
        early_detection: (total as f64 * EARLY_DETECTION_RATIO).floor() as usize,
        total_cases: total,
    }
}

pub fn patient_outcomes(patients: &[Patient]) -> PatientOutcomes {
    PatientOutcomes {
        recovered: count_status(patients, PatientStatus::Discharged),
        under_treatment: count_status(patients, PatientStatus::Active),
        critical: count_status(patients, PatientStatus::Critical),
    }
}

pub fn summary(patients: &[Patient]) -> AnalyticsSummary {
    let outcomes = patient_outcomes(patients);
    AnalyticsSummary {
        total: patients.len(),
        resolved: outcomes.recovered,
        active: outcomes.under_treatment + outcomes.critical,
        detection_rate: detection_rate(patients),
        patient_outcomes: outcomes,
        risk_levels: RiskLevelCounts {
            high: count_level(patients, RiskLevel::High),
            medium: count_level(patients, RiskLevel::Medium),
            low: count_level(patients, RiskLevel::Low),
        },
    }
}

/// Admissions per calendar month of `year`, January first, zero-filled.
pub fn monthly_cases(patients: &[Patient], year: i32) -> Vec<MonthlyCases> {
    let mut counts = [0usize; 12];
    for patient in patients {
        let admitted = patient.admission_date;
        if admitted.year() == year {
            counts[admitted.month0() as usize] += 1;
        }
    }

    MONTH_ABBREVIATIONS
        .iter()
        .zip(counts)
        .enumerate()
        .filter_map(|(index, (month, cases))| {
            NaiveDate::from_ymd_opt(year, index as u32 + 1, 1).map(|month_start| MonthlyCases {
                month: (*month).to_string(),
                month_start,
                cases,
            })
        })
        .collect()
}

/// Case counts for every department, busiest first; ties keep declaration order.
pub fn department_cases(patients: &[Patient]) -> Vec<DepartmentCases> {
    let mut cases: Vec<DepartmentCases> = Department::ALL
        .into_iter()
        .map(|department| DepartmentCases {
            department,
            cases: patients
                .iter()
                .filter(|p| p.department == department)
                .count(),
        })
        .collect();
    cases.sort_by(|a, b| b.cases.cmp(&a.cases));
    cases
}

/// Patients per risk band, High first, zero-filled.
pub fn risk_distribution(patients: &[Patient]) -> Vec<RiskBucket> {
    RiskLevel::ALL
        .into_iter()
        .map(|name| RiskBucket {
            name,
            value: count_level(patients, name),
        })
        .collect()
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

/// Headline numbers for the dashboard as of `now`.
pub fn dashboard_stats(patients: &[Patient], now: DateTime<Utc>) -> DashboardStats {
    let active_patients = count_status(patients, PatientStatus::Active);

    let window_start = now - Duration::days(14);
    let window_end = now - Duration::days(7);
    let active_last_week = patients
        .iter()
        .filter(|p| p.status == PatientStatus::Active)
        .filter(|p| p.created_at >= window_start && p.created_at < window_end)
        .count();

    let today = start_of_day(now);
    let high_risk = || patients.iter().filter(|p| p.risk_level() == RiskLevel::High);

    let average_risk_score = if patients.is_empty() {
        0.0
    } else {
        let total: u64 = patients
            .iter()
            .map(|p| u64::from(p.risk_score().value()))
            .sum();
        total as f64 / patients.len() as f64
    };

    DashboardStats {
        active_patients,
        active_patients_change: active_patients as i64 - active_last_week as i64,
        sepsis_alerts: high_risk().count(),
        sepsis_alerts_change: high_risk().filter(|p| p.updated_at >= today).count(),
        predicted_outcomes: patients
            .iter()
            .filter(|p| !p.vital_signs.is_empty())
            .count(),
        average_risk_score,
        department_counts: department_cases(patients),
    }
}

#[derive(Clone)]
pub struct AnalyticsService {
    patients: Arc<PatientRepository>,
}

impl AnalyticsService {
    pub fn new(patients: Arc<PatientRepository>) -> Self {
        Self { patients }
    }

    pub fn summary(&self) -> CoreResult<AnalyticsSummary> {
        Ok(summary(&self.patients.list()?))
    }

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] for a year the calendar cannot represent.
    pub fn monthly_cases(&self, year: i32) -> CoreResult<Vec<MonthlyCases>> {
        if NaiveDate::from_ymd_opt(year, 1, 1).is_none()
            || NaiveDate::from_ymd_opt(year, 12, 1).is_none()
        {
            return Err(CoreError::InvalidInput(format!("year {year} is out of range")));
        }
        Ok(monthly_cases(&self.patients.list()?, year))
    }

    pub fn department_cases(&self) -> CoreResult<Vec<DepartmentCases>> {
        Ok(department_cases(&self.patients.list()?))
    }

    pub fn risk_distribution(&self) -> CoreResult<Vec<RiskBucket>> {
        Ok(risk_distribution(&self.patients.list()?))
    }

    pub fn detection_rate(&self) -> CoreResult<DetectionRate> {
        Ok(detection_rate(&self.patients.list()?))
    }

    pub fn patient_outcomes(&self) -> CoreResult<PatientOutcomes> {
        Ok(patient_outcomes(&self.patients.list()?))
    }

    pub fn dashboard_stats(&self, now: DateTime<Utc>) -> CoreResult<DashboardStats> {
        Ok(dashboard_stats(&self.patients.list()?, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::tests::{new_patient, vitals};
    use crate::risk::RiskScore;
    use crate::store::MemoryRepository;
    use chrono::TimeZone;

    fn patient(
        department: Department,
        status: PatientStatus,
        score: u8,
        admitted: DateTime<Utc>,
    ) -> Patient {
        let mut input = new_patient("Test Patient", department);
        input.status = Some(status);
        input.risk_score = Some(RiskScore::new(score).expect("valid score"));
        input.admission_date = admitted;
        input.into_patient(admitted).expect("patient should build")
    }

    fn sample() -> Vec<Patient> {
        let jan = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let mar = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();
        let last_year = Utc.with_ymd_and_hms(2023, 3, 2, 10, 0, 0).unwrap();
        vec![
            patient(Department::Icu, PatientStatus::Critical, 90, jan),
            patient(Department::Icu, PatientStatus::Active, 60, jan),
            patient(Department::Surgery, PatientStatus::Active, 30, mar),
            patient(Department::Emergency, PatientStatus::Discharged, 20, last_year),
        ]
    }

    #[test]
    fn test_summary_counts() {
        let summary = summary(&sample());

        assert_eq!(summary.total, 4);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.active, 3);
        assert_eq!(summary.detection_rate.early_detection, 2);
        assert_eq!(summary.detection_rate.total_cases, 4);
        assert_eq!(
            summary.patient_outcomes,
            PatientOutcomes {
                recovered: 1,
                under_treatment: 2,
                critical: 1
            }
        );
        assert_eq!(
            summary.risk_levels,
            RiskLevelCounts {
                high: 1,
                medium: 1,
                low: 2
            }
        );
    }

    #[test]
    fn test_empty_collection() {
        let months = monthly_cases(&[], 2024);
        assert_eq!(months.len(), 12);
        assert!(months.iter().all(|m| m.cases == 0));
        assert_eq!(months[0].month, "Jan");
        assert_eq!(months[11].month_start, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());

        let summary = summary(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.detection_rate.early_detection, 0);

        let buckets = risk_distribution(&[]);
        assert_eq!(buckets.len(), 3);
        assert!(buckets.iter().all(|b| b.value == 0));

        let departments = department_cases(&[]);
        assert_eq!(departments.len(), Department::ALL.len());
        assert_eq!(departments[0].department, Department::Icu);

        let stats = dashboard_stats(&[], Utc::now());
        assert_eq!(stats.average_risk_score, 0.0);
    }

    #[test]
    fn test_monthly_cases_bucket_by_admission_year() {
        let months = monthly_cases(&sample(), 2024);
        assert_eq!(months[0].cases, 2);
        assert_eq!(months[1].cases, 0);
        assert_eq!(months[2].cases, 1);
        assert_eq!(months.iter().map(|m| m.cases).sum::<usize>(), 3);
    }

    #[test]
    fn test_monthly_cases_rejects_unrepresentable_year() {
        let service = AnalyticsService::new(Arc::new(MemoryRepository::<Patient>::new()));

        let result = service.monthly_cases(1_000_000);
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));

        let months = service.monthly_cases(2024).expect("2024 should be accepted");
        assert_eq!(months.len(), 12);
    }

    #[test]
    fn test_department_cases_sorted_descending() {
        let departments = department_cases(&sample());
        assert_eq!(departments[0].department, Department::Icu);
        assert_eq!(departments[0].cases, 2);
        assert_eq!(departments[1].department, Department::Emergency);
        assert_eq!(departments[2].department, Department::Surgery);
        assert_eq!(departments[3].cases, 0);
    }

    #[test]
    fn test_risk_distribution_serializes_name_value() {
        let buckets = risk_distribution(&sample());
        let json = serde_json::to_value(&buckets).expect("buckets should serialize");
        assert_eq!(
            json,
            serde_json::json!([
                {"name": "High", "value": 1},
                {"name": "Medium", "value": 1},
                {"name": "Low", "value": 2}
            ])
        );
    }

    #[test]
    fn test_dashboard_stats() {
        let now = Utc.with_ymd_and_hms(2024, 6, 20, 15, 0, 0).unwrap();
        let ten_days_ago = now - Duration::days(10);

        let mut recent_high = patient(Department::Icu, PatientStatus::Active, 80, now);
        recent_high.updated_at = now - Duration::hours(2);
        let mut old_high = patient(Department::Icu, PatientStatus::Critical, 85, ten_days_ago);
        old_high.updated_at = ten_days_ago;
        let last_week_active = patient(Department::Surgery, PatientStatus::Active, 40, ten_days_ago);

        let mut with_vitals = new_patient("Vitals", Department::Cardiology);
        with_vitals.vital_signs = vec![vitals(37.0, 80, 16, 98.0)];
        let with_vitals = with_vitals.into_patient(now).expect("patient should build");

        let patients = vec![recent_high, old_high, last_week_active, with_vitals];
        let stats = dashboard_stats(&patients, now);

        assert_eq!(stats.active_patients, 3);
        assert_eq!(stats.active_patients_change, 2);
        assert_eq!(stats.sepsis_alerts, 2);
        assert_eq!(stats.sepsis_alerts_change, 1);
        assert_eq!(stats.predicted_outcomes, 1);
        assert!((stats.average_risk_score - (80.0 + 85.0 + 40.0 + 30.0) / 4.0).abs() < 1e-9);
    }
}
