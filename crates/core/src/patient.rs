//! The patient aggregate.
//!
//! A [`Patient`] owns its vital signs and lab results. The current risk state is held in two
//! private fields that can only change together through [`Patient::set_risk_score`], so the
//! stored level is always the banding of the stored score.

use crate::labs::{LabResult, NewLabResult};
use crate::risk::{RiskLevel, RiskScore};
use crate::vitals::{NewVitalSigns, VitalSigns};
use crate::CoreResult;
use chrono::{DateTime, NaiveDate, Utc};
use sepshield_types::NonEmptyText;
use sepshield_uuid::RecordId;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Hospital departments, in declaration order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
pub enum Department {
    #[serde(rename = "ICU")]
    Icu,
    Emergency,
    #[serde(rename = "General Medicine")]
    GeneralMedicine,
    Cardiology,
    Neurology,
    Surgery,
    Pediatrics,
}

impl Department {
    pub const ALL: [Department; 7] = [
        Department::Icu,
        Department::Emergency,
        Department::GeneralMedicine,
        Department::Cardiology,
        Department::Neurology,
        Department::Surgery,
        Department::Pediatrics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Department::Icu => "ICU",
            Department::Emergency => "Emergency",
            Department::GeneralMedicine => "General Medicine",
            Department::Cardiology => "Cardiology",
            Department::Neurology => "Neurology",
            Department::Surgery => "Surgery",
            Department::Pediatrics => "Pediatrics",
        }
    }

    /// Looks a department up by its display name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, ToSchema,
)]
pub enum PatientStatus {
    #[default]
    Active,
    Discharged,
    Critical,
}

impl PatientStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PatientStatus::Active => "Active",
            PatientStatus::Discharged => "Discharged",
            PatientStatus::Critical => "Critical",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Active, Self::Discharged, Self::Critical]
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts either an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
///
/// Admission dates typed into a form usually arrive without a time component.
fn deserialize_flexible_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flexible_datetime(&raw).map_err(serde::de::Error::custom)
}

fn deserialize_optional_flexible_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_flexible_datetime(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

pub(crate) fn parse_flexible_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid date '{raw}' (expected RFC 3339 or YYYY-MM-DD)"))
}

/// The patient aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub name: NonEmptyText,
    pub age: u32,
    pub gender: Gender,
    pub admission_date: DateTime<Utc>,
    pub department: Department,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_record_number: Option<String>,
    #[serde(default)]
    pub status: PatientStatus,
    #[serde(default)]
    #[schema(value_type = u8)]
    risk_score: RiskScore,
    #[serde(default)]
    risk_level: RiskLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medications: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub assigned_doctor: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vital_signs: Vec<VitalSigns>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lab_results: Vec<LabResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Patient {
    pub fn risk_score(&self) -> RiskScore {
        self.risk_score
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    /// Sets the score and recomputes the level from it.
    pub fn set_risk_score(&mut self, score: RiskScore) {
        self.risk_score = score;
        self.risk_level = score.level();
    }

    /// Restores the level invariant after loading a record written elsewhere.
    pub(crate) fn normalise_risk_level(&mut self) {
        self.risk_level = self.risk_score.level();
    }

    /// The most recent vital signs by `recordedAt`; the later insertion wins a tie.
    pub fn latest_vital_signs(&self) -> Option<&VitalSigns> {
        self.vital_signs.iter().max_by_key(|v| v.recorded_at)
    }

    /// The most recent lab result by `recordedAt`; the later insertion wins a tie.
    pub fn latest_lab_result(&self) -> Option<&LabResult> {
        self.lab_results.iter().max_by_key(|l| l.recorded_at)
    }

    /// Appends a reading and, unless the caller supplied a score, rescores from it.
    pub fn record_vital_signs(&mut self, vitals: VitalSigns, explicit_score: Option<RiskScore>) {
        let score = explicit_score.unwrap_or_else(|| vitals.risk_score());
        self.set_risk_score(score);
        self.vital_signs.push(vitals);
    }

    /// Matches `search` case-insensitively against the name and record number.
    pub fn matches_search(&self, search: &str) -> bool {
        let needle = search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.as_str().to_lowercase().contains(&needle)
            || self
                .medical_record_number
                .as_deref()
                .is_some_and(|mrn| mrn.to_lowercase().contains(&needle))
    }

    /// Drops the reading history, keeping only the latest vital signs and lab result.
    pub fn into_detail(mut self) -> PatientDetail {
        let latest_vital_signs = self.latest_vital_signs().cloned();
        let latest_lab_result = self.latest_lab_result().cloned();
        self.vital_signs.clear();
        self.lab_results.clear();

        PatientDetail {
            patient: self,
            latest_vital_signs,
            latest_lab_result,
        }
    }
}

/// A patient with only its most recent readings attached.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetail {
    #[serde(flatten)]
    pub patient: Patient,
    pub latest_vital_signs: Option<VitalSigns>,
    pub latest_lab_result: Option<LabResult>,
}

fn normalise_mrn(mrn: Option<String>) -> Option<String> {
    mrn.map(|m| m.trim().to_string()).filter(|m| !m.is_empty())
}

/// Attributes for admitting a new patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    #[schema(value_type = String)]
    pub name: NonEmptyText,
    pub age: u32,
    pub gender: Gender,
    #[serde(deserialize_with = "deserialize_flexible_datetime")]
    pub admission_date: DateTime<Utc>,
    pub department: Department,
    #[serde(default)]
    pub medical_record_number: Option<String>,
    #[serde(default)]
    pub status: Option<PatientStatus>,
    #[serde(default)]
    #[schema(value_type = Option<u8>)]
    pub risk_score: Option<RiskScore>,
    #[serde(default)]
    pub medical_history: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub medications: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub assigned_doctor: Option<RecordId>,
    #[serde(default)]
    pub vital_signs: Vec<NewVitalSigns>,
    #[serde(default)]
    pub lab_results: Vec<NewLabResult>,
}

impl NewPatient {
    /// Builds the aggregate.
    ///
    /// When no score is supplied and readings are, the score comes from the most recent reading.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvalidInput`] if any supplied reading is invalid.
    pub fn into_patient(self, now: DateTime<Utc>) -> CoreResult<Patient> {
        let vital_signs = self
            .vital_signs
            .into_iter()
            .map(|v| v.into_vital_signs(now))
            .collect::<CoreResult<Vec<_>>>()?;
        let lab_results = self
            .lab_results
            .into_iter()
            .map(|l| l.into_lab_result(now))
            .collect::<CoreResult<Vec<_>>>()?;

        let mut patient = Patient {
            id: RecordId::new(),
            name: self.name,
            age: self.age,
            gender: self.gender,
            admission_date: self.admission_date,
            department: self.department,
            medical_record_number: normalise_mrn(self.medical_record_number),
            status: self.status.unwrap_or_default(),
            risk_score: RiskScore::default(),
            risk_level: RiskLevel::default(),
            medical_history: self.medical_history,
            allergies: self.allergies,
            medications: self.medications,
            notes: self.notes,
            assigned_doctor: self.assigned_doctor,
            vital_signs,
            lab_results,
            created_at: now,
            updated_at: now,
        };

        let score = match self.risk_score {
            Some(explicit) => explicit,
            None => patient
                .latest_vital_signs()
                .map(VitalSigns::risk_score)
                .unwrap_or_default(),
        };
        patient.set_risk_score(score);

        Ok(patient)
    }
}

/// A partial update. Absent fields are left unchanged; supplied readings are appended.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientUpdate {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub name: Option<NonEmptyText>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default, deserialize_with = "deserialize_optional_flexible_datetime")]
    pub admission_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub department: Option<Department>,
    #[serde(default)]
    pub medical_record_number: Option<String>,
    #[serde(default)]
    pub status: Option<PatientStatus>,
    #[serde(default)]
    #[schema(value_type = Option<u8>)]
    pub risk_score: Option<RiskScore>,
    #[serde(default)]
    pub medical_history: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub medications: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub assigned_doctor: Option<RecordId>,
    #[serde(default)]
    pub vital_signs: Vec<NewVitalSigns>,
    #[serde(default)]
    pub lab_results: Vec<NewLabResult>,
}

impl PatientUpdate {
    /// Applies the update to `patient`.
    ///
    /// Appended vital signs rescore the patient from the newest appended reading unless a
    /// `riskScore` is part of the same update.
    pub fn apply(self, patient: &mut Patient, now: DateTime<Utc>) -> CoreResult<()> {
        let vital_signs = self
            .vital_signs
            .into_iter()
            .map(|v| v.into_vital_signs(now))
            .collect::<CoreResult<Vec<_>>>()?;
        let lab_results = self
            .lab_results
            .into_iter()
            .map(|l| l.into_lab_result(now))
            .collect::<CoreResult<Vec<_>>>()?;

        if let Some(name) = self.name {
            patient.name = name;
        }
        if let Some(age) = self.age {
            patient.age = age;
        }
        if let Some(gender) = self.gender {
            patient.gender = gender;
        }
        if let Some(admission_date) = self.admission_date {
            patient.admission_date = admission_date;
        }
        if let Some(department) = self.department {
            patient.department = department;
        }
        if self.medical_record_number.is_some() {
            patient.medical_record_number = normalise_mrn(self.medical_record_number);
        }
        if let Some(status) = self.status {
            patient.status = status;
        }
        if self.medical_history.is_some() {
            patient.medical_history = self.medical_history;
        }
        if self.allergies.is_some() {
            patient.allergies = self.allergies;
        }
        if self.medications.is_some() {
            patient.medications = self.medications;
        }
        if self.notes.is_some() {
            patient.notes = self.notes;
        }
        if self.assigned_doctor.is_some() {
            patient.assigned_doctor = self.assigned_doctor;
        }

        let newest_appended = vital_signs
            .iter()
            .max_by_key(|v| v.recorded_at)
            .map(VitalSigns::risk_score);
        patient.vital_signs.extend(vital_signs);
        patient.lab_results.extend(lab_results);

        if let Some(score) = self.risk_score.or(newest_appended) {
            patient.set_risk_score(score);
        }

        patient.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn new_patient(name: &str, department: Department) -> NewPatient {
        NewPatient {
            name: NonEmptyText::new(name).expect("valid name"),
            age: 54,
            gender: Gender::Female,
            admission_date: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            department,
            medical_record_number: None,
            status: None,
            risk_score: None,
            medical_history: None,
            allergies: None,
            medications: None,
            notes: None,
            assigned_doctor: None,
            vital_signs: Vec::new(),
            lab_results: Vec::new(),
        }
    }

    pub(crate) fn vitals(temperature: f64, hr: u32, rr: u32, spo2: f64) -> NewVitalSigns {
        NewVitalSigns {
            temperature,
            heart_rate: Some(hr),
            respiratory_rate: Some(rr),
            oxygen_saturation: spo2,
            ..Default::default()
        }
    }

    #[test]
    fn test_set_risk_score_always_updates_level() {
        let mut patient = new_patient("Ada", Department::Icu)
            .into_patient(Utc::now())
            .expect("patient should build");
        assert_eq!(patient.risk_level(), RiskLevel::Low);

        for (score, level) in [(80, RiskLevel::High), (60, RiskLevel::Medium), (20, RiskLevel::Low)] {
            patient.set_risk_score(RiskScore::new(score).expect("valid score"));
            assert_eq!(patient.risk_score().value(), score);
            assert_eq!(patient.risk_level(), level);
        }
    }

    #[test]
    fn test_create_backfills_score_from_latest_reading() {
        let now = Utc::now();
        let mut input = new_patient("Ada", Department::Icu);
        let mut older = vitals(39.0, 110, 25, 90.0);
        older.recorded_at = Some(now - chrono::Duration::hours(2));
        let mut newer = vitals(37.0, 95, 18, 97.0);
        newer.recorded_at = Some(now - chrono::Duration::hours(1));
        input.vital_signs = vec![newer, older];

        let patient = input.into_patient(now).expect("patient should build");
        assert_eq!(patient.risk_score().value(), 40);
        assert_eq!(patient.risk_level(), RiskLevel::Low);
        assert_eq!(patient.vital_signs.len(), 2);
    }

    #[test]
    fn test_create_keeps_explicit_score() {
        let mut input = new_patient("Ada", Department::Icu);
        input.risk_score = Some(RiskScore::new(85).expect("valid score"));
        input.vital_signs = vec![vitals(37.0, 70, 14, 99.0)];

        let patient = input.into_patient(Utc::now()).expect("patient should build");
        assert_eq!(patient.risk_score().value(), 85);
        assert_eq!(patient.risk_level(), RiskLevel::High);
    }

    #[test]
    fn test_create_without_readings_defaults_to_zero() {
        let patient = new_patient("Ada", Department::Icu)
            .into_patient(Utc::now())
            .expect("patient should build");
        assert_eq!(patient.risk_score().value(), 0);
        assert_eq!(patient.status, PatientStatus::Active);
    }

    #[test]
    fn test_record_vital_signs_respects_explicit_score() {
        let now = Utc::now();
        let mut patient = new_patient("Ada", Department::Icu)
            .into_patient(now)
            .expect("patient should build");

        let reading = vitals(39.0, 110, 25, 90.0)
            .into_vital_signs(now)
            .expect("valid reading");
        patient.record_vital_signs(reading, Some(RiskScore::new(10).expect("valid score")));
        assert_eq!(patient.risk_score().value(), 10);

        let reading = vitals(39.0, 110, 25, 90.0)
            .into_vital_signs(now)
            .expect("valid reading");
        patient.record_vital_signs(reading, None);
        assert_eq!(patient.risk_score().value(), 100);
        assert_eq!(patient.risk_level(), RiskLevel::High);
        assert_eq!(patient.vital_signs.len(), 2);
    }

    #[test]
    fn test_update_appends_readings_and_rescores() {
        let now = Utc::now();
        let mut patient = new_patient("Ada", Department::Icu)
            .into_patient(now)
            .expect("patient should build");

        let update = PatientUpdate {
            notes: Some("febrile overnight".into()),
            vital_signs: vec![vitals(38.7, 80, 16, 98.0)],
            ..Default::default()
        };
        update.apply(&mut patient, now).expect("update should apply");

        assert_eq!(patient.notes.as_deref(), Some("febrile overnight"));
        assert_eq!(patient.vital_signs.len(), 1);
        assert_eq!(patient.risk_score().value(), 50);
        assert_eq!(patient.risk_level(), RiskLevel::Medium);
    }

    #[test]
    fn test_detail_keeps_only_latest_readings() {
        let now = Utc::now();
        let mut input = new_patient("Ada", Department::Icu);
        let mut first = vitals(37.0, 80, 16, 98.0);
        first.recorded_at = Some(now - chrono::Duration::hours(3));
        let mut second = vitals(38.0, 90, 18, 96.0);
        second.recorded_at = Some(now - chrono::Duration::hours(1));
        input.vital_signs = vec![second, first];

        let detail = input
            .into_patient(now)
            .expect("patient should build")
            .into_detail();

        let json = serde_json::to_value(&detail).expect("detail should serialize");
        assert!(json.get("vitalSigns").is_none());
        assert!(json.get("labResults").is_none());
        assert_eq!(json["latestVitalSigns"]["temperature"], 38.0);
        assert_eq!(json["name"], "Ada");

        let latest = detail.latest_vital_signs.expect("latest vitals should exist");
        assert_eq!(latest.temperature, 38.0);
        assert!(detail.patient.vital_signs.is_empty());
        assert!(detail.latest_lab_result.is_none());
    }

    #[test]
    fn test_admission_date_accepts_plain_dates() {
        let json = r#"{
            "name": "Ada",
            "age": 61,
            "gender": "Female",
            "admissionDate": "2024-03-01",
            "department": "General Medicine"
        }"#;
        let input: NewPatient = serde_json::from_str(json).expect("payload should parse");
        assert_eq!(
            input.admission_date,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(input.department, Department::GeneralMedicine);
    }

    #[test]
    fn test_unknown_department_is_rejected() {
        let json = r#"{
            "name": "Ada",
            "age": 61,
            "gender": "Female",
            "admissionDate": "2024-03-01T10:00:00Z",
            "department": "Oncology"
        }"#;
        let parsed: Result<NewPatient, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_matches_search_on_name_and_mrn() {
        let mut input = new_patient("Grace Hopper", Department::Surgery);
        input.medical_record_number = Some("MRN123456".into());
        let patient = input.into_patient(Utc::now()).expect("patient should build");

        assert!(patient.matches_search("hopper"));
        assert!(patient.matches_search("mrn1234"));
        assert!(!patient.matches_search("lovelace"));
    }
}
