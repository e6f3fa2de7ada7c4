//! Patient operations over a [`PatientRepository`].

use crate::labs::{LabResult, NewLabResult};
use crate::patient::{Department, NewPatient, Patient, PatientDetail, PatientStatus, PatientUpdate};
use crate::progress::{patient_progress, ProgressPoint};
use crate::query::{Page, PageRequest, SortSpec};
use crate::risk::{RiskLevel, RiskScore};
use crate::store::PatientRepository;
use crate::vitals::{NewVitalSigns, VitalSigns};
use crate::{CoreError, CoreResult};
use chrono::Utc;
use sepshield_uuid::RecordId;
use std::cmp::Ordering;
use std::sync::Arc;

const ENTITY: &str = "Patient";

/// Fields a patient listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatientSortField {
    #[default]
    Name,
    Age,
    AdmissionDate,
    Department,
    Status,
    RiskScore,
    RiskLevel,
    MedicalRecordNumber,
    CreatedAt,
    UpdatedAt,
}

impl PatientSortField {
    pub fn from_name(name: &str) -> Option<Self> {
        let field = match name {
            "name" => Self::Name,
            "age" => Self::Age,
            "admissionDate" => Self::AdmissionDate,
            "department" => Self::Department,
            "status" => Self::Status,
            "riskScore" => Self::RiskScore,
            "riskLevel" => Self::RiskLevel,
            "medicalRecordNumber" => Self::MedicalRecordNumber,
            "createdAt" => Self::CreatedAt,
            "updatedAt" => Self::UpdatedAt,
            _ => return None,
        };
        Some(field)
    }

    fn compare(self, a: &Patient, b: &Patient) -> Ordering {
        match self {
            Self::Name => a.name.as_str().cmp(b.name.as_str()),
            Self::Age => a.age.cmp(&b.age),
            Self::AdmissionDate => a.admission_date.cmp(&b.admission_date),
            Self::Department => a.department.as_str().cmp(b.department.as_str()),
            Self::Status => a.status.as_str().cmp(b.status.as_str()),
            Self::RiskScore => a.risk_score().cmp(&b.risk_score()),
            Self::RiskLevel => a.risk_level().cmp(&b.risk_level()),
            Self::MedicalRecordNumber => a.medical_record_number.cmp(&b.medical_record_number),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
            Self::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

/// Exact-match filters, AND-combined. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientFilter {
    pub status: Option<PatientStatus>,
    pub risk_level: Option<RiskLevel>,
    pub department: Option<Department>,
    pub search: Option<String>,
}

impl PatientFilter {
    pub fn matches(&self, patient: &Patient) -> bool {
        self.status.map_or(true, |s| patient.status == s)
            && self.risk_level.map_or(true, |l| patient.risk_level() == l)
            && self.department.map_or(true, |d| patient.department == d)
            && self
                .search
                .as_deref()
                .map_or(true, |s| patient.matches_search(s))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientQuery {
    pub filter: PatientFilter,
    pub sort: SortSpec<PatientSortField>,
    pub page: PageRequest,
}

impl Default for PatientQuery {
    fn default() -> Self {
        Self {
            filter: PatientFilter::default(),
            sort: SortSpec {
                field: PatientSortField::Name,
                descending: false,
            },
            page: PageRequest::default(),
        }
    }
}

/// Outcome of a bulk import. Failures do not stop the import.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub created: Vec<Patient>,
    /// Zero-based input position and the error for each record that was not imported.
    pub failed: Vec<(usize, CoreError)>,
}

#[derive(Clone)]
pub struct PatientService {
    patients: Arc<PatientRepository>,
}

impl PatientService {
    pub fn new(patients: Arc<PatientRepository>) -> Self {
        Self { patients }
    }

    pub fn repository(&self) -> &Arc<PatientRepository> {
        &self.patients
    }

    /// Filters, sorts and paginates the patient collection.
    pub fn list(&self, query: &PatientQuery) -> CoreResult<Page<Patient>> {
        let mut matching: Vec<Patient> = self
            .patients
            .list()?
            .into_iter()
            .filter(|p| query.filter.matches(p))
            .collect();

        let SortSpec { field, descending } = query.sort;
        matching.sort_by(|a, b| {
            let ordering = field.compare(a, b);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        Ok(Page::paginate(matching, query.page))
    }

    /// Full aggregate including the complete reading history.
    pub fn get(&self, id: &RecordId) -> CoreResult<Patient> {
        self.patients
            .get(id)?
            .ok_or_else(|| CoreError::not_found(ENTITY, id))
    }

    /// Patient with only its most recent vital signs and lab result.
    pub fn detail(&self, id: &RecordId) -> CoreResult<PatientDetail> {
        self.get(id).map(Patient::into_detail)
    }

    /// Admits a patient.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidInput`] for an invalid reading.
    /// - [`CoreError::Conflict`] when the medical record number is already in use.
    pub fn create(&self, input: NewPatient) -> CoreResult<Patient> {
        let patient = input.into_patient(Utc::now())?;
        let patient = self.patients.insert(patient)?;
        tracing::info!(
            "-- Admitted patient {} to {} (risk {} {})",
            patient.id,
            patient.department,
            patient.risk_score(),
            patient.risk_level()
        );
        Ok(patient)
    }

    pub fn update(&self, id: &RecordId, update: PatientUpdate) -> CoreResult<Patient> {
        let now = Utc::now();
        let mut pending = Some(update);
        self.patients
            .update(id, &mut |patient| match pending.take() {
                Some(update) => update.apply(patient, now),
                None => Ok(()),
            })?
            .ok_or_else(|| CoreError::not_found(ENTITY, id))
    }

    /// Deletes the patient together with all of its readings.
    pub fn delete(&self, id: &RecordId) -> CoreResult<()> {
        if !self.patients.delete(id)? {
            return Err(CoreError::not_found(ENTITY, id));
        }
        tracing::info!("-- Deleted patient {}", id);
        Ok(())
    }

    /// Appends a vital signs reading.
    ///
    /// The patient is rescored from the reading unless `explicit_score` is given, in which case
    /// that score is stored instead. The append and the rescore happen as one atomic update.
    pub fn add_vital_signs(
        &self,
        id: &RecordId,
        reading: NewVitalSigns,
        explicit_score: Option<RiskScore>,
    ) -> CoreResult<Patient> {
        let vitals = reading.into_vital_signs(Utc::now())?;
        let mut pending = Some(vitals);

        let patient = self
            .patients
            .update(id, &mut |patient| {
                if let Some(vitals) = pending.take() {
                    patient.record_vital_signs(vitals, explicit_score);
                    patient.updated_at = Utc::now();
                }
                Ok(())
            })?
            .ok_or_else(|| CoreError::not_found(ENTITY, id))?;

        if patient.risk_level() == RiskLevel::High {
            tracing::warn!(
                "-- Patient {} scored {} (High risk)",
                patient.id,
                patient.risk_score()
            );
        }
        Ok(patient)
    }

    pub fn add_lab_result(&self, id: &RecordId, reading: NewLabResult) -> CoreResult<Patient> {
        let lab = reading.into_lab_result(Utc::now())?;
        let mut pending = Some(lab);

        self.patients
            .update(id, &mut |patient| {
                if let Some(lab) = pending.take() {
                    patient.lab_results.push(lab);
                    patient.updated_at = Utc::now();
                }
                Ok(())
            })?
            .ok_or_else(|| CoreError::not_found(ENTITY, id))
    }

    /// Full vital signs history in insertion order.
    pub fn vital_signs(&self, id: &RecordId) -> CoreResult<Vec<VitalSigns>> {
        Ok(self.get(id)?.vital_signs)
    }

    /// Full lab history in insertion order.
    pub fn lab_results(&self, id: &RecordId) -> CoreResult<Vec<LabResult>> {
        Ok(self.get(id)?.lab_results)
    }

    pub fn progress(&self, id: &RecordId) -> CoreResult<Vec<ProgressPoint>> {
        Ok(patient_progress(&self.get(id)?))
    }

    /// Creates every record it can; see [`ImportSummary`].
    pub fn import(&self, records: Vec<NewPatient>) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for (index, input) in records.into_iter().enumerate() {
            match self.create(input) {
                Ok(patient) => summary.created.push(patient),
                Err(e) => {
                    tracing::warn!("import record {} rejected: {}", index, e);
                    summary.failed.push((index, e));
                }
            }
        }
        summary
    }
}
