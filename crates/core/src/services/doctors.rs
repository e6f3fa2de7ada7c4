use crate::doctor::{Doctor, DoctorUpdate, NewDoctor};
use crate::query::{Page, PageRequest, SortSpec};
use crate::store::DoctorRepository;
use crate::{CoreError, CoreResult};
use chrono::Utc;
use sepshield_uuid::RecordId;
use std::cmp::Ordering;
use std::sync::Arc;

const ENTITY: &str = "Doctor";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DoctorSortField {
    #[default]
    Name,
    Specialty,
    Experience,
    CreatedAt,
}

impl DoctorSortField {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "specialty" => Some(Self::Specialty),
            "experience" => Some(Self::Experience),
            "createdAt" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn compare(self, a: &Doctor, b: &Doctor) -> Ordering {
        match self {
            Self::Name => a.name.as_str().cmp(b.name.as_str()),
            Self::Specialty => a.specialty.as_str().cmp(b.specialty.as_str()),
            Self::Experience => a.experience.cmp(&b.experience),
            Self::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoctorQuery {
    /// Case-insensitive exact match on specialty.
    pub specialty: Option<String>,
    pub sort: SortSpec<DoctorSortField>,
    pub page: PageRequest,
}

impl Default for DoctorQuery {
    fn default() -> Self {
        Self {
            specialty: None,
            sort: SortSpec {
                field: DoctorSortField::Name,
                descending: false,
            },
            page: PageRequest::default(),
        }
    }
}

#[derive(Clone)]
pub struct DoctorService {
    doctors: Arc<DoctorRepository>,
}

impl DoctorService {
    pub fn new(doctors: Arc<DoctorRepository>) -> Self {
        Self { doctors }
    }

    pub fn list(&self, query: &DoctorQuery) -> CoreResult<Page<Doctor>> {
        let specialty = query
            .specialty
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut doctors: Vec<Doctor> = self
            .doctors
            .list()?
            .into_iter()
            .filter(|d| specialty.map_or(true, |s| d.specialty.as_str().eq_ignore_ascii_case(s)))
            .collect();

        let SortSpec { field, descending } = query.sort;
        doctors.sort_by(|a, b| {
            let ordering = field.compare(a, b);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        Ok(Page::paginate(doctors, query.page))
    }

    pub fn get(&self, id: &RecordId) -> CoreResult<Doctor> {
        self.doctors
            .get(id)?
            .ok_or_else(|| CoreError::not_found(ENTITY, id))
    }

    pub fn create(&self, input: NewDoctor) -> CoreResult<Doctor> {
        let doctor = self.doctors.insert(input.into_doctor(Utc::now()))?;
        tracing::info!("-- Added doctor profile {}", doctor.id);
        Ok(doctor)
    }

    pub fn update(&self, id: &RecordId, update: DoctorUpdate) -> CoreResult<Doctor> {
        let now = Utc::now();
        let mut pending = Some(update);
        self.doctors
            .update(id, &mut |doctor| {
                if let Some(update) = pending.take() {
                    update.apply(doctor, now);
                }
                Ok(())
            })?
            .ok_or_else(|| CoreError::not_found(ENTITY, id))
    }

    pub fn delete(&self, id: &RecordId) -> CoreResult<()> {
        if !self.doctors.delete(id)? {
            return Err(CoreError::not_found(ENTITY, id));
        }
        Ok(())
    }
}
