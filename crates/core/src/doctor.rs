//! Doctor directory profiles.

use crate::constants::DEFAULT_DOCTOR_IMAGE;
use chrono::{DateTime, Utc};
use sepshield_types::NonEmptyText;
use sepshield_uuid::RecordId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub name: NonEmptyText,
    #[schema(value_type = String)]
    pub specialty: NonEmptyText,
    #[schema(value_type = String)]
    pub bio: NonEmptyText,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Years in practice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub contact_info: ContactInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub user_id: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewDoctor {
    #[schema(value_type = String)]
    pub name: NonEmptyText,
    #[schema(value_type = String)]
    pub specialty: NonEmptyText,
    #[schema(value_type = String)]
    pub bio: NonEmptyText,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub experience: Option<u32>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub contact_info: ContactInfo,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub user_id: Option<RecordId>,
}

impl NewDoctor {
    pub fn into_doctor(self, now: DateTime<Utc>) -> Doctor {
        Doctor {
            id: RecordId::new(),
            name: self.name,
            specialty: self.specialty,
            bio: self.bio,
            image_url: self
                .image_url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DOCTOR_IMAGE.to_string()),
            position: self.position,
            experience: self.experience,
            qualifications: self.qualifications,
            contact_info: self.contact_info,
            user_id: self.user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorUpdate {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub name: Option<NonEmptyText>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub specialty: Option<NonEmptyText>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub bio: Option<NonEmptyText>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub experience: Option<u32>,
    #[serde(default)]
    pub qualifications: Option<Vec<String>>,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub user_id: Option<RecordId>,
}

impl DoctorUpdate {
    pub fn apply(self, doctor: &mut Doctor, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            doctor.name = name;
        }
        if let Some(specialty) = self.specialty {
            doctor.specialty = specialty;
        }
        if let Some(bio) = self.bio {
            doctor.bio = bio;
        }
        if let Some(url) = self.image_url.filter(|url| !url.trim().is_empty()) {
            doctor.image_url = url;
        }
        if self.position.is_some() {
            doctor.position = self.position;
        }
        if self.experience.is_some() {
            doctor.experience = self.experience;
        }
        if let Some(qualifications) = self.qualifications {
            doctor.qualifications = qualifications;
        }
        if let Some(contact) = self.contact_info {
            doctor.contact_info = contact;
        }
        if self.user_id.is_some() {
            doctor.user_id = self.user_id;
        }
        doctor.updated_at = now;
    }
}
