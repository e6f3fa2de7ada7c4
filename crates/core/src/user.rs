//! Staff user accounts.

use crate::constants::{DEFAULT_AVATAR, MIN_PASSWORD_LEN};
use crate::patient::Department;
use crate::{CoreError, CoreResult};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use sepshield_types::{EmailAddress, NonEmptyText};
use sepshield_uuid::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Doctor,
    #[default]
    Nurse,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored user account, including the password hash.
///
/// This type is persisted as-is; use [`User::profile`] for anything sent to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub name: NonEmptyText,
    pub email: EmailAddress,
    pub password_hash: String,
    pub role: Role,
    pub department: Department,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            department: self.department,
            avatar: self.avatar.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        verify_password(candidate, &self.password_hash)
    }
}

/// The client-facing view of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[schema(value_type = String)]
    pub id: RecordId,
    #[schema(value_type = String)]
    pub name: NonEmptyText,
    #[schema(value_type = String)]
    pub email: EmailAddress,
    pub role: Role,
    pub department: Department,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[schema(value_type = String)]
    pub name: NonEmptyText,
    #[schema(value_type = String)]
    pub email: EmailAddress,
    pub password: String,
    /// Defaults to nurse when omitted.
    #[serde(default)]
    pub role: Option<Role>,
    pub department: Department,
}

impl Registration {
    /// Checks that an account with the requested role may be created by `created_by`, the
    /// creator's role, or `None` for a sign-up without a session.
    ///
    /// Anyone may sign up as a nurse. Doctor and admin accounts are created by an admin.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidInput`] for a privileged role requested without a session.
    /// - [`CoreError::Forbidden`] for a privileged role requested by a non-admin.
    pub fn authorise(&self, created_by: Option<Role>) -> CoreResult<()> {
        if self.role.unwrap_or_default() == Role::Nurse || created_by == Some(Role::Admin) {
            return Ok(());
        }

        let message = "Only an administrator can create doctor or admin accounts".to_string();
        Err(match created_by {
            None => CoreError::InvalidInput(message),
            Some(_) => CoreError::Forbidden(message),
        })
    }

    pub fn into_user(self, now: DateTime<Utc>) -> CoreResult<User> {
        validate_password(&self.password)?;
        Ok(User {
            id: RecordId::new(),
            name: self.name,
            email: self.email,
            password_hash: hash_password(&self.password)?,
            role: self.role.unwrap_or_default(),
            department: self.department,
            avatar: DEFAULT_AVATAR.to_string(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Login credentials. Both fields are optional on the wire so a missing field is reported as
/// a validation error rather than a deserialisation failure.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct Credentials {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    #[serde(alias = "curretPassword")]
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub name: Option<NonEmptyText>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub email: Option<EmailAddress>,
    #[serde(default)]
    pub department: Option<Department>,
    #[serde(default)]
    pub avatar: Option<String>,
    /// Present only so that attempts to change the password here can be rejected.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub password: Option<serde_json::Value>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub password_confirm: Option<serde_json::Value>,
}

/// Checks the minimum password policy.
pub fn validate_password(password: &str) -> CoreResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Hashes `password` with Argon2id and a random salt, returning a PHC string.
pub fn hash_password(password: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreError::PasswordHash(e.to_string()))
}

/// Verifies `password` against a PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, phc: &str) -> bool {
    match PasswordHash::new(phc) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("stored password hash could not be parsed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(password: &str) -> Registration {
        Registration {
            name: NonEmptyText::new("Dr. John Smith").expect("valid name"),
            email: EmailAddress::parse("Doctor@Example.com").expect("valid email"),
            password: password.into(),
            role: Some(Role::Doctor),
            department: Department::Emergency,
        }
    }

    #[test]
    fn test_registration_hashes_password() {
        let user = registration("password123")
            .into_user(Utc::now())
            .expect("registration should succeed");

        assert_ne!(user.password_hash, "password123");
        assert!(user.password_hash.starts_with("$argon2"));
        assert!(user.verify_password("password123"));
        assert!(!user.verify_password("password124"));
        assert_eq!(user.email.as_str(), "doctor@example.com");
        assert_eq!(user.avatar, DEFAULT_AVATAR);
    }

    #[test]
    fn test_short_password_is_rejected() {
        let result = registration("short").into_user(Utc::now());
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn test_profile_omits_password_hash() {
        let user = registration("password123")
            .into_user(Utc::now())
            .expect("registration should succeed");
        let json = serde_json::to_value(user.profile()).expect("profile should serialize");

        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "doctor");
        assert_eq!(json["department"], "Emergency");
    }

    #[test]
    fn test_only_admins_create_privileged_accounts() {
        let doctor = registration("password123");
        assert!(matches!(doctor.authorise(None), Err(CoreError::InvalidInput(_))));
        assert!(matches!(
            doctor.authorise(Some(Role::Nurse)),
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            doctor.authorise(Some(Role::Doctor)),
            Err(CoreError::Forbidden(_))
        ));
        doctor
            .authorise(Some(Role::Admin))
            .expect("an admin may create a doctor");

        let walk_in = Registration {
            role: None,
            ..registration("password123")
        };
        walk_in.authorise(None).expect("anyone may sign up as a nurse");
        let user = walk_in
            .into_user(Utc::now())
            .expect("registration should succeed");
        assert_eq!(user.role, Role::Nurse);
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("password123", "not-a-phc-string"));
    }
}
