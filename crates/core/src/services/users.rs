//! Account registration, login and self-service profile changes.

use crate::user::{
    hash_password, validate_password, Credentials, PasswordChange, ProfileUpdate, Registration,
    Role, User,
};
use crate::store::UserRepository;
use crate::{CoreError, CoreResult};
use chrono::Utc;
use sepshield_types::EmailAddress;
use sepshield_uuid::RecordId;
use std::sync::Arc;

const ENTITY: &str = "User";
const INVALID_CREDENTIALS: &str = "Incorrect email or password";

#[derive(Clone)]
pub struct UserService {
    users: Arc<UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<UserRepository>) -> Self {
        Self { users }
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidInput`] if the password is shorter than the minimum.
    /// - [`CoreError::Conflict`] if the e-mail address is already registered.
    pub fn register(&self, registration: Registration) -> CoreResult<User> {
        if self
            .users
            .find_by_unique_key(registration.email.as_str())?
            .is_some()
        {
            return Err(CoreError::Conflict("Email already in use".into()));
        }

        let user = self.users.insert(registration.into_user(Utc::now())?)?;
        tracing::info!("-- Registered {} account {}", user.role, user.id);
        Ok(user)
    }

    /// Registers an account on behalf of `created_by`, the caller's role, or `None` for a
    /// sign-up without a session. See [`Registration::authorise`].
    pub fn sign_up(&self, registration: Registration, created_by: Option<Role>) -> CoreResult<User> {
        registration.authorise(created_by)?;
        self.register(registration)
    }

    /// Checks credentials and returns the matching account.
    ///
    /// Unknown e-mail and wrong password produce the same error so that callers cannot probe
    /// which addresses are registered.
    pub fn authenticate(&self, credentials: Credentials) -> CoreResult<User> {
        let (Some(email), Some(password)) = (
            credentials.email.filter(|e| !e.trim().is_empty()),
            credentials.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(CoreError::InvalidInput(
                "Please provide email and password".into(),
            ));
        };

        let invalid = || CoreError::Unauthenticated(INVALID_CREDENTIALS.into());
        let email = EmailAddress::parse(&email).map_err(|_| invalid())?;
        let user = self
            .users
            .find_by_unique_key(email.as_str())?
            .ok_or_else(invalid)?;

        if !user.verify_password(&password) {
            return Err(invalid());
        }
        Ok(user)
    }

    pub fn find_by_email(&self, email: &EmailAddress) -> CoreResult<Option<User>> {
        self.users.find_by_unique_key(email.as_str())
    }

    pub fn get(&self, id: &RecordId) -> CoreResult<User> {
        self.users
            .get(id)?
            .ok_or_else(|| CoreError::not_found(ENTITY, id))
    }

    pub fn change_password(&self, id: &RecordId, change: PasswordChange) -> CoreResult<User> {
        let user = self.get(id)?;
        if !user.verify_password(&change.current_password) {
            return Err(CoreError::Unauthenticated(
                "Your current password is incorrect".into(),
            ));
        }
        validate_password(&change.new_password)?;
        let new_hash = hash_password(&change.new_password)?;

        let now = Utc::now();
        self.users
            .update(id, &mut |user| {
                user.password_hash = new_hash.clone();
                user.updated_at = now;
                Ok(())
            })?
            .ok_or_else(|| CoreError::not_found(ENTITY, id))
    }

    /// Updates name, e-mail, department or avatar. Password changes are refused here.
    pub fn update_profile(&self, id: &RecordId, update: ProfileUpdate) -> CoreResult<User> {
        if update.password.is_some() || update.password_confirm.is_some() {
            return Err(CoreError::InvalidInput(
                "This route is not for password updates. Please use /update-password".into(),
            ));
        }

        let now = Utc::now();
        let mut pending = Some(update);
        self.users
            .update(id, &mut |user| {
                let Some(update) = pending.take() else {
                    return Ok(());
                };
                if let Some(name) = update.name {
                    user.name = name;
                }
                if let Some(email) = update.email {
                    user.email = email;
                }
                if let Some(department) = update.department {
                    user.department = department;
                }
                if let Some(avatar) = update.avatar.filter(|a| !a.trim().is_empty()) {
                    user.avatar = avatar;
                }
                user.updated_at = now;
                Ok(())
            })?
            .ok_or_else(|| CoreError::not_found(ENTITY, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::Department;
    use crate::store::MemoryRepository;
    use sepshield_types::NonEmptyText;

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryRepository::<User>::new()))
    }

    fn registration(email: &str) -> Registration {
        Registration {
            name: NonEmptyText::new("Admin User").expect("valid name"),
            email: EmailAddress::parse(email).expect("valid email"),
            password: "password123".into(),
            role: Some(Role::Admin),
            department: Department::Icu,
        }
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[test]
    fn test_register_rejects_duplicate_email() {
        let service = service();
        service
            .register(registration("admin@example.com"))
            .expect("first registration should succeed");

        let result = service.register(registration("ADMIN@example.com"));
        assert!(matches!(result, Err(CoreError::Conflict(_))));
    }

    #[test]
    fn test_sign_up_without_session_cannot_claim_admin() {
        let service = service();

        let result = service.sign_up(registration("admin@example.com"), None);
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
        assert!(service
            .find_by_email(&EmailAddress::parse("admin@example.com").expect("valid email"))
            .expect("lookup should succeed")
            .is_none());

        let nurse = Registration {
            role: None,
            ..registration("nurse@example.com")
        };
        let user = service.sign_up(nurse, None).expect("nurse sign-up should succeed");
        assert_eq!(user.role, Role::Nurse);

        let admin = service
            .sign_up(registration("admin@example.com"), Some(Role::Admin))
            .expect("admin may create an admin");
        assert_eq!(admin.role, Role::Admin);
    }

    #[test]
    fn test_authenticate() {
        let service = service();
        let user = service
            .register(registration("admin@example.com"))
            .expect("registration should succeed");

        let found = service
            .authenticate(credentials(" Admin@Example.com ", "password123"))
            .expect("login should succeed");
        assert_eq!(found.id, user.id);

        let wrong_password = service.authenticate(credentials("admin@example.com", "nope12345"));
        let unknown_email = service.authenticate(credentials("ghost@example.com", "password123"));
        match (wrong_password, unknown_email) {
            (Err(CoreError::Unauthenticated(a)), Err(CoreError::Unauthenticated(b))) => {
                assert_eq!(a, b)
            }
            other => panic!("expected two identical Unauthenticated errors, got {other:?}"),
        }
    }

    #[test]
    fn test_authenticate_requires_both_fields() {
        let result = service().authenticate(Credentials {
            email: Some("admin@example.com".into()),
            password: None,
        });
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn test_change_password() {
        let service = service();
        let user = service
            .register(registration("admin@example.com"))
            .expect("registration should succeed");

        let wrong = service.change_password(
            &user.id,
            PasswordChange {
                current_password: "incorrect".into(),
                new_password: "newpassword456".into(),
            },
        );
        assert!(matches!(wrong, Err(CoreError::Unauthenticated(_))));

        service
            .change_password(
                &user.id,
                PasswordChange {
                    current_password: "password123".into(),
                    new_password: "newpassword456".into(),
                },
            )
            .expect("password change should succeed");

        service
            .authenticate(credentials("admin@example.com", "newpassword456"))
            .expect("new password should work");
    }

    #[test]
    fn test_update_profile_refuses_password_and_keeps_email_unique() {
        let service = service();
        let admin = service
            .register(registration("admin@example.com"))
            .expect("registration should succeed");
        service
            .register(registration("doctor@example.com"))
            .expect("registration should succeed");

        let with_password = ProfileUpdate {
            password: Some(serde_json::json!("sneaky123")),
            ..Default::default()
        };
        assert!(matches!(
            service.update_profile(&admin.id, with_password),
            Err(CoreError::InvalidInput(_))
        ));

        let taken_email = ProfileUpdate {
            email: Some(EmailAddress::parse("doctor@example.com").expect("valid email")),
            ..Default::default()
        };
        assert!(matches!(
            service.update_profile(&admin.id, taken_email),
            Err(CoreError::Conflict(_))
        ));

        let updated = service
            .update_profile(
                &admin.id,
                ProfileUpdate {
                    department: Some(Department::Neurology),
                    ..Default::default()
                },
            )
            .expect("profile update should succeed");
        assert_eq!(updated.department, Department::Neurology);
    }
}
