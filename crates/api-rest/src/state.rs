use crate::config::ApiConfig;
use api_shared::{AuthError, TokenKeys};
use sepshield_core::store::Stores;
use sepshield_core::{AnalyticsService, DoctorService, PatientService, UserService};
use std::sync::Arc;

/// Application state for the REST API server
///
/// Contains the services every handler may need plus the resolved configuration and token keys.
/// Cloned per request; all members are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub tokens: TokenKeys,
    pub patients: PatientService,
    pub analytics: AnalyticsService,
    pub users: UserService,
    pub doctors: DoctorService,
}

impl AppState {
    /// # Errors
    ///
    /// Returns [`AuthError::MissingSecret`] if the configured JWT secret is blank.
    pub fn new(config: ApiConfig, stores: &Stores) -> Result<Self, AuthError> {
        let tokens = TokenKeys::new(config.jwt_secret(), config.token_lifetime_days())?;
        Ok(Self {
            config: Arc::new(config),
            tokens,
            patients: PatientService::new(stores.patients.clone()),
            analytics: AnalyticsService::new(stores.patients.clone()),
            users: UserService::new(stores.users.clone()),
            doctors: DoctorService::new(stores.doctors.clone()),
        })
    }
}
