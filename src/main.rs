use api_rest::{ApiConfig, AppState};
use api_shared::HealthService;
use sepshield_core::store::Stores;
use sepshield_core::{store_backend_from_env_value, CoreConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the SepShield application
///
/// Resolves configuration once, opens the configured record stores and serves the REST API
/// (with Swagger UI at `/swagger-ui`).
///
/// # Environment Variables
/// - `SEPSHIELD_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `SEPSHIELD_STORE`: `memory` or `file` (default: "file")
/// - `PATIENT_DATA_DIR`: Directory for patient data storage (default: "patient_data")
/// - `JWT_SECRET`: Secret used to sign session tokens (required)
/// - `JWT_EXPIRES_IN_DAYS`: Session lifetime in days (default: 30)
/// - `SEPSHIELD_ENV`: Environment name; `production` hides error detail (default: "development")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, store start-up or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sepshield_run=info".parse()?)
                .add_directive("sepshield_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_config = ApiConfig::from_env()?;

    let patient_data_dir = std::env::var("PATIENT_DATA_DIR")
        .unwrap_or_else(|_| sepshield_core::DEFAULT_PATIENT_DATA_DIR.into());
    let store_backend = store_backend_from_env_value(std::env::var("SEPSHIELD_STORE").ok())?;
    let cfg = CoreConfig::new(PathBuf::from(patient_data_dir), store_backend)?;

    tracing::info!(
        "++ Starting SepShield ({}) with {} store at {}",
        api_config.environment(),
        cfg.store_backend(),
        cfg.patient_data_dir().display()
    );

    let stores = Stores::from_config(&cfg)?;
    let state = AppState::new(api_config, &stores)?;

    tracing::info!("++ {}", HealthService::check_health().message);
    api_rest::serve(state).await
}
