//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging of the HTTP surface. The workspace's main `sepshield-run`
//! binary serves the same router; demo data is loaded with `sepshield-cli seed`.

use api_rest::{ApiConfig, AppState};
use sepshield_core::store::Stores;
use sepshield_core::{store_backend_from_env_value, CoreConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the SepShield REST API server
///
/// # Environment Variables
/// - `SEPSHIELD_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `SEPSHIELD_STORE`: `memory` or `file` (default: "file")
/// - `PATIENT_DATA_DIR`: Directory for file-backed records (default: "patient_data")
/// - `JWT_SECRET`: Secret used to sign session tokens (required)
/// - `JWT_EXPIRES_IN_DAYS`: Session lifetime in days (default: 30)
/// - `SEPSHIELD_ENV`: `production` hides internal error detail (default: "development")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the stores cannot be opened,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("sepshield_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let patient_data_dir = std::env::var("PATIENT_DATA_DIR")
        .unwrap_or_else(|_| sepshield_core::DEFAULT_PATIENT_DATA_DIR.into());
    let store_backend = store_backend_from_env_value(std::env::var("SEPSHIELD_STORE").ok())?;
    let cfg = CoreConfig::new(PathBuf::from(patient_data_dir), store_backend)?;
    let stores = Stores::from_config(&cfg)?;

    let state = AppState::new(ApiConfig::from_env()?, &stores)?;
    api_rest::serve(state).await
}
