pub mod config;
pub mod error;
pub mod fetch_state;

pub use config::{
    Config, EmptyResultPolicy, GeocodeConfig, LocationConfig, LocationSource, TemperatureUnit,
    UiConfig, ValidationResult, WeatherConfig,
};
pub use error::{AppError, NetworkError, ReqwestErrorExt};
pub use fetch_state::{FetchState, Slot};

use anyhow::Result;

/// Initialize logging for the application.
///
/// Logs go to stderr so they never interleave with the rendered screen on stdout.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("Nimbus core initialized");
    Ok(())
}
