pub mod config;
pub mod error;

pub use config::{
    Config, GeocodeProvider, LocationConfig, NotifierConfig, ServiceConfig, SinkKind,
    ValidationResult,
};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize the dryuntil core system
pub fn init() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("dryuntil core initialized");
    Ok(())
}
