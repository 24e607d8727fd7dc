use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a single line summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where the device is and how often to look again
    #[serde(default)]
    pub location: LocationConfig,

    /// Upstream lookup endpoints
    #[serde(default)]
    pub services: ServiceConfig,

    /// Outbound notification settings
    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Fixed latitude reported by the built-in position source
    pub latitude: Option<f64>,

    /// Fixed longitude reported by the built-in position source
    pub longitude: Option<f64>,

    /// Hint for how long a position fix may take
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Oldest position the source may hand out; also the watch interval
    #[serde(default = "default_maximum_age_ms")]
    pub maximum_age_ms: u64,
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_maximum_age_ms() -> u64 {
    60_000
}

/// Environment variables that override the configured coordinates
pub const LATITUDE_ENV: &str = "DRYUNTIL_LATITUDE";
pub const LONGITUDE_ENV: &str = "DRYUNTIL_LONGITUDE";

fn env_coordinate(name: &str) -> Option<f64> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            timeout_ms: default_timeout_ms(),
            maximum_age_ms: default_maximum_age_ms(),
        }
    }
}

/// Which reverse-geocoding service answers place lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeocodeProvider {
    #[default]
    Nominatim,
    OpenWeatherMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub geocode_provider: GeocodeProvider,

    /// Full endpoint URL for reverse geocoding
    #[serde(default = "default_geocode_url")]
    pub geocode_url: String,

    /// `appid` sent to OpenWeatherMap; ignored by Nominatim
    #[serde(default)]
    pub openweathermap_api_key: Option<String>,

    /// Full endpoint URL for the precipitation text feed
    #[serde(default = "default_precipitation_url")]
    pub precipitation_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Transport timeout per request. Absent means requests may wait forever.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_geocode_url() -> String {
    "https://nominatim.openstreetmap.org/reverse".to_string()
}

fn default_precipitation_url() -> String {
    "https://gpsgadget.buienradar.nl/data/raintext".to_string()
}

fn default_user_agent() -> String {
    format!("dryuntil/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            geocode_provider: GeocodeProvider::default(),
            geocode_url: default_geocode_url(),
            openweathermap_api_key: None,
            precipitation_url: default_precipitation_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: None,
        }
    }
}

/// How notifications leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Console,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub sink: SinkKind,

    /// Rain value sent with the "Unavailable" notification
    #[serde(default = "default_unavailable_rain")]
    pub unavailable_rain: i32,

    /// Readings above this intensity count as rain
    #[serde(default)]
    pub rain_threshold: i64,
}

fn default_unavailable_rain() -> i32 {
    2
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::default(),
            unavailable_rain: default_unavailable_rain(),
            rain_threshold: 0,
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let mut config = Self::default();
            config.save_to(&config_path)?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            config.apply_env_overrides();
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Let `DRYUNTIL_LATITUDE` / `DRYUNTIL_LONGITUDE` replace the file's coordinates.
    ///
    /// Overrides live in memory only; they are never written back to disk.
    pub fn apply_env_overrides(&mut self) {
        if let Some(lat) = env_coordinate(LATITUDE_ENV) {
            self.location.latitude = Some(lat);
        }
        if let Some(lon) = env_coordinate(LONGITUDE_ENV) {
            self.location.longitude = Some(lon);
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.apply_env_overrides();

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    result.add_error("location.latitude", "Latitude must be within -90..=90");
                }
                if !(-180.0..=180.0).contains(&lon) {
                    result.add_error(
                        "location.longitude",
                        "Longitude must be within -180..=180",
                    );
                }
            }
            (None, None) => {
                result.add_warning(
                    "location",
                    "No position configured - every notification will report Unavailable",
                );
            }
            (Some(_), None) => {
                result.add_error("location.longitude", "Latitude is set but longitude is not");
            }
            (None, Some(_)) => {
                result.add_error("location.latitude", "Longitude is set but latitude is not");
            }
        }

        if self.location.maximum_age_ms == 0 {
            result.add_error("location.maximum_age_ms", "Maximum age must be greater than 0");
        }

        self.validate_url(&self.services.geocode_url, "services.geocode_url", &mut result);
        self.validate_url(
            &self.services.precipitation_url,
            "services.precipitation_url",
            &mut result,
        );

        if self.services.geocode_provider == GeocodeProvider::OpenWeatherMap
            && self
                .services
                .openweathermap_api_key
                .as_deref()
                .map_or(true, |k| k.trim().is_empty())
        {
            result.add_warning(
                "services.openweathermap_api_key",
                "OpenWeatherMap usually rejects requests without an API key",
            );
        }

        if self.services.request_timeout_secs == Some(0) {
            result.add_error(
                "services.request_timeout_secs",
                "Timeout must be greater than 0 (omit it to disable)",
            );
        }

        if matches!(self.notifier.unavailable_rain, 0 | 1) {
            result.add_warning(
                "notifier.unavailable_rain",
                "Unavailable rain value collides with a real rain level",
            );
        }

        if self.notifier.rain_threshold < 0 {
            result.add_warning(
                "notifier.rain_threshold",
                "Negative threshold treats dry readings as rain",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("dryuntil");

        Ok(config_dir.join("config.toml"))
    }
}
