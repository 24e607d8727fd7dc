use dryuntil_core::NetworkError;
use serde::{Deserialize, Serialize};

/// City reported when no position could be obtained
pub const UNAVAILABLE_CITY: &str = "Unavailable";

/// Geographic position handed over by a position source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Whether rain is expected within the forecast window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RainLevel {
    #[default]
    Dry,
    Rain,
}

impl RainLevel {
    /// Wire value: 0 for dry, 1 for rain
    pub fn code(self) -> i32 {
        match self {
            Self::Dry => 0,
            Self::Rain => 1,
        }
    }
}

/// One `intensity|time` row of the precipitation feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecipitationReading {
    pub intensity: i64,
    pub time_label: String,
}

/// Reduced precipitation series.
///
/// `start` is empty unless `level` is [`RainLevel::Rain`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RainForecast {
    pub level: RainLevel,
    pub start: String,
}

impl RainForecast {
    /// Single left-to-right scan: the first reading above `threshold` sets
    /// both the level and the start label; later ones change nothing.
    pub fn from_readings(readings: &[PrecipitationReading], threshold: i64) -> Self {
        readings
            .iter()
            .find(|r| r.intensity > threshold)
            .map(|r| Self {
                level: RainLevel::Rain,
                start: r.time_label.clone(),
            })
            .unwrap_or_default()
    }
}

/// Payload handed to a notification sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub city: String,
    pub rain: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
}

impl Notification {
    pub fn forecast(city: impl Into<String>, forecast: RainForecast) -> Self {
        Self {
            city: city.into(),
            rain: forecast.level.code(),
            start: Some(forecast.start),
        }
    }

    /// Degraded form sent when the position is unknown
    pub fn unavailable(rain_sentinel: i32) -> Self {
        Self {
            city: UNAVAILABLE_CITY.to_string(),
            rain: rain_sentinel,
            start: None,
        }
    }
}

/// Position source errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Position unavailable")]
    PositionUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

impl LocationError {
    /// Decode a geolocation error code reported by a position source
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::PermissionDenied,
            2 => Self::PositionUnavailable,
            3 => Self::Timeout,
            other => Self::Other(format!("unknown error code {}", other)),
        }
    }

    /// Geolocation error code (1 denied, 2 unavailable, 3 timeout)
    pub fn code(&self) -> i32 {
        match self {
            Self::PermissionDenied => 1,
            Self::PositionUnavailable | Self::Other(_) => 2,
            Self::Timeout => 3,
        }
    }
}

/// Place or precipitation lookup errors
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Response did not name a place")]
    NoPlaceName,
}
