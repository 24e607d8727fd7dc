//! Weather aggregator: one position in, one notification out.
//!
//! Each resolved position starts a cycle that fans out to the place and
//! precipitation lookups as two detached tasks. Whichever finishes second
//! completes the join and hands the notification to the sink. A lookup that
//! fails is logged and dropped, so its cycle never emits.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dryuntil_core::Config;
use parking_lot::Mutex;
use reqwest::Client;

use crate::geocode::GeocodeClient;
use crate::join::{CycleId, JoinState};
use crate::precipitation::PrecipitationClient;
use crate::sink::NotificationSink;
use crate::types::{LocationError, Notification, Position, RainForecast};

/// Rain value reported with the "Unavailable" notification unless configured
pub const DEFAULT_UNAVAILABLE_RAIN: i32 = 2;

pub struct WeatherAggregator {
    geocoder: Arc<GeocodeClient>,
    precipitation: Arc<PrecipitationClient>,
    sink: Arc<dyn NotificationSink>,
    state: Arc<Mutex<JoinState>>,
    unavailable_rain: i32,
    rain_threshold: i64,
}

impl WeatherAggregator {
    pub fn new(
        geocoder: GeocodeClient,
        precipitation: PrecipitationClient,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            geocoder: Arc::new(geocoder),
            precipitation: Arc::new(precipitation),
            sink,
            state: Arc::new(Mutex::new(JoinState::default())),
            unavailable_rain: DEFAULT_UNAVAILABLE_RAIN,
            rain_threshold: 0,
        }
    }

    /// Build both lookup clients from the service settings.
    pub fn from_config(config: &Config, sink: Arc<dyn NotificationSink>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(config.services.user_agent.as_str());
        if let Some(secs) = config.services.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        let geocoder = GeocodeClient::from_config(client.clone(), &config.services)
            .context("Invalid geocode URL")?;
        let precipitation = PrecipitationClient::from_config(client, &config.services)
            .context("Invalid precipitation URL")?;

        Ok(Self::new(geocoder, precipitation, sink)
            .with_unavailable_rain(config.notifier.unavailable_rain)
            .with_rain_threshold(config.notifier.rain_threshold))
    }

    pub fn with_unavailable_rain(mut self, rain: i32) -> Self {
        self.unavailable_rain = rain;
        self
    }

    pub fn with_rain_threshold(mut self, threshold: i64) -> Self {
        self.rain_threshold = threshold;
        self
    }

    /// Start a new cycle for `position`.
    ///
    /// Must be called from within a tokio runtime. Returns immediately; the
    /// notification, if any, reaches the sink once both lookups have resolved.
    /// Returns `None` when the position is out of range and no cycle started.
    pub fn on_position_resolved(&self, position: Position) -> Option<CycleId> {
        if !position.is_valid() {
            tracing::warn!(
                "Ignoring out-of-range position {}, {}",
                position.latitude,
                position.longitude
            );
            self.on_position_failed(LocationError::PositionUnavailable.code());
            return None;
        }

        let cycle = {
            let mut state = self.state.lock();
            let next = state.cycle().wrapping_add(1);
            *state = JoinState::begin(next);
            next
        };
        tracing::info!(
            cycle,
            "Looking up weather for {}, {}",
            position.latitude,
            position.longitude
        );

        let geocoder = Arc::clone(&self.geocoder);
        let state = Arc::clone(&self.state);
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            match geocoder.lookup_place(&position).await {
                Ok(city) => {
                    if let Some(n) = settle(&state, cycle, |s| s.resolve_city(city)) {
                        deliver(sink.as_ref(), cycle, n);
                    }
                }
                Err(e) => tracing::warn!(cycle, "Place lookup failed: {}", e),
            }
        });

        let precipitation = Arc::clone(&self.precipitation);
        let state = Arc::clone(&self.state);
        let sink = Arc::clone(&self.sink);
        let threshold = self.rain_threshold;
        tokio::spawn(async move {
            match precipitation.fetch(&position).await {
                Ok(readings) => {
                    let forecast = RainForecast::from_readings(&readings, threshold);
                    tracing::debug!(
                        cycle,
                        readings = readings.len(),
                        "Rain forecast: {:?} from {:?}",
                        forecast.level,
                        forecast.start
                    );
                    if let Some(n) = settle(&state, cycle, |s| s.resolve_rain(forecast)) {
                        deliver(sink.as_ref(), cycle, n);
                    }
                }
                Err(e) => tracing::warn!(cycle, "Precipitation lookup failed: {}", e),
            }
        });

        Some(cycle)
    }

    /// Report that no position could be obtained.
    ///
    /// Delivers the degraded notification right away, independent of any
    /// lookups still in flight.
    pub fn on_position_failed(&self, error_code: i32) {
        let reason = LocationError::from_code(error_code);
        tracing::warn!(error_code, "Position unavailable: {}", reason);
        self.sink.deliver(Notification::unavailable(self.unavailable_rain));
    }
}

/// Apply a lookup result to the join if its cycle is still current.
fn settle(
    state: &Mutex<JoinState>,
    cycle: CycleId,
    resolve: impl FnOnce(&mut JoinState) -> Option<Notification>,
) -> Option<Notification> {
    let mut state = state.lock();
    if state.cycle() != cycle {
        tracing::debug!(
            cycle,
            current = state.cycle(),
            "Dropping result from superseded cycle"
        );
        return None;
    }
    resolve(&mut state)
}

fn deliver(sink: &dyn NotificationSink, cycle: CycleId, notification: Notification) {
    tracing::info!(
        cycle,
        city = %notification.city,
        rain = notification.rain,
        "Delivering notification"
    );
    sink.deliver(notification);
}
