//! Join state for one position cycle.
//!
//! Both lookups write into the same `JoinState`; whichever completes second
//! gets the notification back and is responsible for delivering it.

use crate::types::{Notification, RainForecast};

/// Identifies one position-resolution cycle
pub type CycleId = u64;

#[derive(Debug, Default)]
pub struct JoinState {
    cycle: CycleId,
    city: Option<String>,
    rain: Option<RainForecast>,
    emitted: bool,
}

impl JoinState {
    /// Fresh, unresolved state for `cycle`
    pub fn begin(cycle: CycleId) -> Self {
        Self {
            cycle,
            ..Self::default()
        }
    }

    pub fn cycle(&self) -> CycleId {
        self.cycle
    }

    pub fn is_ready(&self) -> bool {
        self.city.as_deref().is_some_and(|c| !c.is_empty()) && self.rain.is_some()
    }

    /// Record the place name. Returns the notification if this completed the join.
    pub fn resolve_city(&mut self, city: String) -> Option<Notification> {
        self.city = Some(city);
        self.try_emit()
    }

    /// Record the rain forecast. Returns the notification if this completed the join.
    pub fn resolve_rain(&mut self, forecast: RainForecast) -> Option<Notification> {
        self.rain = Some(forecast);
        self.try_emit()
    }

    // Only the not-ready -> ready transition yields a notification.
    fn try_emit(&mut self) -> Option<Notification> {
        if self.emitted || !self.is_ready() {
            return None;
        }
        let city = self.city.clone()?;
        let forecast = self.rain.clone()?;
        self.emitted = true;
        Some(Notification::forecast(city, forecast))
    }
}
