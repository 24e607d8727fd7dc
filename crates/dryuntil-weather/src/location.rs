//! Position sources feeding the aggregator.
//!
//! Device positioning is platform specific; the built-in source reports a
//! configured fixed position on a timer, which is enough to drive the
//! notifier from a desktop or server.

use std::time::Duration;

use dryuntil_core::LocationConfig;
use tokio::sync::mpsc;

use crate::types::{LocationError, Position};

/// Outcome of one position fix
#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    Resolved(Position),
    Failed(LocationError),
}

/// Hints passed to the position source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationOptions {
    pub timeout: Duration,
    pub maximum_age: Duration,
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(15_000),
            maximum_age: Duration::from_millis(60_000),
        }
    }
}

impl From<&LocationConfig> for LocationOptions {
    fn from(config: &LocationConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            maximum_age: Duration::from_millis(config.maximum_age_ms),
        }
    }
}

/// Reports a fixed position (or its absence) every `maximum_age`.
#[derive(Debug, Clone)]
pub struct FixedPositionSource {
    position: Option<Position>,
    options: LocationOptions,
}

impl FixedPositionSource {
    pub fn new(position: Option<Position>, options: LocationOptions) -> Self {
        Self { position, options }
    }

    pub fn from_config(config: &LocationConfig) -> Self {
        let position = match (config.latitude, config.longitude) {
            (Some(lat), Some(lon)) => Some(Position::new(lat, lon)),
            _ => None,
        };
        Self::new(position, LocationOptions::from(config))
    }

    pub fn options(&self) -> LocationOptions {
        self.options
    }

    /// One position fix
    pub fn current(&self) -> PositionEvent {
        match self.position {
            Some(position) => PositionEvent::Resolved(position),
            None => PositionEvent::Failed(LocationError::PositionUnavailable),
        }
    }

    /// Start watching. The first event is sent immediately, then one per
    /// `maximum_age` until the receiver is dropped.
    pub fn watch(self) -> mpsc::Receiver<PositionEvent> {
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            // interval() rejects a zero period
            let period = self.options.maximum_age.max(Duration::from_millis(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(self.current()).await.is_err() {
                    tracing::debug!("Position watcher stopped");
                    break;
                }
            }
        });
        rx
    }
}
