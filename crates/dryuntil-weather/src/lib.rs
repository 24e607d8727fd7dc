//! Rain notifier for dryuntil
//!
//! Joins a reverse-geocoded place name with a short-range precipitation
//! forecast and hands one combined notification to a sink per position.

pub mod aggregator;
pub mod display;
pub mod geocode;
pub mod join;
pub mod location;
pub mod precipitation;
pub mod sink;
pub mod types;

pub use aggregator::WeatherAggregator;
pub use display::DisplayText;
pub use geocode::GeocodeClient;
pub use join::{CycleId, JoinState};
pub use location::{FixedPositionSource, LocationOptions, PositionEvent};
pub use precipitation::{parse_readings, PrecipitationClient};
pub use sink::{ChannelSink, ConsoleSink, JsonSink, NotificationSink};
pub use types::*;
