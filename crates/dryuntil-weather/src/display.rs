//! Three-line watch-style rendering of a notification.

use crate::types::{Notification, RainLevel};

const MAX_CITY_LINE: usize = 18;
const MAX_START: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayText {
    pub status: String,
    pub detail: String,
    pub city: String,
}

impl DisplayText {
    pub fn render(notification: &Notification) -> Self {
        let (status, detail) = if notification.rain == RainLevel::Rain.code() {
            let start = notification.start.as_deref().unwrap_or_default();
            ("Dry until", truncate(start, MAX_START))
        } else if notification.rain == RainLevel::Dry.code() {
            ("It stays", "Dry".to_string())
        } else {
            ("Unavailable", String::new())
        };

        Self {
            status: status.to_string(),
            detail,
            city: truncate(&format!("in {}", notification.city), MAX_CITY_LINE),
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
