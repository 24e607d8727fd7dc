//! Short-range precipitation feed: `intensity|HH:MM` rows, one per line.
//! Defaults to the Buienradar rain text endpoint (next ~2 hours, 5 minute steps).

use dryuntil_core::{NetworkError, ReqwestErrorExt, ServiceConfig};
use reqwest::Client;
use url::Url;

use crate::types::{LookupError, Position, PrecipitationReading};

#[derive(Debug, Clone)]
pub struct PrecipitationClient {
    client: Client,
    endpoint: Url,
}

impl PrecipitationClient {
    pub fn new(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn from_config(client: Client, services: &ServiceConfig) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&services.precipitation_url)?;
        Ok(Self::new(client, endpoint))
    }

    fn request_url(&self, position: &Position) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("lat", &format!("{:.2}", position.latitude))
            .append_pair("lon", &format!("{:.2}", position.longitude));
        url
    }

    /// Fetch and parse the upcoming readings for `position`.
    pub async fn fetch(
        &self,
        position: &Position,
    ) -> Result<Vec<PrecipitationReading>, LookupError> {
        let url = self.request_url(position);
        tracing::debug!("Fetching precipitation from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.into_network_error())?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message: "precipitation feed rejected the request".to_string(),
            }
            .into());
        }

        let body = response.text().await.map_err(|e| e.into_network_error())?;
        Ok(parse_readings(&body))
    }
}

/// Parse a precipitation feed body.
///
/// Blank lines and lines without `|` are skipped. The time label is the
/// second field only; anything after a further `|` is dropped.
pub fn parse_readings(body: &str) -> Vec<PrecipitationReading> {
    body.lines()
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let mut fields = line.split('|');
            let intensity = fields.next()?;
            let time_label = fields.next()?;
            Some(PrecipitationReading {
                intensity: parse_intensity(intensity),
                time_label: time_label.to_string(),
            })
        })
        .collect()
}

/// Leading integer of `field`, so `"12abc"` reads as 12. No digits reads as 0.
fn parse_intensity(field: &str) -> i64 {
    let field = field.trim_start();
    let (negative, digits) = match field.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, field.strip_prefix('+').unwrap_or(field)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    match digits[..end].parse::<i64>() {
        Ok(value) if negative => -value,
        Ok(value) => value,
        Err(_) => 0,
    }
}
