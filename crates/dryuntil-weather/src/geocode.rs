//! Reverse geocoding: convert coordinates to a short place name.
//! Nominatim (OpenStreetMap) by default, or OpenWeatherMap's `find` endpoint.

use dryuntil_core::{GeocodeProvider, NetworkError, ReqwestErrorExt, ServiceConfig};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::types::{LookupError, Position};

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state_district: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherMapResponse {
    #[serde(default)]
    list: Vec<OpenWeatherMapCity>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherMapCity {
    name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: Client,
    endpoint: Url,
    provider: GeocodeProvider,
    api_key: Option<String>,
}

impl GeocodeClient {
    pub fn new(client: Client, endpoint: Url, provider: GeocodeProvider) -> Self {
        Self {
            client,
            endpoint,
            provider,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn from_config(client: Client, services: &ServiceConfig) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&services.geocode_url)?;
        let geocoder = Self::new(client, endpoint, services.geocode_provider);
        Ok(match services.openweathermap_api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => geocoder.with_api_key(key),
            _ => geocoder,
        })
    }

    fn request_url(&self, position: &Position) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("lat", &position.latitude.to_string())
                .append_pair("lon", &position.longitude.to_string());
            match self.provider {
                GeocodeProvider::Nominatim => {
                    query
                        .append_pair("format", "json")
                        .append_pair("addressdetails", "1")
                        .append_pair("zoom", "10");
                }
                GeocodeProvider::OpenWeatherMap => {
                    query.append_pair("cnt", "1");
                    if let Some(key) = &self.api_key {
                        query.append_pair("appid", key);
                    }
                }
            }
        }
        url
    }

    /// Resolve `position` to a non-empty place name.
    pub async fn lookup_place(&self, position: &Position) -> Result<String, LookupError> {
        let url = self.request_url(position);

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
                message: "reverse geocoder rejected the request".to_string(),
            }
            .into());
        }

        let body = response.text().await.map_err(|e| e.into_network_error())?;
        let place = extract_place(self.provider, &body)?;

        tracing::info!("Reverse geocoded to: {}", place);
        Ok(place)
    }
}

/// Pull the first available short place name out of a provider response.
pub fn extract_place(provider: GeocodeProvider, body: &str) -> Result<String, LookupError> {
    let place = match provider {
        GeocodeProvider::Nominatim => {
            let response: NominatimResponse =
                serde_json::from_str(body).map_err(|e| LookupError::Malformed(e.to_string()))?;
            let addr = response.address.ok_or(LookupError::NoPlaceName)?;
            // Prefer city > town > village > municipality, widening from there
            [
                addr.city,
                addr.town,
                addr.village,
                addr.municipality,
                addr.state_district,
                addr.county,
                addr.state,
                addr.country,
            ]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
        }
        GeocodeProvider::OpenWeatherMap => {
            let response: OpenWeatherMapResponse =
                serde_json::from_str(body).map_err(|e| LookupError::Malformed(e.to_string()))?;
            response
                .list
                .into_iter()
                .next()
                .and_then(|city| city.name)
                .filter(|name| !name.trim().is_empty())
        }
    };

    place.ok_or(LookupError::NoPlaceName)
}
