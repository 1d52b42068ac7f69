use async_trait::async_trait;
use reqwest::{header, Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult, GeocodeError};
use crate::model::{AddressKey, Coordinate};

/// One external lookup. Implementations neither retry nor cache.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, address: &AddressKey) -> Result<Coordinate, GeocodeError>;
}

/// Client for a Nominatim-compatible `/search` endpoint.
pub struct NominatimClient {
    http: Client,
    endpoint: Url,
    api_key: Option<SecretString>,
}

impl NominatimClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let endpoint = Url::parse(&config.geocoder_endpoint).map_err(|err| {
            AppError::Config(format!(
                "invalid geocoder endpoint {}: {err}",
                config.geocoder_endpoint
            ))
        })?;
        let http = Client::builder()
            .user_agent(config.geocoder_user_agent.clone())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            endpoint,
            api_key: config.geocoder_api_key.clone(),
        })
    }

    pub async fn resolve_components(
        &self,
        address: &str,
        city: &str,
        state: &str,
        zip: &str,
    ) -> Result<Coordinate, GeocodeError> {
        self.resolve(&AddressKey::new(address, city, state, zip))
            .await
    }

    fn search_url(&self, address: &AddressKey) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("format", "json")
                .append_pair("q", address.as_str())
                .append_pair("limit", "1");
            if let Some(key) = &self.api_key {
                pairs.append_pair("key", key.expose_secret());
            }
        }
        url
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn resolve(&self, address: &AddressKey) -> Result<Coordinate, GeocodeError> {
        trace!(address = %address, "issuing geocoder request");
        let response = self
            .http
            .get(self.search_url(address))
            .header(header::ACCEPT, "application/json")
            .send()
            .await?
            .error_for_status()?;
        let body = response.bytes().await?;
        let coordinate = parse_first_candidate(&body)?;
        debug!(address = %address, ?coordinate, "geocoder resolved address");
        Ok(coordinate)
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    lat: Option<Decimal>,
    lon: Option<Decimal>,
}

/// Providers send decimals as strings; a few send bare numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Decimal {
    Text(String),
    Number(f64),
}

impl Decimal {
    fn value(&self) -> Option<f64> {
        match self {
            Decimal::Text(text) => text.trim().parse::<f64>().ok(),
            Decimal::Number(number) => Some(*number),
        }
    }
}

/// Reads the first candidate of a provider response body.
pub fn parse_first_candidate(body: &[u8]) -> Result<Coordinate, GeocodeError> {
    let candidates: Vec<Candidate> = serde_json::from_slice(body)
        .map_err(|err| GeocodeError::transient(format!("malformed geocoder response: {err}")))?;
    let Some(first) = candidates.into_iter().next() else {
        return Err(GeocodeError::NotFound);
    };

    let latitude = first.lat.as_ref().and_then(Decimal::value);
    let longitude = first.lon.as_ref().and_then(Decimal::value);
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => {
            let coordinate = Coordinate::new(latitude, longitude);
            if coordinate.is_valid() {
                Ok(coordinate)
            } else {
                Err(GeocodeError::transient(format!(
                    "coordinate out of range: {latitude}, {longitude}"
                )))
            }
        }
        _ => Err(GeocodeError::transient(
            "candidate is missing a numeric lat/lon",
        )),
    }
}
