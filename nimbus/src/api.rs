//! weatherapi.com client
//!
//! `GET {base}/current.json?key=..&q=..` where `q` is a place name or
//! `"lat,lon"`. Runs inside effect tasks; the reducer only ever sees the
//! mapped [`WeatherSnapshot`] or a failure reason.

use std::time::Duration;

use async_trait::async_trait;
use nimbus_core::{LookupError, Place, WeatherLookup, WeatherSnapshot};
use reqwest::Client;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    location: LocationPayload,
    current: CurrentPayload,
}

#[derive(Debug, Deserialize)]
struct LocationPayload {
    name: String,
    region: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct CurrentPayload {
    temp_c: f64,
    temp_f: f64,
    condition: ConditionPayload,
    wind_mph: f64,
    wind_kph: f64,
    wind_degree: i32,
    wind_dir: String,
    humidity: u8,
    pressure_in: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionPayload {
    text: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorPayload,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: String,
}

impl From<CurrentResponse> for WeatherSnapshot {
    fn from(r: CurrentResponse) -> Self {
        WeatherSnapshot {
            place: Place {
                country: r.location.country,
                region: r.location.region,
                name: r.location.name,
            },
            temp_c: r.current.temp_c,
            temp_f: r.current.temp_f,
            condition_text: r.current.condition.text,
            condition_icon: r.current.condition.icon,
            wind_mph: r.current.wind_mph,
            wind_kph: r.current.wind_kph,
            wind_degree: r.current.wind_degree,
            wind_dir: r.current.wind_dir,
            humidity_pct: r.current.humidity,
            pressure_in: r.current.pressure_in,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl WeatherApiClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl WeatherLookup for WeatherApiClient {
    async fn fetch_weather(&self, query: &str) -> Result<WeatherSnapshot, LookupError> {
        // errors drop the URL: its query holds the key
        let url = format!("{}/current.json", self.base_url);
        tracing::debug!(%query, "fetching current weather");

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", query)])
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // weatherapi explains failures in {"error": {"message": ..}}
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LookupError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let data: CurrentResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Decode(e.without_url().to_string()))?;
        Ok(data.into())
    }
}
