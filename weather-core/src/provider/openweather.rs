use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

use crate::{
    error::UpstreamError,
    model::Reading,
    provider::{REQUEST_TIMEOUT, http_client, truncate_body},
};

use super::WeatherProvider;

const NAME: &str = "openweather";
const BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> reqwest::Result<Self> {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Point the provider at a different host, e.g. a mock server.
    pub fn with_base_url(api_key: String, base_url: &str) -> reqwest::Result<Self> {
        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: http_client(REQUEST_TIMEOUT)?,
        })
    }

    /// Replace the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> reqwest::Result<Self> {
        self.http = http_client(timeout)?;
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    main: OwMain,
    weather: Vec<OwWeather>,
}

impl OwCurrentResponse {
    fn into_reading(self, city: &str) -> Result<Reading, UpstreamError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .map(|w| w.main)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| UpstreamError::Malformed {
                provider: NAME,
                message: "response has no weather condition".to_string(),
            })?;

        Ok(Reading {
            city: city.to_string(),
            timestamp: Utc::now(),
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            condition,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, city: &str) -> Result<Reading, UpstreamError> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest(NAME, e))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| UpstreamError::from_reqwest(NAME, e))?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                provider: NAME,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::Malformed { provider: NAME, message: e.to_string() })?;

        parsed.into_reading(city)
    }
}
