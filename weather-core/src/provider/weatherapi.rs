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

const NAME: &str = "weatherapi";
const BASE_URL: &str = "http://api.weatherapi.com";

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> reqwest::Result<Self> {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> reqwest::Result<Self> {
        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: http_client(REQUEST_TIMEOUT)?,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> reqwest::Result<Self> {
        self.http = http_client(timeout)?;
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    feelslike_c: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    current: WaCurrent,
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, city: &str) -> Result<Reading, UpstreamError> {
        let url = format!("{}/v1/current.json", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", city)])
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

        let parsed: WaResponse = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::Malformed { provider: NAME, message: e.to_string() })?;

        let condition = parsed.current.condition.text;
        if condition.trim().is_empty() {
            return Err(UpstreamError::Malformed {
                provider: NAME,
                message: "response has an empty condition".to_string(),
            });
        }

        Ok(Reading {
            city: city.to_string(),
            timestamp: Utc::now(),
            temperature: parsed.current.temp_c,
            feels_like: parsed.current.feelslike_c,
            condition,
        })
    }
}
