use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single successful observation for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub city: String,
    /// Ingestion time, not the provider's observation time.
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    pub condition: String,
}

impl Reading {
    /// Calendar date (UTC) this reading belongs to.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Statistical roll-up of a batch of readings for one city and date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub city: String,
    pub date: NaiveDate,
    pub avg_temp: f64,
    pub max_temp: f64,
    pub min_temp: f64,
    pub dominant_condition: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub city: String,
    pub threshold: f64,
    pub message: String,
}

impl AlertEvent {
    pub fn new(city: &str, threshold: f64) -> Self {
        Self {
            city: city.to_string(),
            threshold,
            message: format!(
                "ALERT: {city} - Temperature exceeded {threshold}°C for two consecutive updates!"
            ),
        }
    }
}

/// Today's date in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
