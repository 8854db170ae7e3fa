//! HTTP handler functions for the weather query API.

use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WeatherQueryParams {
    pub city: Option<String>,
    /// `YYYY-MM-DD`; today (UTC) when absent.
    pub date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiHealth {
    pub healthy: bool,
    pub version: String,
}

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /weather?city=<name>&date=<YYYY-MM-DD>`
///
/// Returns every stored summary row for the city and date.
pub async fn weather(
    state: web::Data<AppState>,
    params: web::Query<WeatherQueryParams>,
) -> HttpResponse {
    let params = params.into_inner();

    let date = match params.date.as_deref().map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d")) {
        Some(Ok(date)) => Some(date),
        Some(Err(_)) => {
            return HttpResponse::BadRequest().body("date must be formatted as YYYY-MM-DD");
        }
        None => None,
    };

    let query = state.query.clone();
    let result = web::block(move || query.get_summaries(params.city.as_deref(), date)).await;

    match result {
        Ok(Ok(rows)) => HttpResponse::Ok().json(rows),
        Ok(Err(e)) => {
            error!(error = %e, "error fetching weather data");
            HttpResponse::InternalServerError().body("Error fetching weather data")
        }
        Err(e) => {
            error!(error = %e, "blocking query task failed");
            HttpResponse::InternalServerError().body("Error fetching weather data")
        }
    }
}
