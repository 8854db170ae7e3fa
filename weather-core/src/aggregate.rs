//! Per-city daily roll-ups.
//!
//! Readings are buffered per city for the current UTC date. As soon as a
//! buffer holds more than one reading it is summarised, written to storage
//! and emptied, so a city usually ends up with several summary rows per day.
//! A reading from a new date discards whatever was buffered for the old one.

use chrono::NaiveDate;
use std::{collections::HashMap, sync::Arc};
use tracing::{error, info};

use crate::{
    error::PersistenceError,
    model::{DailySummary, Reading},
    storage::SummaryStore,
};

/// Buffered readings for one city on one date.
#[derive(Debug, Clone)]
pub struct CityDayAccumulator {
    pub city: String,
    pub date: NaiveDate,
    pub readings: Vec<Reading>,
}

impl CityDayAccumulator {
    fn new(city: &str, date: NaiveDate) -> Self {
        Self { city: city.to_string(), date, readings: Vec::new() }
    }
}

/// Result of feeding one reading to the aggregator.
#[derive(Debug)]
pub enum IngestOutcome {
    /// Reading buffered; nothing written.
    Buffered,
    Flushed(DailySummary),
    /// A summary was computed and the buffer cleared, but the write failed.
    FlushFailed(DailySummary, PersistenceError),
}

pub struct DailyAggregator {
    store: Arc<dyn SummaryStore>,
    accumulators: HashMap<String, CityDayAccumulator>,
}

impl DailyAggregator {
    pub fn new(store: Arc<dyn SummaryStore>) -> Self {
        Self { store, accumulators: HashMap::new() }
    }

    pub fn ingest(&mut self, reading: &Reading) -> IngestOutcome {
        let date = reading.date();

        let acc = self
            .accumulators
            .entry(reading.city.clone())
            .or_insert_with(|| CityDayAccumulator::new(&reading.city, date));

        if acc.date != date {
            if !acc.readings.is_empty() {
                info!(
                    city = %reading.city,
                    dropped = acc.readings.len(),
                    old_date = %acc.date,
                    new_date = %date,
                    "date changed, discarding unflushed readings"
                );
            }
            *acc = CityDayAccumulator::new(&reading.city, date);
        }

        acc.readings.push(reading.clone());

        if acc.readings.len() <= 1 {
            return IngestOutcome::Buffered;
        }

        let readings = std::mem::take(&mut acc.readings);
        let Some(summary) = summarize(&reading.city, date, &readings) else {
            return IngestOutcome::Buffered;
        };

        match self.store.append(&summary) {
            Ok(()) => {
                info!(
                    city = %summary.city,
                    date = %summary.date,
                    avg = summary.avg_temp,
                    "daily summary saved"
                );
                IngestOutcome::Flushed(summary)
            }
            Err(e) => {
                error!(city = %summary.city, error = %e, "failed to save daily summary");
                IngestOutcome::FlushFailed(summary, e)
            }
        }
    }

    /// Snapshot of the live accumulator for `city`.
    pub fn accumulator(&self, city: &str) -> Option<&CityDayAccumulator> {
        self.accumulators.get(city)
    }
}

/// Compute a summary over `readings`. `None` when there is nothing to summarise.
pub fn summarize(city: &str, date: NaiveDate, readings: &[Reading]) -> Option<DailySummary> {
    if readings.is_empty() {
        return None;
    }

    let temps = readings.iter().map(|r| r.temperature);
    let sum: f64 = temps.clone().sum();
    let max_temp = temps.clone().fold(f64::NEG_INFINITY, f64::max);
    let min_temp = temps.fold(f64::INFINITY, f64::min);

    let conditions: Vec<&str> = readings.iter().map(|r| r.condition.as_str()).collect();

    Some(DailySummary {
        city: city.to_string(),
        date,
        avg_temp: sum / readings.len() as f64,
        max_temp,
        min_temp,
        dominant_condition: dominant_condition(&conditions)?.to_string(),
    })
}

/// Most frequent condition.
///
/// Distinct conditions are taken in first-seen order, stably sorted by
/// ascending count, and the last one wins. Among tied conditions the one
/// first seen latest is picked, e.g. `[Rain, Rain, Clear, Clear]` gives
/// `Clear`.
pub fn dominant_condition<'a>(conditions: &[&'a str]) -> Option<&'a str> {
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    for condition in conditions {
        match counts.iter_mut().find(|(c, _)| c == condition) {
            Some((_, n)) => *n += 1,
            None => counts.push((*condition, 1)),
        }
    }

    counts.sort_by_key(|(_, n)| *n);
    counts.pop().map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteSummaryStore;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, day, hour, 0, 0).unwrap()
    }

    fn reading(city: &str, temperature: f64, condition: &str, timestamp: DateTime<Utc>) -> Reading {
        Reading {
            city: city.to_string(),
            timestamp,
            temperature,
            feels_like: temperature,
            condition: condition.to_string(),
        }
    }

    fn aggregator() -> (DailyAggregator, Arc<SqliteSummaryStore>) {
        let store = Arc::new(SqliteSummaryStore::in_memory().unwrap());
        store.init().unwrap();
        (DailyAggregator::new(store.clone()), store)
    }

    #[test]
    fn flushes_at_second_reading_and_resets() {
        let (mut agg, store) = aggregator();

        let outcome = agg.ingest(&reading("Delhi", 10.0, "Clear", at(20, 1)));
        assert!(matches!(outcome, IngestOutcome::Buffered));

        let summary = match agg.ingest(&reading("Delhi", 20.0, "Clear", at(20, 2))) {
            IngestOutcome::Flushed(s) => s,
            other => panic!("expected flush, got {other:?}"),
        };
        assert_eq!(summary.avg_temp, 15.0);
        assert_eq!(summary.max_temp, 20.0);
        assert_eq!(summary.min_temp, 10.0);
        assert!(agg.accumulator("Delhi").unwrap().readings.is_empty());

        let outcome = agg.ingest(&reading("Delhi", 30.0, "Rain", at(20, 3)));
        assert!(matches!(outcome, IngestOutcome::Buffered));
        assert_eq!(agg.accumulator("Delhi").unwrap().readings.len(), 1);

        let summary = match agg.ingest(&reading("Delhi", 40.0, "Rain", at(20, 4))) {
            IngestOutcome::Flushed(s) => s,
            other => panic!("expected flush, got {other:?}"),
        };
        assert_eq!(summary.avg_temp, 35.0);
        assert_eq!(summary.max_temp, 40.0);
        assert_eq!(summary.min_temp, 30.0);
        assert_eq!(summary.dominant_condition, "Rain");

        let rows = store.query("Delhi", at(20, 0).date_naive()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn new_date_discards_previous_accumulator() {
        let (mut agg, store) = aggregator();

        agg.ingest(&reading("Delhi", 10.0, "Clear", at(20, 23)));
        let outcome = agg.ingest(&reading("Delhi", 50.0, "Haze", at(21, 0)));

        assert!(matches!(outcome, IngestOutcome::Buffered));
        let acc = agg.accumulator("Delhi").unwrap();
        assert_eq!(acc.date, at(21, 0).date_naive());
        assert_eq!(acc.readings.len(), 1);
        assert!(store.query("Delhi", at(20, 0).date_naive()).unwrap().is_empty());
    }

    #[test]
    fn cities_accumulate_independently() {
        let (mut agg, _store) = aggregator();

        agg.ingest(&reading("Delhi", 10.0, "Clear", at(20, 1)));
        let outcome = agg.ingest(&reading("Mumbai", 20.0, "Clear", at(20, 1)));

        assert!(matches!(outcome, IngestOutcome::Buffered));
        assert_eq!(agg.accumulator("Delhi").unwrap().readings.len(), 1);
        assert_eq!(agg.accumulator("Mumbai").unwrap().readings.len(), 1);
    }

    #[test]
    fn failed_write_still_clears_accumulator() {
        // No schema: every append fails.
        let store = Arc::new(SqliteSummaryStore::in_memory().unwrap());
        let mut agg = DailyAggregator::new(store);

        agg.ingest(&reading("Delhi", 10.0, "Clear", at(20, 1)));
        let outcome = agg.ingest(&reading("Delhi", 20.0, "Clear", at(20, 2)));

        match outcome {
            IngestOutcome::FlushFailed(summary, PersistenceError::Write(_)) => {
                assert_eq!(summary.avg_temp, 15.0)
            }
            other => panic!("expected failed flush, got {other:?}"),
        }
        assert!(agg.accumulator("Delhi").unwrap().readings.is_empty());
    }

    #[test]
    fn dominant_condition_prefers_most_frequent() {
        assert_eq!(dominant_condition(&["Clear", "Rain", "Rain", "Haze"]), Some("Rain"));
        assert_eq!(dominant_condition(&["Smoke"]), Some("Smoke"));
        assert_eq!(dominant_condition(&[]), None);
    }

    #[test]
    fn dominant_condition_tie_breaks_to_later_first_seen() {
        assert_eq!(dominant_condition(&["Rain", "Rain", "Clear", "Clear"]), Some("Clear"));
        assert_eq!(dominant_condition(&["Clear", "Clear", "Rain", "Rain"]), Some("Rain"));
        assert_eq!(dominant_condition(&["Rain", "Clear", "Clear", "Rain"]), Some("Clear"));
    }

    #[test]
    fn summarize_empty_is_none() {
        assert!(summarize("Delhi", at(20, 0).date_naive(), &[]).is_none());
    }
}
