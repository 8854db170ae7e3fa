//! The ingestion service object.
//!
//! `Monitor` owns every piece of per-city state. A cycle walks the city list
//! in order, one fetch at a time, so the state is only ever touched from a
//! single task.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::{
    aggregate::{DailyAggregator, IngestOutcome},
    alert::AlertDetector,
    model::Reading,
    notify::NotifierHandle,
    provider::WeatherProvider,
    storage::SummaryStore,
};

/// What happened during one cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: Vec<String>,
    pub failed: Vec<String>,
    pub alerts: usize,
    pub summaries_saved: usize,
    pub persistence_failures: usize,
}

pub struct Monitor {
    provider: Arc<dyn WeatherProvider>,
    cities: Vec<String>,
    detector: AlertDetector,
    aggregator: DailyAggregator,
    notifier: NotifierHandle,
}

impl Monitor {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        cities: Vec<String>,
        alert_threshold: f64,
        store: Arc<dyn SummaryStore>,
        notifier: NotifierHandle,
    ) -> Self {
        Self {
            provider,
            cities,
            detector: AlertDetector::new(alert_threshold),
            aggregator: DailyAggregator::new(store),
            notifier,
        }
    }

    pub fn detector(&self) -> &AlertDetector {
        &self.detector
    }

    pub fn aggregator(&self) -> &DailyAggregator {
        &self.aggregator
    }

    /// Fetch and process every configured city once.
    #[instrument(skip(self), fields(cities = self.cities.len()))]
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        for city in self.cities.clone() {
            match self.provider.fetch(&city).await {
                Ok(reading) => {
                    info!(
                        city = %reading.city,
                        temp = reading.temperature,
                        feels_like = reading.feels_like,
                        condition = %reading.condition,
                        "fetched reading"
                    );
                    self.process(&reading, &mut report);
                    report.fetched.push(city);
                }
                Err(e) => {
                    warn!(city = %city, error = %e, "skipping city for this cycle");
                    report.failed.push(city);
                }
            }
        }

        report
    }

    /// Feed one reading to the detector, then the aggregator.
    pub fn process(&mut self, reading: &Reading, report: &mut CycleReport) {
        if let Some(event) = self.detector.observe(&reading.city, reading.temperature) {
            debug!(city = %event.city, threshold = event.threshold, "alert raised");
            self.notifier.notify(event);
            report.alerts += 1;
        }

        match self.aggregator.ingest(reading) {
            IngestOutcome::Buffered => {}
            IngestOutcome::Flushed(_) => report.summaries_saved += 1,
            IngestOutcome::FlushFailed(..) => report.persistence_failures += 1,
        }
    }
}
