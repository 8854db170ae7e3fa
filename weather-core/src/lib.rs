//! Core library for the weather monitor service.
//!
//! This crate defines:
//! - Static configuration loading
//! - Weather provider adapters producing [`Reading`]s
//! - Sustained-heat alert detection and notification
//! - Daily aggregation and append-only summary storage
//! - The fixed-interval scheduler driving the pipeline
//!
//! It is used by `weather-cli` and `weather-server`.

pub mod aggregate;
pub mod alert;
pub mod config;
pub mod error;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod provider;
pub mod query;
pub mod scheduler;
pub mod storage;

pub use aggregate::{CityDayAccumulator, DailyAggregator, IngestOutcome};
pub use alert::{AlertDetector, AlertState};
pub use config::{Config, MailConfig, POLL_INTERVAL};
pub use error::{NotifyError, PersistenceError, UpstreamError};
pub use model::{AlertEvent, DailySummary, Reading};
pub use monitor::{CycleReport, Monitor};
pub use notify::{Notifier, NotifierHandle};
pub use provider::{ProviderId, WeatherProvider};
pub use query::QueryService;
pub use scheduler::{Scheduler, SchedulerStats};
pub use storage::{SqliteSummaryStore, SummaryStore};
