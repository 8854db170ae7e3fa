use chrono::NaiveDate;
use std::sync::Arc;

use crate::{
    error::PersistenceError,
    model::{DailySummary, today},
    storage::SummaryStore,
};

/// Read-only view over stored summaries for display clients.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn SummaryStore>,
    default_city: String,
}

impl QueryService {
    pub fn new(store: Arc<dyn SummaryStore>, default_city: impl Into<String>) -> Self {
        Self { store, default_city: default_city.into() }
    }

    pub fn default_city(&self) -> &str {
        &self.default_city
    }

    /// Summaries for `city` (or the default city) on `date` (or today, UTC).
    pub fn get_summaries(
        &self,
        city: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<DailySummary>, PersistenceError> {
        let city = city
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.default_city.as_str());
        let date = date.unwrap_or_else(today);

        self.store.query(city, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteSummaryStore;

    fn summary(city: &str, date: NaiveDate) -> DailySummary {
        DailySummary {
            city: city.to_string(),
            date,
            avg_temp: 20.0,
            max_temp: 25.0,
            min_temp: 15.0,
            dominant_condition: "Clouds".to_string(),
        }
    }

    fn service() -> QueryService {
        let store = Arc::new(SqliteSummaryStore::in_memory().unwrap());
        store.init().unwrap();

        let yesterday = today().pred_opt().unwrap();
        store.append(&summary("Bangalore", today())).unwrap();
        store.append(&summary("Bangalore", yesterday)).unwrap();
        store.append(&summary("Delhi", today())).unwrap();
        store.append(&summary("Delhi", today())).unwrap();

        QueryService::new(store, "Bangalore")
    }

    #[test]
    fn defaults_to_configured_city_and_today() {
        let rows = service().get_summaries(None, None).unwrap();

        assert_eq!(rows, vec![summary("Bangalore", today())]);
    }

    #[test]
    fn blank_city_falls_back_to_default() {
        let rows = service().get_summaries(Some("  "), None).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].city, "Bangalore");
    }

    #[test]
    fn returns_every_row_for_city_and_date() {
        let svc = service();

        assert_eq!(svc.get_summaries(Some("Delhi"), None).unwrap().len(), 2);
        let yesterday = today().pred_opt().unwrap();
        assert_eq!(svc.get_summaries(Some("Bangalore"), Some(yesterday)).unwrap().len(), 1);
        assert!(svc.get_summaries(Some("Chennai"), None).unwrap().is_empty());
    }
}
