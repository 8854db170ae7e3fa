//! Actix-Web API server for the weather monitor.
//!
//! Serves the daily summaries written by the ingestion pipeline to the
//! display client. The endpoint is read-only and unauthenticated.

mod handlers;

pub use handlers::{ApiHealth, WeatherQueryParams};

use actix_cors::Cors;
use actix_web::{App, HttpServer, dev::Server, middleware, web};
use std::{future::Future, io};
use tokio::task::JoinError;
use weather_core::QueryService;

/// Shared application state.
pub struct AppState {
    pub query: QueryService,
}

/// Register the API routes on an app or test service.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/weather", web::get().to(handlers::weather))
        .route("/health", web::get().to(handlers::health));
}

/// Bind the HTTP server without starting it.
///
/// Signal handling is disabled; stop the server through its handle.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub fn build_server(
    query: QueryService,
    bind_addr: &str,
    port: u16,
    cors_origin: &str,
) -> std::io::Result<Server> {
    let state = web::Data::new(AppState { query });
    let cors_origin = cors_origin.to_string();

    tracing::info!("Starting server on http://{bind_addr}:{port}");

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allowed_methods(vec!["GET"]);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(routes)
    })
    .disable_signals()
    .bind((bind_addr, port))?
    .run();

    Ok(server)
}

/// Run `server` until `shutdown` resolves, then stop it gracefully.
///
/// The server runs on its own task so that requests already being handled
/// complete before this returns.
pub async fn serve_until<F>(server: Server, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()>,
{
    let handle = server.handle();
    let mut task = tokio::spawn(server);

    tokio::select! {
        res = &mut task => return flatten(res),
        _ = shutdown => {
            tracing::info!("stopping HTTP server");
            handle.stop(true).await;
        }
    }

    flatten(task.await)
}

fn flatten(res: Result<io::Result<()>, JoinError>) -> io::Result<()> {
    res.map_err(io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test};
    use chrono::{NaiveDate, Utc};
    use std::{
        io::{Read, Write},
        net::{TcpListener, TcpStream},
        sync::Arc,
        time::Duration,
    };
    use weather_core::{DailySummary, PersistenceError, SqliteSummaryStore, SummaryStore};

    fn summary(city: &str, date: NaiveDate, avg: f64) -> DailySummary {
        DailySummary {
            city: city.to_string(),
            date,
            avg_temp: avg,
            max_temp: avg + 2.0,
            min_temp: avg - 2.0,
            dominant_condition: "Haze".to_string(),
        }
    }

    fn state_with(rows: &[DailySummary]) -> web::Data<AppState> {
        let store = Arc::new(SqliteSummaryStore::in_memory().unwrap());
        store.init().unwrap();
        for row in rows {
            store.append(row).unwrap();
        }
        web::Data::new(AppState { query: QueryService::new(store, "Bangalore") })
    }

    struct BrokenStore;

    impl SummaryStore for BrokenStore {
        fn init(&self) -> Result<(), PersistenceError> {
            Ok(())
        }

        fn append(&self, _: &DailySummary) -> Result<(), PersistenceError> {
            Err(PersistenceError::Write("disk full".into()))
        }

        fn query(&self, _: &str, _: NaiveDate) -> Result<Vec<DailySummary>, PersistenceError> {
            Err(PersistenceError::Read("database is locked".into()))
        }
    }

    #[actix_web::test]
    async fn weather_returns_rows_for_requested_city() {
        let today = Utc::now().date_naive();
        let state = state_with(&[
            summary("Delhi", today, 30.0),
            summary("Delhi", today, 32.0),
            summary("Mumbai", today, 28.0),
        ]);
        let app = test::init_service(App::new().app_data(state).configure(routes)).await;

        let req = test::TestRequest::get().uri("/weather?city=Delhi").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        let rows = body.as_array().expect("array body");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["city"], "Delhi");
        assert_eq!(rows[0]["date"], today.format("%Y-%m-%d").to_string());
        assert_eq!(rows[0]["avg_temp"], 30.0);
        assert_eq!(rows[0]["max_temp"], 32.0);
        assert_eq!(rows[0]["min_temp"], 28.0);
        assert_eq!(rows[0]["dominant_condition"], "Haze");
        assert_eq!(rows[1]["avg_temp"], 32.0);
    }

    #[actix_web::test]
    async fn weather_defaults_to_default_city() {
        let today = Utc::now().date_naive();
        let state = state_with(&[summary("Bangalore", today, 24.0), summary("Delhi", today, 30.0)]);
        let app = test::init_service(App::new().app_data(state).configure(routes)).await;

        let req = test::TestRequest::get().uri("/weather").to_request();
        let rows: Vec<DailySummary> = test::call_and_read_body_json(&app, req).await;

        assert_eq!(rows, vec![summary("Bangalore", today, 24.0)]);
    }

    #[actix_web::test]
    async fn weather_accepts_explicit_date() {
        let day = NaiveDate::from_ymd_opt(2024, 10, 20).unwrap();
        let state = state_with(&[summary("Delhi", day, 30.0)]);
        let app = test::init_service(App::new().app_data(state).configure(routes)).await;

        let req = test::TestRequest::get().uri("/weather?city=Delhi&date=2024-10-20").to_request();
        let rows: Vec<DailySummary> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(rows.len(), 1);

        let req = test::TestRequest::get().uri("/weather?city=Delhi&date=20-10-2024").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn storage_failure_is_a_server_error() {
        let query = QueryService::new(Arc::new(BrokenStore), "Bangalore");
        let state = web::Data::new(AppState { query });
        let app = test::init_service(App::new().app_data(state).configure(routes)).await;

        let req = test::TestRequest::get().uri("/weather?city=Delhi").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = test::init_service(App::new().configure(routes)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let health: ApiHealth = test::call_and_read_body_json(&app, req).await;

        assert!(health.healthy);
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }

    fn get_health(port: u16) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[actix_web::test]
    async fn serve_until_answers_requests_then_stops() {
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let query = QueryService::new(Arc::new(BrokenStore), "Bangalore");
        let server = build_server(query, "127.0.0.1", port, "http://localhost:3000").unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel();
        let shutdown = async move {
            let response = tokio::task::spawn_blocking(move || get_health(port)).await.unwrap();
            tx.send(response).unwrap();
        };

        tokio::time::timeout(Duration::from_secs(10), serve_until(server, shutdown))
            .await
            .expect("server did not stop")
            .unwrap();

        let response = rx.await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "unexpected response: {response}");
        assert!(response.contains("\"healthy\":true"));
    }
}
