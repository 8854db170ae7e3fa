use anyhow::{Context, Result};
use std::{path::Path, sync::Arc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use weather_core::{
    Config, Monitor, POLL_INTERVAL, QueryService, Scheduler, SqliteSummaryStore, SummaryStore,
    WeatherProvider, notify::notifier_from_config, notify::spawn_notifier,
    provider::provider_from_config,
};

/// Start the pipeline and HTTP server; return after Ctrl-C.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    let store = Arc::new(
        SqliteSummaryStore::open(&config.database_path).context("Failed to open summary database")?,
    );
    store.init().context("Failed to initialise summary database")?;

    let provider: Arc<dyn WeatherProvider> = Arc::from(provider_from_config(&config)?);
    let (notifier, notifier_task) = spawn_notifier(notifier_from_config(&config)?);

    let monitor = Arc::new(Mutex::new(Monitor::new(
        provider,
        config.city_list(),
        config.alert_threshold,
        store.clone(),
        notifier,
    )));

    let cancel = CancellationToken::new();
    let scheduler = Scheduler::new(POLL_INTERVAL, cancel.clone());
    let scheduler_task = tokio::spawn(async move { scheduler.run(monitor).await });

    let server = weather_server::build_server(
        QueryService::new(store, config.default_city.clone()),
        &config.bind_addr,
        config.port,
        &config.cors_origin,
    )
    .with_context(|| format!("Failed to bind {}:{}", config.bind_addr, config.port))?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        info!("shutdown requested");
    };
    let server_result =
        weather_server::serve_until(server, shutdown).await.context("HTTP server failed");

    cancel.cancel();
    match scheduler_task.await {
        Ok(stats) => info!(
            cycles = stats.cycles_started,
            skipped = stats.ticks_skipped,
            "pipeline stopped"
        ),
        Err(e) => warn!(error = %e, "scheduler task ended abnormally"),
    }

    // The monitor held the last notifier handle; the worker drains and exits.
    if let Err(e) = notifier_task.await {
        warn!(error = %e, "notifier task ended abnormally");
    }

    server_result
}
