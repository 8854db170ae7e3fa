use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};
use weather_core::{Config, QueryService, SqliteSummaryStore, SummaryStore};

use crate::{configure, serve};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-monitor", version, about = "Weather monitoring service")]
pub struct Cli {
    /// Path to the config file; defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the polling pipeline and the HTTP query endpoint.
    Serve,

    /// Interactively write the configuration file.
    Configure,

    /// Print stored daily summaries.
    Summaries {
        /// City name; defaults to the configured default city.
        #[arg(long)]
        city: Option<String>,

        /// Date as YYYY-MM-DD; defaults to today (UTC).
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config_path = self.config.as_deref();

        match self.command {
            Command::Serve => serve::run(config_path).await,
            Command::Configure => configure::run(config_path),
            Command::Summaries { city, date } => {
                let config = Config::load(config_path)?;
                print_summaries(&config, city.as_deref(), date)
            }
        }
    }
}

fn print_summaries(config: &Config, city: Option<&str>, date: Option<NaiveDate>) -> Result<()> {
    let store = SqliteSummaryStore::open(&config.database_path)?;
    store.init()?;

    let query = QueryService::new(Arc::new(store), config.default_city.clone());
    let rows = query.get_summaries(city, date).context("Failed to read daily summaries")?;

    if rows.is_empty() {
        println!("No summaries stored for {}.", city.unwrap_or(query.default_city()));
        return Ok(());
    }

    println!(
        "{:<14} {:<10} {:>8} {:>8} {:>8}  {}",
        "city", "date", "avg", "max", "min", "condition"
    );
    for row in rows {
        println!(
            "{:<14} {:<10} {:>8.2} {:>8.2} {:>8.2}  {}",
            row.city, row.date, row.avg_temp, row.max_temp, row.min_temp, row.dominant_condition
        );
    }

    Ok(())
}
