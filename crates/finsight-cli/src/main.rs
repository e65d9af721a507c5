//! Finsight CLI - Spending analytics and forecasting
//!
//! Usage:
//!   finsight insights --file tx.csv --income 5000   Ranked insights
//!   finsight anomalies --file tx.csv                Unusual activity
//!   finsight forecast --file tx.csv --days 30       Spending forecast
//!   finsight serve --port 3000                      Start HTTP API server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let (config, source) = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Insights {
            file,
            income,
            limit,
            json,
        } => {
            let limit = limit.unwrap_or(config.max_insights);
            commands::cmd_insights(&file, income, limit, config.forecast_days, json).await
        }
        Commands::Patterns { file, json } => commands::cmd_patterns(&file, json),
        Commands::Anomalies { file, json } => commands::cmd_anomalies(&file, json),
        Commands::Forecast { file, days, json } => {
            commands::cmd_forecast(&file, days.unwrap_or(config.forecast_days), json)
        }
        Commands::Budget { file, income, json } => commands::cmd_budget(&file, income, json),
        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            commands::cmd_serve(&config, &host, port).await
        }
        Commands::Config => commands::cmd_config(&config, &source),
    }
}
