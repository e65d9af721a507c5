//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Finsight - Spending analytics, anomaly detection and forecasts
#[derive(Parser)]
#[command(name = "finsight")]
#[command(about = "Spending analytics and forecasting for your transaction exports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ~/.local/share/finsight/config/finsight.toml,
    /// then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show ranked insights across all analyses
    Insights {
        /// Transaction file (.csv or .json)
        #[arg(short, long)]
        file: PathBuf,

        /// Monthly take-home income
        #[arg(short, long)]
        income: f64,

        /// Maximum insights to show (defaults to max_insights from config)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show spending trends, top categories and recurring charges
    Patterns {
        /// Transaction file (.csv or .json)
        #[arg(short, long)]
        file: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Flag unusual amounts, spikes, pattern breaks and suspicious activity
    Anomalies {
        /// Transaction file (.csv or .json)
        #[arg(short, long)]
        file: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Forecast daily spending
    Forecast {
        /// Transaction file (.csv or .json)
        #[arg(short, long)]
        file: PathBuf,

        /// Days to forecast (defaults to forecast_days from config)
        #[arg(short, long)]
        days: Option<u32>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Compare spending against a 50/30/20 budget
    Budget {
        /// Transaction file (.csv or .json)
        #[arg(short, long)]
        file: PathBuf,

        /// Monthly take-home income
        #[arg(short, long)]
        income: f64,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP API server
    Serve {
        /// Port to listen on (defaults to server.port from config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to server.host from config)
        #[arg(long)]
        host: Option<String>,
    },

    /// Show the resolved configuration and where it was loaded from
    Config,
}
