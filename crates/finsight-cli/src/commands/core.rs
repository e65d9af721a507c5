//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `load_config` - Resolve the pipeline config
//! - `load_file` - Load transactions from a CSV/JSON file
//! - `validate_income` - Reject non-positive `--income` values
//! - `print_json` - Machine-readable output for `--json`
//! - `cmd_config` - Show the resolved config

use std::path::Path;

use anyhow::{bail, Context, Result};
use finsight_core::config::default_config_path;
use finsight_core::{load_transactions, ConfigSource, PipelineConfig, Transaction};
use serde::Serialize;

pub fn load_config(path: Option<&Path>) -> Result<(PipelineConfig, ConfigSource)> {
    PipelineConfig::load(path).context("Failed to load configuration")
}

pub fn load_file(path: &Path) -> Result<Vec<Transaction>> {
    let transactions = load_transactions(path)
        .with_context(|| format!("Failed to load transactions from {}", path.display()))?;
    tracing::debug!(count = transactions.len(), "Transactions loaded");
    Ok(transactions)
}

pub fn validate_income(income: f64) -> Result<()> {
    if !income.is_finite() || income <= 0.0 {
        bail!("--income must be a positive amount, got {}", income);
    }
    Ok(())
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

pub fn cmd_config(config: &PipelineConfig, source: &ConfigSource) -> Result<()> {
    println!("⚙️  Configuration");
    println!("   Source: {}", source);
    if let Some(path) = default_config_path() {
        println!("   Override path: {}", path.display());
    }
    println!("   ─────────────────────────────");
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}
