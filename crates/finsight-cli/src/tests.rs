//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use tempfile::TempDir;

use crate::cli::{Cli, Commands};
use crate::commands::{self, truncate};

/// Write a small household history and return (dir guard, path)
fn write_transactions(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    (dir, path)
}

fn household_csv() -> &'static str {
    "date,amount,category,merchant
2024-01-01,-1200.00,rent,Oak Street Apartments
2024-01-03,-84.12,groceries,Safeway
2024-01-15,4200.00,salary,Acme Corp
2024-01-31,-1200.00,rent,Oak Street Apartments
2024-02-08,-97.33,groceries,Trader Joes
2024-02-21,-45.10,dining,Luigis
2024-03-01,-1200.00,rent,Oak Street Apartments
2024-03-09,-72.85,groceries,Safeway
2024-03-31,-1200.00,rent,Oak Street Apartments"
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_insights_args() {
    let cli = Cli::try_parse_from([
        "finsight", "--verbose", "insights", "--file", "tx.csv", "--income", "5000", "--json",
    ])
    .unwrap();

    assert!(cli.verbose);
    match cli.command {
        Commands::Insights {
            file,
            income,
            limit,
            json,
        } => {
            assert_eq!(file, PathBuf::from("tx.csv"));
            assert_eq!(income, 5000.0);
            assert_eq!(limit, None);
            assert!(json);
        }
        _ => panic!("expected insights command"),
    }
}

#[test]
fn test_parse_global_config_after_subcommand() {
    let cli = Cli::try_parse_from([
        "finsight", "forecast", "-f", "tx.json", "--days", "7", "--config", "custom.toml",
    ])
    .unwrap();

    assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    assert!(matches!(cli.command, Commands::Forecast { days: Some(7), .. }));
}

#[test]
fn test_parse_requires_income() {
    assert!(Cli::try_parse_from(["finsight", "budget", "--file", "tx.csv"]).is_err());
}

// ========== Command Tests ==========

#[test]
fn test_cmd_patterns() {
    let (_dir, path) = write_transactions("tx.csv", household_csv());
    assert!(commands::cmd_patterns(&path, false).is_ok());
    assert!(commands::cmd_patterns(&path, true).is_ok());
}

#[test]
fn test_cmd_anomalies() {
    let (_dir, path) = write_transactions("tx.csv", household_csv());
    assert!(commands::cmd_anomalies(&path, false).is_ok());
}

#[test]
fn test_cmd_forecast() {
    let (_dir, path) = write_transactions("tx.csv", household_csv());
    assert!(commands::cmd_forecast(&path, 10, false).is_ok());
}

#[test]
fn test_cmd_forecast_rejects_out_of_range_days() {
    let (_dir, path) = write_transactions("tx.csv", household_csv());
    for days in [0, 367, 4_000_000_000] {
        let err = commands::cmd_forecast(&path, days, false).unwrap_err();
        assert!(format!("{:#}", err).contains("forecast period"));
    }
}

#[test]
fn test_cmd_forecast_empty_file_fails() {
    let (_dir, path) = write_transactions("empty.csv", "date,amount,category\n");
    let err = commands::cmd_forecast(&path, 10, false).unwrap_err();
    assert!(err.to_string().contains("forecast"));
}

#[test]
fn test_cmd_budget() {
    let (_dir, path) = write_transactions("tx.csv", household_csv());
    assert!(commands::cmd_budget(&path, 4200.0, false).is_ok());
    for income in [0.0, -100.0, f64::NAN] {
        let err = commands::cmd_budget(&path, income, false).unwrap_err();
        assert!(err.to_string().contains("--income"));
    }
}

#[tokio::test]
async fn test_cmd_insights_rejects_invalid_income_and_limit() {
    let (_dir, path) = write_transactions("tx.csv", household_csv());
    for income in [0.0, -4200.0] {
        let err = commands::cmd_insights(&path, income, 5, 30, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--income"));
    }

    let err = commands::cmd_insights(&path, 4200.0, 0, 30, false)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("--limit"));
}

#[test]
fn test_cmd_anomalies_with_duplicate_charge() {
    let csv = "date,amount,category
2024-02-01 09:00:00,-89.99,electronics
2024-02-01 09:02:00,-89.99,electronics";
    let (_dir, path) = write_transactions("dup.csv", csv);
    assert!(commands::cmd_anomalies(&path, false).is_ok());
    assert!(commands::cmd_anomalies(&path, true).is_ok());
}

#[tokio::test]
async fn test_cmd_insights_json() {
    let json = r#"[
        {"id": "a", "amount": -1200, "category": "rent", "date": "2024-01-01T00:00:00Z"},
        {"id": "b", "amount": -1200, "category": "rent", "date": "2024-01-31T00:00:00Z"},
        {"id": "c", "amount": -64.5, "category": "groceries", "date": "2024-01-12T18:30:00Z"}
    ]"#;
    let (_dir, path) = write_transactions("tx.json", json);
    assert!(commands::cmd_insights(&path, 3000.0, 5, 30, true).await.is_ok());
    assert!(commands::cmd_insights(&path, 3000.0, 5, 30, false).await.is_ok());
}

#[test]
fn test_load_file_errors() {
    let err = commands::load_file(&PathBuf::from("/nonexistent/tx.csv")).unwrap_err();
    assert!(err.to_string().contains("Failed to load transactions"));

    let (_dir, path) = write_transactions("tx.xlsx", "");
    assert!(commands::load_file(&path).is_err());
}

#[test]
fn test_cmd_config() {
    let (_dir, path) = write_transactions("finsight.toml", "max_insights = 3\n");
    let (config, source) = commands::load_config(Some(path.as_path())).unwrap();
    assert_eq!(config.max_insights, 3);
    assert!(commands::cmd_config(&config, &source).is_ok());

    assert!(commands::load_config(Some(Path::new("/nonexistent.toml"))).is_err());
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a much longer category name", 10), "a much ...");
    assert_eq!(truncate("café crème brûlée", 8), "café ...");
}
