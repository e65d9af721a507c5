//! Insights command implementation

use std::path::Path;

use anyhow::{bail, Context, Result};
use finsight_core::{FinancialInsight, InsightsEngine, Severity};

use super::{load_file, print_json, truncate, validate_income};

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Alert => "🚨",
        Severity::Warning => "⚠️ ",
        Severity::Info => "💡",
    }
}

pub async fn cmd_insights(
    file: &Path,
    income: f64,
    limit: usize,
    forecast_days: u32,
    json: bool,
) -> Result<()> {
    validate_income(income)?;
    if limit == 0 {
        bail!("--limit must be at least 1");
    }
    let transactions = load_file(file)?;

    let engine = InsightsEngine::new()
        .with_max_insights(limit)
        .with_forecast_days(forecast_days);
    let insights = engine
        .generate_insights(&transactions, income)
        .await
        .context("Failed to generate insights")?;

    if json {
        return print_json(&insights);
    }

    print_insights(&insights, transactions.len());
    Ok(())
}

fn print_insights(insights: &[FinancialInsight], transaction_count: usize) {
    println!();
    println!("🔎 Financial Insights");
    println!("   Analyzed {} transactions", transaction_count);
    println!("   ─────────────────────────────────────────────────────────────");

    if insights.is_empty() {
        println!("   Nothing notable found. Your spending looks steady!");
        return;
    }

    for (i, insight) in insights.iter().enumerate() {
        println!();
        println!(
            "   {} {}. {} [{}]",
            severity_icon(insight.severity),
            i + 1,
            truncate(&insight.title, 60),
            insight.insight_type
        );
        println!("      {}", insight.description);
        if let Some(value) = insight.value {
            println!("      Amount: ${:.2}", value);
        }
        if let Some(action) = &insight.action {
            println!("      → {}", action);
        }
        println!(
            "      Confidence: {:.0}%  Score: {:.2}",
            insight.confidence * 100.0,
            insight.score()
        );
    }
}
