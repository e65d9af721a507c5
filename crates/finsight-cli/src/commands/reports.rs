//! Report command implementations

use std::path::Path;

use anyhow::{Context, Result};
use finsight_core::{
    AnalyticsEngine, AnomalyDetector, AnomalySeverity, BudgetOptimizer, PeriodSeries,
    PredictionEngine, Trend,
};

use super::{load_file, print_json, truncate, validate_income};

fn describe_trend(trend: Option<&Trend>) -> String {
    match trend {
        Some(t) => format!("{} ({:+.2}/period, r² {:.2})", t.direction, t.slope, t.r_squared),
        None => "n/a".to_string(),
    }
}

fn print_series(label: &str, series: &PeriodSeries) {
    println!(
        "   {:8} {:>4} buckets  trend: {}",
        label,
        series.buckets.len(),
        describe_trend(series.trend.as_ref())
    );
}

fn severity_icon(severity: AnomalySeverity) -> &'static str {
    match severity {
        AnomalySeverity::High => "🔴",
        AnomalySeverity::Medium => "🟠",
        AnomalySeverity::Low => "🟡",
    }
}

pub fn cmd_patterns(file: &Path, json: bool) -> Result<()> {
    let transactions = load_file(file)?;
    let pattern = AnalyticsEngine::new().detect_spending_patterns(&transactions);

    if json {
        return print_json(&pattern);
    }

    println!();
    println!("📊 Spending Patterns");
    println!("   ─────────────────────────────────────────────────────────────");
    print_series("Daily", &pattern.temporal.daily);
    print_series("Weekly", &pattern.temporal.weekly);
    print_series("Monthly", &pattern.temporal.monthly);

    if pattern.categories.is_empty() {
        println!();
        println!("   No spending found.");
        return Ok(());
    }

    println!();
    println!(
        "   {:20} │ {:>10} │ {:>8} │ {:>5} │ {:>7}",
        "Category", "Total", "Average", "Count", "Per day"
    );
    println!("   ─────────────────────┼────────────┼──────────┼───────┼─────────");
    for cat in &pattern.categories {
        println!(
            "   {:20} │ {:>10.2} │ {:>8.2} │ {:>5} │ {:>7.2}",
            truncate(&cat.category, 20),
            cat.total,
            cat.average,
            cat.count,
            cat.frequency
        );
    }

    if !pattern.recurring.is_empty() {
        println!();
        println!("   🔁 Recurring");
        for r in &pattern.recurring {
            println!(
                "      {} {} ${:.2} every {:.0} days ({} times, next {})",
                r.category,
                r.merchant.as_deref().unwrap_or(""),
                r.amount,
                r.interval_days,
                r.occurrences,
                r.next_expected.format("%Y-%m-%d")
            );
        }
    }

    println!();
    match pattern.seasonality.correlation {
        Some(c) if pattern.seasonality.exists => {
            println!("   🌦  Seasonal pattern detected (correlation {:.2})", c)
        }
        Some(c) => println!("   No seasonal pattern (correlation {:.2})", c),
        None => println!("   Not enough history for seasonality (needs 12 months)"),
    }

    Ok(())
}

pub fn cmd_anomalies(file: &Path, json: bool) -> Result<()> {
    let transactions = load_file(file)?;
    let report = AnomalyDetector::new().detect_anomalies(&transactions);

    if json {
        return print_json(&report);
    }

    println!();
    println!("🔍 Anomaly Report");
    println!("   ─────────────────────────────────────────────────────────────");

    if report.is_empty() {
        println!("   ✅ No anomalies detected.");
        return Ok(());
    }

    let sections: [(&str, Vec<(AnomalySeverity, String)>); 4] = [
        (
            "Unusual amounts",
            report
                .amount_anomalies
                .iter()
                .map(|a| (a.severity, a.reason.clone()))
                .collect(),
        ),
        (
            "Frequency spikes",
            report
                .frequency_anomalies
                .iter()
                .map(|a| (a.severity, a.reason.clone()))
                .collect(),
        ),
        (
            "Pattern breaks",
            report
                .pattern_breaks
                .iter()
                .map(|a| (a.severity, a.reason.clone()))
                .collect(),
        ),
        (
            "Suspicious activity",
            report
                .suspicious_activity
                .iter()
                .map(|a| (a.severity, format!("[{}] {}", a.kind.as_str(), a.reason)))
                .collect(),
        ),
    ];

    for (title, items) in &sections {
        if items.is_empty() {
            continue;
        }
        println!();
        println!("   {} ({})", title, items.len());
        for (severity, reason) in items {
            println!("      {} {}", severity_icon(*severity), reason);
        }
    }

    println!();
    println!("⚠️  {} anomalies found.", report.total());
    Ok(())
}

pub fn cmd_forecast(file: &Path, days: u32, json: bool) -> Result<()> {
    let transactions = load_file(file)?;
    let forecast = PredictionEngine::new()
        .forecast_spending(&transactions, days)
        .context("Failed to forecast spending")?;

    if json {
        return print_json(&forecast);
    }

    println!();
    println!("🔮 Spending Forecast ({} days)", days);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Expected total: ${:.2}", forecast.total_expected);
    println!("   Daily average:  ${:.2}", forecast.daily_average);
    println!("   Volatility:     {:.2}", forecast.volatility);
    println!("   Confidence:     {:.0}%", forecast.confidence * 100.0);

    println!();
    println!(
        "   {:10} │ {:>9} │ {:>9} │ {:>9} │ {:>5}",
        "Date", "Expected", "Low", "High", "Conf"
    );
    println!("   ───────────┼───────────┼───────────┼───────────┼──────");
    for day in &forecast.daily {
        println!(
            "   {:10} │ {:>9.2} │ {:>9.2} │ {:>9.2} │ {:>4.0}%",
            day.date.format("%Y-%m-%d"),
            day.expected_amount,
            day.lower_bound,
            day.upper_bound,
            day.confidence * 100.0
        );
    }

    if !forecast.by_category.is_empty() {
        println!();
        println!("   By category");
        for cat in &forecast.by_category {
            println!(
                "      {:20} {:>5.1}%  ${:.2}",
                truncate(&cat.category, 20),
                cat.share * 100.0,
                cat.expected_total
            );
        }
    }

    if !forecast.recurring_expenses.is_empty() {
        println!();
        println!("   🔁 Recurring expenses");
        for r in &forecast.recurring_expenses {
            println!(
                "      {} ${:.2} every {:.0} days (next {})",
                r.category,
                r.amount,
                r.interval_days,
                r.next_expected.format("%Y-%m-%d")
            );
        }
    }

    Ok(())
}

pub fn cmd_budget(file: &Path, income: f64, json: bool) -> Result<()> {
    validate_income(income)?;
    let transactions = load_file(file)?;
    let analysis = BudgetOptimizer::new()
        .optimize_budget(&transactions, income)
        .context("Failed to optimize budget")?;

    if json {
        return print_json(&analysis);
    }

    println!();
    println!("💰 Budget (50/30/20) for ${:.2}/month", analysis.monthly_income);
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:16} │ {:>13} │ {:>10} │ {:>10}",
        "Category", "Bucket", "Optimal", "Current"
    );
    println!("   ─────────────────┼───────────────┼────────────┼────────────");
    for a in &analysis.allocations {
        println!(
            "   {:16} │ {:>13} │ {:>10.2} │ {:>10.2}",
            a.category,
            a.bucket.as_str(),
            a.amount,
            a.current
        );
    }

    println!();
    println!(
        "   Savings: ${:.2} of ${:.2} target (potential ${:.2})",
        analysis.savings.current, analysis.savings.target, analysis.savings.potential
    );

    if !analysis.recommendations.is_empty() {
        println!();
        println!("   📋 Recommendations");
        for r in &analysis.recommendations {
            println!("      {}. {}", r.priority, r.message);
        }
    }

    Ok(())
}
