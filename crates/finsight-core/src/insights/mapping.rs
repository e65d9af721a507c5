//! Converts typed engine output into `FinancialInsight`s

use crate::analytics::SpendingPattern;
use crate::anomaly::{AnomalyReport, AnomalySeverity, SuspiciousKind};
use crate::budget::{capitalize, AdjustmentMagnitude, BudgetAnalysis, BudgetBucket};
use crate::forecast::SpendingForecast;
use crate::models::TrendDirection;

use super::types::{FinancialInsight, InsightType, Severity};

/// Monthly trends weaker than this (relative to the average) are not reported
const MIN_TREND_STRENGTH: f64 = 0.05;
const STRONG_TREND_STRENGTH: f64 = 0.10;

pub const TARGET_SAVINGS_RATE: f64 = 0.20;

fn anomaly_severity(severity: AnomalySeverity) -> Severity {
    match severity {
        AnomalySeverity::High => Severity::Alert,
        AnomalySeverity::Medium => Severity::Warning,
        AnomalySeverity::Low => Severity::Info,
    }
}

pub fn pattern_insights(pattern: &SpendingPattern) -> Vec<FinancialInsight> {
    let mut insights = Vec::new();

    if let Some(trend) = &pattern.temporal.monthly.trend {
        if trend.direction != TrendDirection::Stable && trend.strength > MIN_TREND_STRENGTH {
            let rising = trend.direction == TrendDirection::Increasing;
            let severity = if rising && trend.strength > STRONG_TREND_STRENGTH {
                Severity::Warning
            } else {
                Severity::Info
            };
            let mut insight = FinancialInsight::new(
                InsightType::Pattern,
                severity,
                trend.r_squared,
                format!("Monthly spending is {}", trend.direction),
                format!(
                    "Spending moves by about ${:.0} per month ({:.0}% of the monthly average)",
                    trend.slope.abs(),
                    trend.strength * 100.0
                ),
            )
            .with_trend(trend.direction)
            .with_value(trend.slope.abs());
            if rising {
                insight = insight.with_action("Review the categories driving the increase");
            }
            insights.push(insight);
        }
    }

    let total: f64 = pattern.categories.iter().map(|c| c.total).sum();
    if let Some(top) = pattern.categories.first() {
        if total > 0.0 {
            let mut insight = FinancialInsight::new(
                InsightType::Pattern,
                Severity::Info,
                0.9,
                format!("Top spending category: {}", top.category),
                format!(
                    "{} accounts for ${:.2} ({:.0}% of spending) across {} transactions",
                    top.category,
                    top.total,
                    top.total / total * 100.0,
                    top.count
                ),
            )
            .with_category(&top.category)
            .with_value(top.total);
            if let Some(trend) = &top.trend {
                insight = insight.with_trend(trend.direction);
            }
            insights.push(insight);
        }
    }

    for recurring in &pattern.recurring {
        let payee = recurring
            .merchant
            .as_deref()
            .map(|m| format!(" at {}", m))
            .unwrap_or_default();
        insights.push(
            FinancialInsight::new(
                InsightType::Pattern,
                Severity::Info,
                recurring.confidence,
                format!("Recurring {} payment", recurring.category),
                format!(
                    "${:.2}{} roughly every {:.0} days; next expected {}",
                    recurring.amount,
                    payee,
                    recurring.interval_days,
                    recurring.next_expected.format("%Y-%m-%d")
                ),
            )
            .with_category(&recurring.category)
            .with_value(recurring.amount)
            .with_action("Confirm this recurring charge is still needed"),
        );
    }

    if pattern.seasonality.exists {
        insights.push(FinancialInsight::new(
            InsightType::Pattern,
            Severity::Info,
            pattern.seasonality.correlation.unwrap_or(0.0),
            "Seasonal spending pattern",
            format!(
                "Spending in the last {} months tracks the {} months before it",
                pattern.seasonality.segment_months, pattern.seasonality.segment_months
            ),
        ));
    }

    insights
}

pub fn anomaly_insights(report: &AnomalyReport) -> Vec<FinancialInsight> {
    let mut insights = Vec::new();

    for anomaly in &report.amount_anomalies {
        insights.push(
            FinancialInsight::new(
                InsightType::Anomaly,
                anomaly_severity(anomaly.severity),
                (anomaly.z_score / 5.0).min(1.0),
                format!("Unusual {} transaction", anomaly.category),
                &anomaly.reason,
            )
            .with_category(&anomaly.category)
            .with_value(anomaly.amount)
            .with_action("Verify this transaction"),
        );
    }

    for spike in &report.frequency_anomalies {
        let ratio = if spike.expected_daily > 0.0 {
            spike.count as f64 / spike.expected_daily
        } else {
            1.0
        };
        insights.push(
            FinancialInsight::new(
                InsightType::Anomaly,
                anomaly_severity(spike.severity),
                (1.0 - 1.0 / ratio).clamp(0.5, 0.95),
                format!("Spike in {} transactions", spike.category),
                &spike.reason,
            )
            .with_category(&spike.category),
        );
    }

    for brk in &report.pattern_breaks {
        insights.push(
            FinancialInsight::new(
                InsightType::Anomaly,
                anomaly_severity(brk.severity),
                (0.5 + brk.deviation / 2.0).min(0.95),
                format!("{} spending broke its usual pattern", capitalize(&brk.category)),
                &brk.reason,
            )
            .with_category(&brk.category)
            .with_value(brk.amount),
        );
    }

    for activity in &report.suspicious_activity {
        let (title, confidence, action) = match activity.kind {
            SuspiciousKind::RapidSuccession => (
                "Possible duplicate charge",
                0.8,
                "Check whether you were charged twice",
            ),
            SuspiciousKind::UnusualLocation => (
                "Transaction in an unusual location",
                0.6,
                "Confirm you made this purchase",
            ),
        };
        insights.push(
            FinancialInsight::new(
                InsightType::Anomaly,
                anomaly_severity(activity.severity),
                confidence,
                title,
                &activity.reason,
            )
            .with_category(&activity.category)
            .with_action(action),
        );
    }

    insights
}

pub fn prediction_insights(forecast: &SpendingForecast, monthly_income: f64) -> Vec<FinancialInsight> {
    let mut insights = Vec::new();
    let (Some(first), Some(last)) = (forecast.daily.first(), forecast.daily.last()) else {
        return insights;
    };

    let days = forecast.daily.len() as f64;
    let monthly_projection = forecast.total_expected * 30.0 / days;
    let over_income = monthly_income.is_finite()
        && monthly_income > 0.0
        && monthly_projection > monthly_income;

    let mut summary = FinancialInsight::new(
        InsightType::Prediction,
        if over_income {
            Severity::Warning
        } else {
            Severity::Info
        },
        forecast.confidence,
        format!("Projected spending for the next {} days", forecast.daily.len()),
        format!(
            "About ${:.0} expected (${:.0}/day on average)",
            forecast.total_expected, forecast.daily_average
        ),
    )
    .with_value(forecast.total_expected);
    if over_income {
        summary = summary.with_action(format!(
            "Projected ${:.0}/month exceeds income of ${:.0}; cut back before the month ends",
            monthly_projection, monthly_income
        ));
    }
    insights.push(summary);

    for recurring in &forecast.recurring_expenses {
        if recurring.next_expected < first.date || recurring.next_expected > last.date {
            continue;
        }
        insights.push(
            FinancialInsight::new(
                InsightType::Prediction,
                Severity::Info,
                forecast.confidence,
                format!("Upcoming {} payment", recurring.category),
                format!(
                    "${:.2} expected on {}",
                    recurring.amount,
                    recurring.next_expected.format("%Y-%m-%d")
                ),
            )
            .with_category(&recurring.category)
            .with_value(recurring.amount),
        );
    }

    insights
}

pub fn budget_insights(analysis: &BudgetAnalysis) -> Vec<FinancialInsight> {
    analysis
        .adjustments
        .iter()
        .map(|adjustment| {
            let amount = adjustment.delta.abs();
            let confidence = match adjustment.magnitude {
                AdjustmentMagnitude::Significant => 0.9,
                AdjustmentMagnitude::Moderate => 0.8,
                AdjustmentMagnitude::Minor => 0.7,
            };

            let (severity, title, action) = if adjustment.is_overspend() {
                let severity = match adjustment.magnitude {
                    AdjustmentMagnitude::Significant => Severity::Alert,
                    AdjustmentMagnitude::Moderate => Severity::Warning,
                    AdjustmentMagnitude::Minor => Severity::Info,
                };
                (
                    severity,
                    format!("{} over budget", capitalize(&adjustment.category)),
                    format!(
                        "Reduce {} spending by ${:.0}/month",
                        adjustment.category, amount
                    ),
                )
            } else if adjustment.bucket == BudgetBucket::Savings {
                let severity = if adjustment.magnitude == AdjustmentMagnitude::Significant {
                    Severity::Warning
                } else {
                    Severity::Info
                };
                (
                    severity,
                    "Savings below target".to_string(),
                    format!("Increase monthly savings by ${:.0}", amount),
                )
            } else {
                (
                    Severity::Info,
                    format!("{} under budget", capitalize(&adjustment.category)),
                    format!(
                        "Move ${:.0}/month of unused {} budget to savings",
                        amount, adjustment.category
                    ),
                )
            };

            FinancialInsight::new(
                InsightType::Budget,
                severity,
                confidence,
                title,
                &adjustment.reason,
            )
            .with_category(&adjustment.category)
            .with_value(amount)
            .with_action(action)
        })
        .collect()
}

/// Flags a savings rate below 20% of income
pub fn opportunity_insight(monthly_income: f64, monthly_spending: f64) -> Option<FinancialInsight> {
    if !monthly_income.is_finite() || monthly_income <= 0.0 {
        return None;
    }

    let rate = (monthly_income - monthly_spending) / monthly_income;
    if rate >= TARGET_SAVINGS_RATE {
        return None;
    }

    let severity = if rate < 0.0 {
        Severity::Alert
    } else if rate < TARGET_SAVINGS_RATE / 2.0 {
        Severity::Warning
    } else {
        Severity::Info
    };
    let gap = monthly_income * TARGET_SAVINGS_RATE - (monthly_income - monthly_spending);

    Some(
        FinancialInsight::new(
            InsightType::Opportunity,
            severity,
            0.85,
            "Savings rate below 20%",
            format!(
                "You keep {:.0}% of your ${:.0} monthly income after ${:.0} of spending",
                rate * 100.0,
                monthly_income,
                monthly_spending
            ),
        )
        .with_value(gap)
        .with_action(format!(
            "Set aside ${:.0} more each month to reach a 20% savings rate",
            gap
        )),
    )
}
