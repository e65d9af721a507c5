//! Spending pattern analytics
//!
//! Detects:
//! - Temporal trends: spending per day, week and month with a fitted trend
//! - Category statistics: totals, averages, trend and frequency per category
//! - Recurring transactions: same amount/category/merchant at regular intervals
//! - Seasonality: whether one half of the monthly history echoes the other

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{expenses, Transaction};
use crate::stats::{self, Trend};

/// Amounts closer than this are considered identical
const AMOUNT_MATCH_TOLERANCE: f64 = 0.005;

/// Interval stddev must stay below this fraction of the mean interval
const RECURRING_INTERVAL_CV: f64 = 0.1;

/// Minimum later matches (beyond the first occurrence) for a recurring chain
const RECURRING_MIN_MATCHES: usize = 2;

/// Monthly data points needed before seasonality is evaluated
const SEASONALITY_MIN_MONTHS: usize = 12;

/// Correlation above which the halves are considered seasonal
const SEASONALITY_THRESHOLD: f64 = 0.6;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Everything the analytics engine derives from one transaction list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingPattern {
    pub temporal: TemporalPattern,
    pub categories: Vec<CategoryPattern>,
    pub recurring: Vec<RecurringPattern>,
    pub seasonality: Seasonality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalPattern {
    pub daily: PeriodSeries,
    pub weekly: PeriodSeries,
    pub monthly: PeriodSeries,
}

/// Spending totals at one bucket resolution, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSeries {
    pub buckets: Vec<PeriodTotal>,
    /// Absent with fewer than two buckets
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotal {
    /// Bucket key: `2024-03-15`, `2024-W11` or `2024-03`
    pub period: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPattern {
    pub category: String,
    pub total: f64,
    pub average: f64,
    pub count: usize,
    pub trend: Option<Trend>,
    /// Transactions per day over the category's own date range
    pub frequency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringPattern {
    pub category: String,
    pub merchant: Option<String>,
    pub amount: f64,
    pub interval_days: f64,
    pub occurrences: usize,
    /// `1 - stddev/mean` of the intervals
    pub confidence: f64,
    pub last_date: DateTime<Utc>,
    pub next_expected: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    pub exists: bool,
    /// Correlation between the two halves of the monthly history
    pub correlation: Option<f64>,
    /// Length of each compared half (0 when not evaluated)
    pub segment_months: usize,
}

/// Stateless spending pattern detector
#[derive(Debug, Default, Clone)]
pub struct AnalyticsEngine;

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run all pattern detectors over one transaction list
    pub fn detect_spending_patterns(&self, transactions: &[Transaction]) -> SpendingPattern {
        let spending = expenses(transactions);

        let pattern = SpendingPattern {
            temporal: self.temporal_patterns(&spending),
            categories: self.category_patterns(&spending),
            recurring: self.recurring_patterns(transactions),
            seasonality: self.seasonality(&spending),
        };

        debug!(
            transactions = transactions.len(),
            categories = pattern.categories.len(),
            recurring = pattern.recurring.len(),
            seasonal = pattern.seasonality.exists,
            "Spending pattern detection complete"
        );

        pattern
    }

    fn temporal_patterns(&self, spending: &[&Transaction]) -> TemporalPattern {
        TemporalPattern {
            daily: period_series(bucket_by(spending, |d| d), |d| {
                d.format("%Y-%m-%d").to_string()
            }),
            weekly: period_series(bucket_by(spending, week_start), |d| {
                d.format("%G-W%V").to_string()
            }),
            monthly: period_series(bucket_by(spending, month_start), |d| {
                d.format("%Y-%m").to_string()
            }),
        }
    }

    fn category_patterns(&self, spending: &[&Transaction]) -> Vec<CategoryPattern> {
        let mut by_category: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        for &tx in spending {
            by_category.entry(tx.category.as_str()).or_default().push(tx);
        }

        let mut patterns: Vec<CategoryPattern> = by_category
            .into_iter()
            .map(|(category, mut txs)| {
                txs.sort_by_key(|t| t.date);
                let amounts: Vec<f64> = txs.iter().map(|t| t.spend()).collect();
                let total: f64 = amounts.iter().sum();

                let first = txs[0].date;
                let last = txs[txs.len() - 1].date;
                let range_days = ((last - first).num_seconds() as f64 / SECONDS_PER_DAY).max(1.0);

                CategoryPattern {
                    category: category.to_string(),
                    total,
                    average: total / amounts.len() as f64,
                    count: amounts.len(),
                    trend: stats::linear_trend(&amounts),
                    frequency: amounts.len() as f64 / range_days,
                }
            })
            .collect();

        patterns.sort_by(|a, b| b.total.total_cmp(&a.total));
        patterns
    }

    fn recurring_patterns(&self, transactions: &[Transaction]) -> Vec<RecurringPattern> {
        let mut sorted: Vec<&Transaction> = transactions.iter().collect();
        sorted.sort_by_key(|t| t.date);

        let mut claimed = vec![false; sorted.len()];
        let mut patterns = Vec::new();

        for i in 0..sorted.len() {
            if claimed[i] {
                continue;
            }
            let anchor = sorted[i];

            let chain: Vec<usize> = std::iter::once(i)
                .chain((i + 1..sorted.len()).filter(|&j| {
                    !claimed[j]
                        && (sorted[j].amount - anchor.amount).abs() < AMOUNT_MATCH_TOLERANCE
                        && sorted[j].category == anchor.category
                        && sorted[j].merchant == anchor.merchant
                }))
                .collect();

            if chain.len() < RECURRING_MIN_MATCHES + 1 {
                continue;
            }

            let intervals: Vec<f64> = chain
                .windows(2)
                .map(|w| (sorted[w[1]].date - sorted[w[0]].date).num_seconds() as f64 / SECONDS_PER_DAY)
                .collect();

            let Some(mean_interval) = stats::mean(&intervals) else {
                continue;
            };
            if mean_interval <= 0.0 {
                continue;
            }
            let spread = stats::std_dev(&intervals).unwrap_or(0.0);
            if spread >= RECURRING_INTERVAL_CV * mean_interval {
                continue;
            }

            let last_date = sorted[chain[chain.len() - 1]].date;
            let next_expected =
                last_date + Duration::seconds((mean_interval * SECONDS_PER_DAY).round() as i64);

            patterns.push(RecurringPattern {
                category: anchor.category.clone(),
                merchant: anchor.merchant.clone(),
                amount: anchor.spend(),
                interval_days: mean_interval,
                occurrences: chain.len(),
                confidence: (1.0 - spread / mean_interval).clamp(0.0, 1.0),
                last_date,
                next_expected,
            });

            for idx in chain {
                claimed[idx] = true;
            }
        }

        patterns
    }

    fn seasonality(&self, spending: &[&Transaction]) -> Seasonality {
        let monthly = contiguous_monthly_totals(spending);

        if monthly.len() < SEASONALITY_MIN_MONTHS {
            return Seasonality {
                exists: false,
                correlation: None,
                segment_months: 0,
            };
        }

        let half = monthly.len() / 2;
        let correlation = stats::correlation(&monthly[..half], &monthly[half..half * 2]);

        Seasonality {
            exists: correlation.is_some_and(|c| c > SEASONALITY_THRESHOLD),
            correlation,
            segment_months: half,
        }
    }
}

fn bucket_by(
    spending: &[&Transaction],
    key: impl Fn(NaiveDate) -> NaiveDate,
) -> BTreeMap<NaiveDate, f64> {
    let mut buckets = BTreeMap::new();
    for tx in spending {
        *buckets.entry(key(tx.day())).or_insert(0.0) += tx.spend();
    }
    buckets
}

fn period_series(
    buckets: BTreeMap<NaiveDate, f64>,
    label: impl Fn(NaiveDate) -> String,
) -> PeriodSeries {
    let amounts: Vec<f64> = buckets.values().copied().collect();
    PeriodSeries {
        trend: stats::linear_trend(&amounts),
        buckets: buckets
            .into_iter()
            .map(|(date, amount)| PeriodTotal {
                period: label(date),
                amount,
            })
            .collect(),
    }
}

/// Monday of the ISO week containing `date`
pub(crate) fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// First day of the month containing `date`
pub(crate) fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

/// Monthly totals from the first to the last month with spending, zero-filled
fn contiguous_monthly_totals(spending: &[&Transaction]) -> Vec<f64> {
    let buckets = bucket_by(spending, month_start);
    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Vec::new();
    };

    let mut totals = Vec::new();
    let mut month = first;
    while month <= last {
        totals.push(buckets.get(&month).copied().unwrap_or(0.0));
        month = next_month(month);
    }
    totals
}
