//! Spending forecast
//!
//! Predicts daily spending from:
//! - The baseline daily average of non-recurring spending
//! - Recurring expenses (same category and amount at a steady interval),
//!   added on the days they are due
//! - A trend adjustment blending short, medium and long windows

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{expenses, Transaction};
use crate::stats;

/// Default forecast horizon in days
pub const DEFAULT_FORECAST_DAYS: u32 = 30;

/// Longest forecast the pipeline will produce
pub const MAX_FORECAST_DAYS: u32 = 366;

/// Occurrences needed before an expense counts as recurring
const RECURRING_MIN_OCCURRENCES: usize = 3;

/// Interval stddev must stay below this fraction of the mean interval
const RECURRING_INTERVAL_CV: f64 = 0.2;

const SHORT_WINDOW_DAYS: usize = 7;
const MEDIUM_WINDOW_DAYS: usize = 30;

/// Confidence never decays below this
const MIN_CONFIDENCE: f64 = 0.5;

/// Mean intervals in this range follow the calendar month
const MONTHLY_INTERVAL_DAYS: std::ops::RangeInclusive<f64> = 28.0..=31.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringExpense {
    pub category: String,
    pub amount: f64,
    pub interval_days: f64,
    pub occurrences: usize,
    pub last_date: NaiveDate,
    pub next_expected: NaiveDate,
}

impl RecurringExpense {
    /// Whether a charge is expected on `date`
    ///
    /// Monthly cadences land on the same day of the month as the last charge
    /// (clamped to short months); other cadences use
    /// `days_since_last % interval < 1`.
    pub fn is_expected_on(&self, date: NaiveDate) -> bool {
        let days_since = (date - self.last_date).num_days();
        if days_since <= 0 {
            return false;
        }

        if MONTHLY_INTERVAL_DAYS.contains(&self.interval_days) {
            let target_day = self.last_date.day().min(days_in_month(date));
            return date.day() == target_day;
        }

        (days_since as f64) % self.interval_days < 1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub expected_amount: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryForecast {
    pub category: String,
    /// Share of historical non-recurring spending (0.0-1.0)
    pub share: f64,
    /// Baseline spending expected over the whole horizon
    pub expected_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingForecast {
    pub daily: Vec<DailyForecast>,
    pub by_category: Vec<CategoryForecast>,
    /// Mean of the daily confidences
    pub confidence: f64,
    pub total_expected: f64,
    pub daily_average: f64,
    /// Coefficient of variation of historical non-recurring daily totals
    pub volatility: f64,
    pub recurring_expenses: Vec<RecurringExpense>,
}

/// Stateless spending forecaster
#[derive(Debug, Default, Clone)]
pub struct PredictionEngine;

impl PredictionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Forecast `forecast_period` days starting today
    pub fn forecast_spending(
        &self,
        transactions: &[Transaction],
        forecast_period: u32,
    ) -> Result<SpendingForecast> {
        self.forecast_spending_from(transactions, forecast_period, Utc::now().date_naive())
    }

    /// Forecast `forecast_period` days starting at `start`
    pub fn forecast_spending_from(
        &self,
        transactions: &[Transaction],
        forecast_period: u32,
        start: NaiveDate,
    ) -> Result<SpendingForecast> {
        if forecast_period == 0 || forecast_period > MAX_FORECAST_DAYS {
            return Err(Error::InvalidData(format!(
                "forecast period must be between 1 and {} days, got {}",
                MAX_FORECAST_DAYS, forecast_period
            )));
        }

        let mut spending = expenses(transactions);
        if spending.is_empty() {
            return Err(Error::NotEnoughData(
                "forecast needs at least one spending transaction".into(),
            ));
        }
        spending.sort_by_key(|t| t.date);

        // Recurring charges are projected on their due dates, so the
        // baseline is built from everything else
        let recurring_expenses = detect_recurring_expenses(&spending);
        let recurring_keys: HashSet<(&str, i64)> = recurring_expenses
            .iter()
            .map(|r| (r.category.as_str(), to_cents(r.amount)))
            .collect();
        let baseline: Vec<&Transaction> = spending
            .iter()
            .copied()
            .filter(|t| !recurring_keys.contains(&(t.category.as_str(), to_cents(t.spend()))))
            .collect();

        let daily_totals = daily_totals(&spending, &baseline);
        let daily_average = stats::mean(&daily_totals).unwrap_or(0.0);
        let volatility = stats::coefficient_of_variation(&daily_totals).unwrap_or(0.0);
        let trend = TrendBlend::new(&daily_totals, daily_average);

        let daily: Vec<DailyForecast> = (0..forecast_period)
            .map(|i| {
                let date = start + Duration::days(i as i64);
                let recurring: f64 = recurring_expenses
                    .iter()
                    .filter(|r| r.is_expected_on(date))
                    .map(|r| r.amount)
                    .sum();

                let expected_amount = daily_average * trend.adjustment(i) + recurring;
                let range = expected_amount * volatility;
                let confidence = (1.0 - i as f64 * volatility / 100.0).max(MIN_CONFIDENCE);

                DailyForecast {
                    date,
                    expected_amount,
                    lower_bound: (expected_amount - range).max(0.0),
                    upper_bound: expected_amount + range,
                    confidence,
                }
            })
            .collect();

        let confidence = stats::mean(&daily.iter().map(|d| d.confidence).collect::<Vec<_>>())
            .unwrap_or(0.0);
        let total_expected = daily.iter().map(|d| d.expected_amount).sum();
        let by_category =
            category_forecast(&baseline, daily_average * forecast_period as f64);

        debug!(
            days = forecast_period,
            baseline = baseline.len(),
            daily_average,
            volatility,
            recurring = recurring_expenses.len(),
            "Spending forecast complete"
        );

        Ok(SpendingForecast {
            daily,
            by_category,
            confidence,
            total_expected,
            daily_average,
            volatility,
            recurring_expenses,
        })
    }
}

/// Relative slopes over the short, medium and full history windows
struct TrendBlend {
    windows: Vec<(f64, f64)>,
}

impl TrendBlend {
    fn new(daily_totals: &[f64], daily_average: f64) -> Self {
        let candidates = [
            (SHORT_WINDOW_DAYS, tail(daily_totals, SHORT_WINDOW_DAYS)),
            (MEDIUM_WINDOW_DAYS, tail(daily_totals, MEDIUM_WINDOW_DAYS)),
            (daily_totals.len(), daily_totals),
        ];

        let windows = candidates
            .iter()
            .filter_map(|(window, values)| {
                let trend = stats::linear_trend(values)?;
                if daily_average <= 0.0 {
                    return None;
                }
                Some((*window as f64, trend.slope / daily_average))
            })
            .collect();

        Self { windows }
    }

    /// Multiplier on the daily average for day `i` of the horizon, in `[0, 2]`
    fn adjustment(&self, i: u32) -> f64 {
        let horizon = i as f64;
        let mut weighted = 0.0;
        let mut total_weight = 0.0;

        for (window, relative_slope) in &self.windows {
            let weight = (1.0 - horizon / window).max(0.0);
            weighted += weight * relative_slope;
            total_weight += weight;
        }

        if total_weight == 0.0 {
            return 1.0;
        }

        (1.0 + (weighted / total_weight) * horizon).clamp(0.0, 2.0)
    }
}

fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// `baseline` spending per calendar day across the whole span of `spending`
/// (sorted by date), zero-filled
fn daily_totals(spending: &[&Transaction], baseline: &[&Transaction]) -> Vec<f64> {
    let (Some(first), Some(last)) = (spending.first(), spending.last()) else {
        return Vec::new();
    };
    let (first, last) = (first.day(), last.day());

    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for tx in baseline {
        *by_day.entry(tx.day()).or_insert(0.0) += tx.spend();
    }

    first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|d| by_day.get(&d).copied().unwrap_or(0.0))
        .collect()
}

/// Group by category and amount (to the cent) and keep steady cadences
fn detect_recurring_expenses(spending: &[&Transaction]) -> Vec<RecurringExpense> {
    let mut groups: BTreeMap<(&str, i64), Vec<NaiveDate>> = BTreeMap::new();
    for tx in spending {
        let cents = to_cents(tx.spend());
        groups
            .entry((tx.category.as_str(), cents))
            .or_default()
            .push(tx.day());
    }

    groups
        .into_iter()
        .filter_map(|((category, cents), dates)| {
            if dates.len() < RECURRING_MIN_OCCURRENCES {
                return None;
            }

            let intervals: Vec<f64> = dates
                .windows(2)
                .map(|w| (w[1] - w[0]).num_days() as f64)
                .collect();
            let mean_interval = stats::mean(&intervals)?;
            if mean_interval <= 0.0 {
                return None;
            }
            if stats::std_dev(&intervals)? >= RECURRING_INTERVAL_CV * mean_interval {
                return None;
            }

            let last_date = *dates.last()?;
            Some(RecurringExpense {
                category: category.to_string(),
                amount: cents as f64 / 100.0,
                interval_days: mean_interval,
                occurrences: dates.len(),
                last_date,
                next_expected: last_date + Duration::days(mean_interval.round() as i64),
            })
        })
        .collect()
}

fn category_forecast(spending: &[&Transaction], horizon_total: f64) -> Vec<CategoryForecast> {
    let total: f64 = spending.iter().map(|t| t.spend()).sum();

    let mut by_category: BTreeMap<&str, f64> = BTreeMap::new();
    for tx in spending {
        *by_category.entry(tx.category.as_str()).or_insert(0.0) += tx.spend();
    }

    let mut forecasts: Vec<CategoryForecast> = by_category
        .into_iter()
        .map(|(category, amount)| {
            let share = if total > 0.0 { amount / total } else { 0.0 };
            CategoryForecast {
                category: category.to_string(),
                share,
                expected_total: horizon_total * share,
            }
        })
        .collect();

    forecasts.sort_by(|a, b| b.share.total_cmp(&a.share));
    forecasts
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}
