//! Insights engine - fans out to the analysis engines and ranks their output

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::{spawn_blocking, JoinError};
use tracing::{debug, info, warn};

use crate::analytics::AnalyticsEngine;
use crate::anomaly::AnomalyDetector;
use crate::budget::{average_monthly_spending, BudgetOptimizer};
use crate::error::{Error, Result};
use crate::forecast::{PredictionEngine, DEFAULT_FORECAST_DAYS};
use crate::models::Transaction;

use super::mapping;
use super::types::FinancialInsight;

pub const DEFAULT_MAX_INSIGHTS: usize = 10;

/// The analysis engines an `InsightsEngine` runs
#[derive(Debug, Default, Clone)]
pub struct Engines {
    pub analytics: AnalyticsEngine,
    pub anomaly: AnomalyDetector,
    pub prediction: PredictionEngine,
    pub budget: BudgetOptimizer,
}

/// Runs every engine over one transaction list and returns ranked insights
#[derive(Debug, Clone)]
pub struct InsightsEngine {
    engines: Arc<Engines>,
    max_insights: usize,
    forecast_days: u32,
}

impl Default for InsightsEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn task_error(engine: &str, e: JoinError) -> Error {
    Error::Task(format!("{} engine task failed: {}", engine, e))
}

/// Log an engine failure and drop its insights
fn skip_failed<T>(engine: &'static str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(engine, error = %e, "Engine failed, skipping its insights");
            None
        }
    }
}

impl InsightsEngine {
    pub fn new() -> Self {
        Self::with_engines(Arc::new(Engines::default()))
    }

    /// Share a set of engines across several insights engines
    pub fn with_engines(engines: Arc<Engines>) -> Self {
        Self {
            engines,
            max_insights: DEFAULT_MAX_INSIGHTS,
            forecast_days: DEFAULT_FORECAST_DAYS,
        }
    }

    pub fn with_max_insights(mut self, max_insights: usize) -> Self {
        self.max_insights = max_insights;
        self
    }

    pub fn with_forecast_days(mut self, forecast_days: u32) -> Self {
        self.forecast_days = forecast_days;
        self
    }

    pub fn max_insights(&self) -> usize {
        self.max_insights
    }

    pub async fn generate_insights(
        &self,
        transactions: &[Transaction],
        monthly_income: f64,
    ) -> Result<Vec<FinancialInsight>> {
        self.generate_insights_at(transactions, monthly_income, Utc::now())
            .await
    }

    /// Generate insights relative to `now`
    ///
    /// The four engines run concurrently on blocking worker threads. An
    /// engine that returns an error is logged and skipped; a panicked
    /// engine task fails the whole call with `Error::Task`.
    pub async fn generate_insights_at(
        &self,
        transactions: &[Transaction],
        monthly_income: f64,
        now: DateTime<Utc>,
    ) -> Result<Vec<FinancialInsight>> {
        let shared: Arc<[Transaction]> = Arc::from(transactions);
        let forecast_days = self.forecast_days;

        let patterns = {
            let (engines, txs) = (Arc::clone(&self.engines), Arc::clone(&shared));
            spawn_blocking(move || engines.analytics.detect_spending_patterns(&txs))
        };
        let anomalies = {
            let (engines, txs) = (Arc::clone(&self.engines), Arc::clone(&shared));
            spawn_blocking(move || engines.anomaly.detect_anomalies_at(&txs, now))
        };
        let forecast = {
            let (engines, txs) = (Arc::clone(&self.engines), Arc::clone(&shared));
            spawn_blocking(move || {
                engines
                    .prediction
                    .forecast_spending_from(&txs, forecast_days, now.date_naive())
            })
        };
        let budget = {
            let (engines, txs) = (Arc::clone(&self.engines), Arc::clone(&shared));
            spawn_blocking(move || engines.budget.optimize_budget(&txs, monthly_income))
        };

        let (patterns, anomalies, forecast, budget) =
            tokio::join!(patterns, anomalies, forecast, budget);

        let patterns = patterns.map_err(|e| task_error("analytics", e))?;
        let anomalies = anomalies.map_err(|e| task_error("anomaly", e))?;
        let forecast = skip_failed("prediction", forecast.map_err(|e| task_error("prediction", e))?);
        let budget = skip_failed("budget", budget.map_err(|e| task_error("budget", e))?);

        // Engine order doubles as the tie-break order when ranking
        let mut insights = mapping::pattern_insights(&patterns);
        insights.extend(mapping::anomaly_insights(&anomalies));
        if let Some(forecast) = &forecast {
            insights.extend(mapping::prediction_insights(forecast, monthly_income));
        }
        if let Some(budget) = &budget {
            insights.extend(mapping::budget_insights(budget));
        }
        if let Some(opportunity) =
            mapping::opportunity_insight(monthly_income, average_monthly_spending(&shared))
        {
            insights.push(opportunity);
        }

        debug!(
            candidates = insights.len(),
            anomalies = anomalies.total(),
            "Insight candidates collected"
        );

        let ranked = rank(insights, self.max_insights);
        info!(
            transactions = shared.len(),
            insights = ranked.len(),
            "Insight generation complete"
        );
        Ok(ranked)
    }
}

/// Sort by score (highest first) and keep the top `limit`
///
/// The sort is stable, so equal scores keep their generation order.
pub fn rank(mut insights: Vec<FinancialInsight>, limit: usize) -> Vec<FinancialInsight> {
    insights.sort_by(|a, b| b.score().total_cmp(&a.score()));
    insights.truncate(limit);
    insights
}
