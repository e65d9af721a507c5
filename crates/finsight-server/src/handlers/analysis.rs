//! Analysis handlers
//!
//! Every endpoint takes the transactions inline and runs one engine (or all
//! of them, for insights) on a blocking worker.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::debug;

use crate::{AppError, AppState, MAX_INSIGHTS_LIMIT};
use finsight_core::{
    AnomalyReport, BudgetAnalysis, FinancialInsight, SpendingForecast, SpendingPattern,
    Transaction, MAX_FORECAST_DAYS,
};

/// Request body carrying only transactions
#[derive(Debug, Deserialize)]
pub struct TransactionsRequest {
    pub transactions: Vec<Transaction>,
}

/// Request body for insights
#[derive(Debug, Deserialize)]
pub struct InsightsRequest {
    pub transactions: Vec<Transaction>,
    pub monthly_income: f64,
    /// Maximum insights to return (defaults to the configured max_insights)
    pub limit: Option<usize>,
}

/// Request body for forecasts
#[derive(Debug, Deserialize)]
pub struct ForecastRequest {
    pub transactions: Vec<Transaction>,
    /// Days to forecast (defaults to the server's forecast_days)
    pub days: Option<u32>,
}

/// Request body for budget optimization
#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    pub transactions: Vec<Transaction>,
    pub monthly_income: f64,
}

fn validate_income(monthly_income: f64) -> Result<(), AppError> {
    if !monthly_income.is_finite() || monthly_income <= 0.0 {
        return Err(AppError::bad_request(
            "monthly_income must be a positive number",
        ));
    }
    Ok(())
}

/// POST /api/insights - Ranked insights across all engines
pub async fn generate_insights(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InsightsRequest>,
) -> Result<Json<Vec<FinancialInsight>>, AppError> {
    validate_income(req.monthly_income)?;

    let limit = req.limit.unwrap_or(state.insights.max_insights());
    if limit == 0 || limit > MAX_INSIGHTS_LIMIT {
        return Err(AppError::bad_request(&format!(
            "limit must be between 1 and {}",
            MAX_INSIGHTS_LIMIT
        )));
    }

    let engine = state.insights.clone().with_max_insights(limit);
    let insights = engine
        .generate_insights(&req.transactions, req.monthly_income)
        .await
        .map_err(AppError::from_core)?;

    debug!(
        transactions = req.transactions.len(),
        count = insights.len(),
        "Insights generated"
    );
    Ok(Json(insights))
}

/// POST /api/patterns - Spending patterns
pub async fn detect_patterns(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransactionsRequest>,
) -> Result<Json<SpendingPattern>, AppError> {
    let engines = Arc::clone(&state.engines);
    let pattern = tokio::task::spawn_blocking(move || {
        engines.analytics.detect_spending_patterns(&req.transactions)
    })
    .await?;

    Ok(Json(pattern))
}

/// POST /api/anomalies - Anomaly report
pub async fn detect_anomalies(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransactionsRequest>,
) -> Result<Json<AnomalyReport>, AppError> {
    let engines = Arc::clone(&state.engines);
    let report =
        tokio::task::spawn_blocking(move || engines.anomaly.detect_anomalies(&req.transactions))
            .await?;

    Ok(Json(report))
}

/// POST /api/forecast - Daily spending forecast
pub async fn forecast_spending(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForecastRequest>,
) -> Result<Json<SpendingForecast>, AppError> {
    let days = req.days.unwrap_or(state.config.forecast_days);
    if days == 0 || days > MAX_FORECAST_DAYS {
        return Err(AppError::bad_request(&format!(
            "days must be between 1 and {}",
            MAX_FORECAST_DAYS
        )));
    }

    let engines = Arc::clone(&state.engines);
    let forecast = tokio::task::spawn_blocking(move || {
        engines
            .prediction
            .forecast_spending(&req.transactions, days)
    })
    .await?
    .map_err(AppError::from_core)?;

    Ok(Json(forecast))
}

/// POST /api/budget - 50/30/20 budget analysis
pub async fn optimize_budget(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BudgetRequest>,
) -> Result<Json<BudgetAnalysis>, AppError> {
    validate_income(req.monthly_income)?;

    let engines = Arc::clone(&state.engines);
    let analysis = tokio::task::spawn_blocking(move || {
        engines
            .budget
            .optimize_budget(&req.transactions, req.monthly_income)
    })
    .await?
    .map_err(AppError::from_core)?;

    Ok(Json(analysis))
}
