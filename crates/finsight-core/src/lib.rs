//! Finsight Core Library
//!
//! Spending analytics for the Finsight personal finance tool:
//! - Pattern detection (temporal trends, categories, recurring charges, seasonality)
//! - Anomaly detection (amount outliers, frequency spikes, pattern breaks, suspicious activity)
//! - Spending forecasts with confidence bands
//! - 50/30/20 budget optimization
//! - Ranked insights combining all of the above
//! - CSV/JSON transaction import and pipeline configuration

pub mod analytics;
pub mod anomaly;
pub mod budget;
pub mod config;
pub mod error;
pub mod forecast;
pub mod import;
pub mod insights;
pub mod models;
pub mod stats;

pub use analytics::{
    AnalyticsEngine, CategoryPattern, PeriodSeries, PeriodTotal, RecurringPattern, Seasonality,
    SpendingPattern, TemporalPattern,
};
pub use anomaly::{
    AmountAnomaly, AnomalyDetector, AnomalyReport, AnomalySeverity, FrequencyAnomaly,
    PatternBreak, SuspiciousActivity, SuspiciousKind,
};
pub use budget::{
    AdjustmentMagnitude, BudgetAdjustment, BudgetAllocation, BudgetAnalysis, BudgetBucket,
    BudgetOptimizer, Recommendation, SavingsSummary,
};
pub use config::{ConfigSource, PipelineConfig, ServerSettings};
pub use error::{Error, Result};
pub use forecast::{
    CategoryForecast, DailyForecast, PredictionEngine, RecurringExpense, SpendingForecast,
    DEFAULT_FORECAST_DAYS, MAX_FORECAST_DAYS,
};
pub use import::{load_transactions, parse_csv, parse_json};
pub use insights::{Engines, FinancialInsight, InsightType, InsightsEngine, Severity};
pub use models::{GeoPoint, Transaction, TransactionKind, TrendDirection};
pub use stats::Trend;
