//! Insights - ranked, human-readable findings
//!
//! The insights engine runs every analysis engine over the same transaction
//! list, converts their typed results into `FinancialInsight`s and returns
//! the most important ones first.
//!
//! ## Insight Types
//!
//! - **Pattern** - monthly trends, top category, recurring charges, seasonality
//! - **Anomaly** - unusual amounts, frequency spikes, pattern breaks, suspicious activity
//! - **Prediction** - projected spending and upcoming recurring payments
//! - **Budget** - allocation adjustments from the 50/30/20 optimizer
//! - **Opportunity** - savings rate below 20%
//!
//! ## Usage
//!
//! ```rust,ignore
//! use finsight_core::insights::InsightsEngine;
//!
//! let engine = InsightsEngine::new().with_max_insights(5);
//! let insights = engine.generate_insights(&transactions, 5000.0).await?;
//! ```

pub mod engine;
pub mod mapping;
pub mod types;

pub use engine::{rank, Engines, InsightsEngine, DEFAULT_MAX_INSIGHTS};
pub use types::{FinancialInsight, InsightType, Severity};
