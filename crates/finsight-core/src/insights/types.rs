//! Core types for the insights engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::TrendDirection;

/// Which engine an insight came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    /// Spending patterns (trends, top categories, recurring charges)
    Pattern,
    /// Unusual transactions or activity
    Anomaly,
    /// Forecasted spending
    Prediction,
    /// Budget allocation adjustments
    Budget,
    /// Savings rate opportunities
    Opportunity,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::Pattern => "pattern",
            InsightType::Anomaly => "anomaly",
            InsightType::Prediction => "prediction",
            InsightType::Budget => "budget",
            InsightType::Opportunity => "opportunity",
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsightType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pattern" => Ok(InsightType::Pattern),
            "anomaly" => Ok(InsightType::Anomaly),
            "prediction" => Ok(InsightType::Prediction),
            "budget" => Ok(InsightType::Budget),
            "opportunity" => Ok(InsightType::Opportunity),
            _ => Err(format!("Unknown insight type: {}", s)),
        }
    }
}

/// Severity level of an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational - no action needed
    Info,
    /// Should be addressed soon
    Warning,
    /// Requires immediate attention
    Alert,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Alert => "alert",
        }
    }

    /// Weight applied to confidence when ranking
    pub fn multiplier(&self) -> f64 {
        match self {
            Severity::Info => 1.0,
            Severity::Warning => 1.2,
            Severity::Alert => 1.5,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "alert" => Ok(Severity::Alert),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

const ACTION_BONUS: f64 = 1.1;
const VALUE_BONUS: f64 = 1.2;
const VALUE_BONUS_THRESHOLD: f64 = 1000.0;

/// A normalized, rankable insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialInsight {
    /// Engine that produced this insight
    pub insight_type: InsightType,
    /// Short title (e.g., "Possible duplicate charge")
    pub title: String,
    /// One or two sentences explaining the finding
    pub description: String,
    pub severity: Severity,
    /// 0.0-1.0
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Dollar amount the insight is about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendDirection>,
    /// Suggested next step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl FinancialInsight {
    pub fn new(
        insight_type: InsightType,
        severity: Severity,
        confidence: f64,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            insight_type,
            title: title.into(),
            description: description.into(),
            severity,
            confidence: confidence.clamp(0.0, 1.0),
            category: None,
            value: None,
            trend: None,
            action: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_trend(mut self, trend: TrendDirection) -> Self {
        self.trend = Some(trend);
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Ranking score: confidence weighted by severity, with bonuses for
    /// actionable and high-value insights
    pub fn score(&self) -> f64 {
        let mut score = self.confidence * self.severity.multiplier();
        if self.action.is_some() {
            score *= ACTION_BONUS;
        }
        if self.value.is_some_and(|v| v > VALUE_BONUS_THRESHOLD) {
            score *= VALUE_BONUS;
        }
        score
    }
}
