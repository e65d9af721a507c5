//! Budget optimization using the 50/30/20 rule
//!
//! Income is split into essential (50%), discretionary (30%) and savings
//! (20%) buckets, essentials are sub-allocated by fixed ratios, and current
//! monthly spending is compared against each allocation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{expenses, Transaction};

pub const ESSENTIAL_RATIO: f64 = 0.50;
pub const DISCRETIONARY_RATIO: f64 = 0.30;
pub const SAVINGS_RATIO: f64 = 0.20;

/// Shares of the essential budget (sum to 1.0)
const ESSENTIAL_SPLIT: [(&str, f64); 6] = [
    ("housing", 0.35),
    ("utilities", 0.10),
    ("groceries", 0.15),
    ("healthcare", 0.15),
    ("transportation", 0.15),
    ("insurance", 0.10),
];

/// Discretionary budget is split evenly across these
const DISCRETIONARY_CATEGORIES: [&str; 4] = ["entertainment", "dining", "shopping", "hobbies"];

const SAVINGS_CATEGORY: &str = "savings";

/// Deltas at or below this share of the optimal amount are ignored
const ADJUSTMENT_THRESHOLD: f64 = 0.05;

const SIGNIFICANT_THRESHOLD: f64 = 0.20;
const MODERATE_THRESHOLD: f64 = 0.10;

const TOP_RECOMMENDATIONS: usize = 3;

const DAYS_PER_MONTH: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetBucket {
    Essential,
    Discretionary,
    Savings,
}

impl BudgetBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Essential => "essential",
            Self::Discretionary => "discretionary",
            Self::Savings => "savings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentMagnitude {
    Minor,
    Moderate,
    Significant,
}

impl AdjustmentMagnitude {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Significant => "significant",
        }
    }

    fn from_ratio(ratio: f64) -> Self {
        if ratio > SIGNIFICANT_THRESHOLD {
            Self::Significant
        } else if ratio > MODERATE_THRESHOLD {
            Self::Moderate
        } else {
            Self::Minor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub category: String,
    pub bucket: BudgetBucket,
    /// Optimal monthly amount
    pub amount: f64,
    /// Current average monthly spending
    pub current: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAdjustment {
    pub category: String,
    pub bucket: BudgetBucket,
    pub current: f64,
    pub optimal: f64,
    /// `optimal - current`: negative means overspending
    pub delta: f64,
    pub magnitude: AdjustmentMagnitude,
    pub reason: String,
}

impl BudgetAdjustment {
    pub fn is_overspend(&self) -> bool {
        self.delta < 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// 1 = most important
    pub priority: usize,
    pub category: Option<String>,
    pub message: String,
    /// Monthly dollars affected
    pub impact: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsSummary {
    /// Average monthly amount moved to savings categories
    pub current: f64,
    /// 20% of income
    pub target: f64,
    /// Unspent discretionary allocation that could be saved instead
    pub potential: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAnalysis {
    pub monthly_income: f64,
    pub allocations: Vec<BudgetAllocation>,
    pub adjustments: Vec<BudgetAdjustment>,
    pub recommendations: Vec<Recommendation>,
    pub savings: SavingsSummary,
    /// Current monthly spending that maps to a budget category
    pub categorized_spending: f64,
}

impl BudgetAnalysis {
    pub fn total_allocated(&self) -> f64 {
        self.allocations.iter().map(|a| a.amount).sum()
    }

    pub fn bucket_current(&self, bucket: BudgetBucket) -> f64 {
        self.allocations
            .iter()
            .filter(|a| a.bucket == bucket)
            .map(|a| a.current)
            .sum()
    }

    pub fn bucket_budget(&self, bucket: BudgetBucket) -> f64 {
        self.allocations
            .iter()
            .filter(|a| a.bucket == bucket)
            .map(|a| a.amount)
            .sum()
    }
}

/// Map a free-form category name onto a budget category
pub fn budget_category(raw: &str) -> Option<&'static str> {
    let name = raw.trim().to_lowercase();
    let category = match name.as_str() {
        "housing" | "rent" | "mortgage" | "home" | "hoa" => "housing",
        "utilities" | "utility" | "electricity" | "electric" | "water" | "internet" | "phone"
        | "mobile" => "utilities",
        "groceries" | "grocery" | "supermarket" => "groceries",
        "healthcare" | "health" | "medical" | "pharmacy" | "doctor" | "dental" => "healthcare",
        "transportation" | "transport" | "fuel" | "gas" | "auto" | "transit" | "parking"
        | "car" => "transportation",
        "insurance" => "insurance",
        "entertainment" | "streaming" | "movies" | "music" | "games" | "subscriptions" => {
            "entertainment"
        }
        "dining" | "restaurants" | "restaurant" | "coffee" | "takeout" | "food & drink" => {
            "dining"
        }
        "shopping" | "clothing" | "electronics" | "merchandise" => "shopping",
        "hobbies" | "hobby" | "sports" | "fitness" | "crafts" => "hobbies",
        "savings" | "investments" | "investment" | "retirement" => SAVINGS_CATEGORY,
        _ => return None,
    };
    Some(category)
}

/// Average monthly spending per budget category
fn monthly_spending(transactions: &[Transaction]) -> (Vec<(&'static str, f64)>, f64) {
    let spending = expenses(transactions);
    let (Some(first), Some(last)) = (
        spending.iter().map(|t| t.day()).min(),
        spending.iter().map(|t| t.day()).max(),
    ) else {
        return (Vec::new(), 0.0);
    };

    let span_days = ((last - first).num_days() + 1) as f64;
    let months = (span_days / DAYS_PER_MONTH).max(1.0);

    let mut totals: Vec<(&'static str, f64)> = Vec::new();
    for tx in &spending {
        let Some(category) = budget_category(&tx.category) else {
            continue;
        };
        match totals.iter_mut().find(|(c, _)| *c == category) {
            Some((_, total)) => *total += tx.spend(),
            None => totals.push((category, tx.spend())),
        }
    }

    for (_, total) in totals.iter_mut() {
        *total /= months;
    }
    (totals, months)
}

/// Average monthly outflow across all spending, excluding transfers to savings
pub fn average_monthly_spending(transactions: &[Transaction]) -> f64 {
    let spending = expenses(transactions);
    let (Some(first), Some(last)) = (
        spending.iter().map(|t| t.day()).min(),
        spending.iter().map(|t| t.day()).max(),
    ) else {
        return 0.0;
    };

    let months = (((last - first).num_days() + 1) as f64 / DAYS_PER_MONTH).max(1.0);
    let total: f64 = spending
        .iter()
        .filter(|t| budget_category(&t.category) != Some(SAVINGS_CATEGORY))
        .map(|t| t.spend())
        .sum();
    total / months
}

/// Stateless 50/30/20 budget optimizer
#[derive(Debug, Default, Clone)]
pub struct BudgetOptimizer;

impl BudgetOptimizer {
    pub fn new() -> Self {
        Self
    }

    pub fn optimize_budget(
        &self,
        transactions: &[Transaction],
        monthly_income: f64,
    ) -> Result<BudgetAnalysis> {
        if !monthly_income.is_finite() || monthly_income <= 0.0 {
            return Err(Error::InvalidData(format!(
                "monthly income must be a positive amount, got {}",
                monthly_income
            )));
        }

        let (current_spending, months) = monthly_spending(transactions);
        let current_for = |category: &str| {
            current_spending
                .iter()
                .find(|(c, _)| *c == category)
                .map(|(_, amount)| *amount)
                .unwrap_or(0.0)
        };

        let allocations = self.allocations(monthly_income, &current_for);
        let adjustments = self.adjustments(&allocations);

        let discretionary_budget = monthly_income * DISCRETIONARY_RATIO;
        let discretionary_current: f64 = DISCRETIONARY_CATEGORIES
            .iter()
            .map(|c| current_for(*c))
            .sum();
        let savings = SavingsSummary {
            current: current_for(SAVINGS_CATEGORY),
            target: monthly_income * SAVINGS_RATIO,
            potential: (discretionary_budget - discretionary_current).max(0.0),
        };

        let categorized_spending: f64 = current_spending
            .iter()
            .filter(|(c, _)| *c != SAVINGS_CATEGORY)
            .map(|(_, amount)| amount)
            .sum();

        let mut analysis = BudgetAnalysis {
            monthly_income,
            allocations,
            adjustments,
            recommendations: Vec::new(),
            savings,
            categorized_spending,
        };
        analysis.recommendations = self.recommendations(&analysis);

        debug!(
            monthly_income,
            months,
            adjustments = analysis.adjustments.len(),
            "Budget optimization complete"
        );

        Ok(analysis)
    }

    fn allocations(
        &self,
        monthly_income: f64,
        current_for: &dyn Fn(&str) -> f64,
    ) -> Vec<BudgetAllocation> {
        let essential_budget = monthly_income * ESSENTIAL_RATIO;
        let per_discretionary =
            monthly_income * DISCRETIONARY_RATIO / DISCRETIONARY_CATEGORIES.len() as f64;

        let essentials = ESSENTIAL_SPLIT.iter().map(|(category, share)| BudgetAllocation {
            category: category.to_string(),
            bucket: BudgetBucket::Essential,
            amount: essential_budget * share,
            current: current_for(*category),
        });

        let discretionary = DISCRETIONARY_CATEGORIES.iter().map(|category| BudgetAllocation {
            category: category.to_string(),
            bucket: BudgetBucket::Discretionary,
            amount: per_discretionary,
            current: current_for(*category),
        });

        let savings = std::iter::once(BudgetAllocation {
            category: SAVINGS_CATEGORY.to_string(),
            bucket: BudgetBucket::Savings,
            amount: monthly_income * SAVINGS_RATIO,
            current: current_for(SAVINGS_CATEGORY),
        });

        essentials.chain(discretionary).chain(savings).collect()
    }

    fn adjustments(&self, allocations: &[BudgetAllocation]) -> Vec<BudgetAdjustment> {
        let mut adjustments: Vec<BudgetAdjustment> = allocations
            .iter()
            .filter_map(|allocation| {
                let optimal = allocation.amount;
                let delta = optimal - allocation.current;
                if delta.abs() <= optimal * ADJUSTMENT_THRESHOLD {
                    return None;
                }

                let magnitude = AdjustmentMagnitude::from_ratio(delta.abs() / optimal);
                let reason = if delta < 0.0 {
                    format!(
                        "{} overspend: {} averages ${:.0}/month against a ${:.0} target",
                        capitalize(magnitude.as_str()),
                        allocation.category,
                        allocation.current,
                        optimal
                    )
                } else if allocation.bucket == BudgetBucket::Savings {
                    format!(
                        "{} savings shortfall: ${:.0}/month saved against a ${:.0} target",
                        capitalize(magnitude.as_str()),
                        allocation.current,
                        optimal
                    )
                } else {
                    format!(
                        "{} headroom: {} averages ${:.0}/month of a ${:.0} allocation",
                        capitalize(magnitude.as_str()),
                        allocation.category,
                        allocation.current,
                        optimal
                    )
                };

                Some(BudgetAdjustment {
                    category: allocation.category.clone(),
                    bucket: allocation.bucket,
                    current: allocation.current,
                    optimal,
                    delta,
                    magnitude,
                    reason,
                })
            })
            .collect();

        adjustments.sort_by(|a, b| b.delta.abs().total_cmp(&a.delta.abs()));
        adjustments
    }

    fn recommendations(&self, analysis: &BudgetAnalysis) -> Vec<Recommendation> {
        let mut recommendations: Vec<Recommendation> = analysis
            .adjustments
            .iter()
            .take(TOP_RECOMMENDATIONS)
            .map(|adjustment| {
                let amount = adjustment.delta.abs();
                let message = if adjustment.is_overspend() {
                    format!("Reduce {} spending by ${:.0}/month", adjustment.category, amount)
                } else if adjustment.bucket == BudgetBucket::Savings {
                    format!("Increase monthly savings by ${:.0}", amount)
                } else {
                    format!(
                        "${:.0}/month of the {} allocation is unused and could go to savings",
                        amount, adjustment.category
                    )
                };
                Recommendation {
                    priority: 0,
                    category: Some(adjustment.category.clone()),
                    message,
                    impact: amount,
                }
            })
            .collect();

        let essential_current = analysis.bucket_current(BudgetBucket::Essential);
        let essential_budget = analysis.bucket_budget(BudgetBucket::Essential);
        if essential_current > essential_budget {
            recommendations.push(Recommendation {
                priority: 0,
                category: None,
                message: format!(
                    "Essential expenses (${:.0}/month) exceed 50% of income; review housing, utilities and insurance costs",
                    essential_current
                ),
                impact: essential_current - essential_budget,
            });
        }

        if analysis.savings.current < analysis.savings.target {
            let gap = analysis.savings.target - analysis.savings.current;
            recommendations.push(Recommendation {
                priority: 0,
                category: None,
                message: format!(
                    "Savings are below the 20% target; automate a ${:.0} transfer each payday",
                    gap
                ),
                impact: gap,
            });
        }

        for (i, recommendation) in recommendations.iter_mut().enumerate() {
            recommendation.priority = i + 1;
        }
        recommendations
    }
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
