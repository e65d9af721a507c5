//! Spending anomaly detection
//!
//! Detects:
//! - Amount anomalies: per-category z-score outliers
//! - Frequency anomalies: days with far more transactions than a category's norm
//! - Pattern breaks: recent departures from a category's previously steady amount
//! - Suspicious activity: rapid duplicate charges and never-seen locations
//!
//! All thresholds are fixed so results stay comparable across runs.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{expenses, Transaction};
use crate::stats;

/// z-score above which an amount is an outlier
const AMOUNT_Z_THRESHOLD: f64 = 3.0;

/// z-score above which an outlier is high severity
const AMOUNT_Z_HIGH: f64 = 5.0;

/// Daily count must exceed the normal daily rate by this factor
const FREQUENCY_MULTIPLIER: f64 = 2.0;

/// A category is a steady pattern when stddev/mean stays below this
const PATTERN_MAX_CV: f64 = 0.2;

/// Minimum transactions before a category can form a pattern
const PATTERN_MIN_TRANSACTIONS: usize = 3;

/// Relative deviation from the pattern mean that counts as a break
const PATTERN_BREAK_DEVIATION: f64 = 0.3;

/// Only transactions this recent are checked for pattern breaks
const PATTERN_WINDOW_DAYS: i64 = 30;

/// Window for duplicate charges
const RAPID_WINDOW_MINUTES: i64 = 5;

/// Amount difference below which two charges are duplicates
const RAPID_AMOUNT_TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
}

impl AnomalySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    fn from_z_score(z: f64) -> Self {
        if z > AMOUNT_Z_HIGH {
            Self::High
        } else if z > AMOUNT_Z_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for AnomalySeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountAnomaly {
    pub transaction_id: String,
    pub category: String,
    pub amount: f64,
    /// Category mean
    pub expected: f64,
    pub z_score: f64,
    pub severity: AnomalySeverity,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyAnomaly {
    pub category: String,
    pub date: NaiveDate,
    pub count: usize,
    /// Normal transactions per day for the category
    pub expected_daily: f64,
    pub severity: AnomalySeverity,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternBreak {
    pub transaction_id: String,
    pub category: String,
    pub amount: f64,
    pub expected: f64,
    /// Relative deviation from the expected amount (0.3 = 30%)
    pub deviation: f64,
    pub severity: AnomalySeverity,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspiciousKind {
    RapidSuccession,
    UnusualLocation,
}

impl SuspiciousKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RapidSuccession => "rapid_succession",
            Self::UnusualLocation => "unusual_location",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousActivity {
    pub transaction_id: String,
    /// Earlier transaction this one duplicates (rapid succession only)
    pub related_transaction_id: Option<String>,
    pub category: String,
    pub kind: SuspiciousKind,
    pub severity: AnomalySeverity,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub amount_anomalies: Vec<AmountAnomaly>,
    pub frequency_anomalies: Vec<FrequencyAnomaly>,
    pub pattern_breaks: Vec<PatternBreak>,
    pub suspicious_activity: Vec<SuspiciousActivity>,
}

impl AnomalyReport {
    pub fn total(&self) -> usize {
        self.amount_anomalies.len()
            + self.frequency_anomalies.len()
            + self.pattern_breaks.len()
            + self.suspicious_activity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Stateless anomaly detector
#[derive(Debug, Default, Clone)]
pub struct AnomalyDetector;

impl AnomalyDetector {
    pub fn new() -> Self {
        Self
    }

    /// Detect anomalies relative to the current time
    pub fn detect_anomalies(&self, transactions: &[Transaction]) -> AnomalyReport {
        self.detect_anomalies_at(transactions, Utc::now())
    }

    /// Detect anomalies relative to `now` (which bounds the pattern-break window)
    pub fn detect_anomalies_at(
        &self,
        transactions: &[Transaction],
        now: DateTime<Utc>,
    ) -> AnomalyReport {
        let mut spending = expenses(transactions);
        spending.sort_by_key(|t| t.date);

        let mut by_category: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
        for &tx in &spending {
            by_category.entry(tx.category.as_str()).or_default().push(tx);
        }

        let report = AnomalyReport {
            amount_anomalies: amount_anomalies(&by_category),
            frequency_anomalies: frequency_anomalies(&spending, &by_category),
            pattern_breaks: pattern_breaks(&by_category, now),
            suspicious_activity: suspicious_activity(&spending),
        };

        debug!(
            amount = report.amount_anomalies.len(),
            frequency = report.frequency_anomalies.len(),
            pattern_breaks = report.pattern_breaks.len(),
            suspicious = report.suspicious_activity.len(),
            "Anomaly detection complete"
        );

        report
    }
}

fn amount_anomalies(by_category: &BTreeMap<&str, Vec<&Transaction>>) -> Vec<AmountAnomaly> {
    let mut anomalies = Vec::new();

    for (category, txs) in by_category {
        let amounts: Vec<f64> = txs.iter().map(|t| t.spend()).collect();
        let (Some(mean), Some(sd)) = (stats::mean(&amounts), stats::std_dev(&amounts)) else {
            continue;
        };
        if sd == 0.0 {
            continue;
        }

        for tx in txs {
            let z = (tx.spend() - mean).abs() / sd;
            if z <= AMOUNT_Z_THRESHOLD {
                continue;
            }
            anomalies.push(AmountAnomaly {
                transaction_id: tx.id.clone(),
                category: category.to_string(),
                amount: tx.spend(),
                expected: mean,
                z_score: z,
                severity: AnomalySeverity::from_z_score(z),
                reason: format!(
                    "${:.2} is {:.1} standard deviations from the usual ${:.2} for {}",
                    tx.spend(),
                    z,
                    mean,
                    category
                ),
            });
        }
    }

    anomalies
}

fn frequency_anomalies(
    spending: &[&Transaction],
    by_category: &BTreeMap<&str, Vec<&Transaction>>,
) -> Vec<FrequencyAnomaly> {
    let (Some(first), Some(last)) = (spending.first(), spending.last()) else {
        return Vec::new();
    };
    let total_days = ((last.day() - first.day()).num_days() + 1) as f64;

    let mut anomalies = Vec::new();

    for (category, txs) in by_category {
        let normal_rate = txs.len() as f64 / total_days;

        let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for tx in txs {
            *per_day.entry(tx.day()).or_insert(0) += 1;
        }

        for (date, count) in per_day {
            // One transaction on a day can never be a spike
            if count < 2 || count as f64 <= normal_rate * FREQUENCY_MULTIPLIER {
                continue;
            }

            let ratio = count as f64 / normal_rate;
            let severity = if ratio > 3.0 * FREQUENCY_MULTIPLIER {
                AnomalySeverity::High
            } else if ratio > 2.0 * FREQUENCY_MULTIPLIER {
                AnomalySeverity::Medium
            } else {
                AnomalySeverity::Low
            };

            anomalies.push(FrequencyAnomaly {
                category: category.to_string(),
                date,
                count,
                expected_daily: normal_rate,
                severity,
                reason: format!(
                    "{} {} transactions on {} (normally {:.2} per day)",
                    count, category, date, normal_rate
                ),
            });
        }
    }

    anomalies
}

fn pattern_breaks(
    by_category: &BTreeMap<&str, Vec<&Transaction>>,
    now: DateTime<Utc>,
) -> Vec<PatternBreak> {
    let window_start = now - Duration::days(PATTERN_WINDOW_DAYS);
    let mut breaks = Vec::new();

    for (category, txs) in by_category {
        // Expected amount is fitted on history before the window only
        let (recent, history): (Vec<&Transaction>, Vec<&Transaction>) =
            txs.iter().copied().partition(|t| t.date >= window_start);
        if recent.is_empty() || history.len() < PATTERN_MIN_TRANSACTIONS {
            continue;
        }

        let amounts: Vec<f64> = history.iter().map(|t| t.spend()).collect();
        let (Some(mean), Some(cv)) = (
            stats::mean(&amounts),
            stats::coefficient_of_variation(&amounts),
        ) else {
            continue;
        };
        if cv >= PATTERN_MAX_CV {
            continue;
        }

        for tx in recent {
            let deviation = (tx.spend() - mean).abs() / mean;
            if deviation <= PATTERN_BREAK_DEVIATION {
                continue;
            }

            let severity = if deviation > 1.0 {
                AnomalySeverity::High
            } else if deviation > 0.5 {
                AnomalySeverity::Medium
            } else {
                AnomalySeverity::Low
            };

            let direction = if tx.spend() > mean { "above" } else { "below" };
            breaks.push(PatternBreak {
                transaction_id: tx.id.clone(),
                category: category.to_string(),
                amount: tx.spend(),
                expected: mean,
                deviation,
                severity,
                reason: format!(
                    "{} charge of ${:.2} is {:.0}% {} its usual ${:.2}",
                    category,
                    tx.spend(),
                    deviation * 100.0,
                    direction,
                    mean
                ),
            });
        }
    }

    breaks
}

/// `spending` must be sorted by date
fn suspicious_activity(spending: &[&Transaction]) -> Vec<SuspiciousActivity> {
    let mut flagged = Vec::new();
    let window = Duration::minutes(RAPID_WINDOW_MINUTES);

    // Rapid succession: near-identical charges in the same category within minutes
    let mut already_flagged: HashSet<usize> = HashSet::new();
    for (i, earlier) in spending.iter().enumerate() {
        for (j, later) in spending.iter().enumerate().skip(i + 1) {
            if later.date - earlier.date > window {
                break;
            }
            if later.category != earlier.category
                || (later.spend() - earlier.spend()).abs() >= RAPID_AMOUNT_TOLERANCE
                || !already_flagged.insert(j)
            {
                continue;
            }
            flagged.push(SuspiciousActivity {
                transaction_id: later.id.clone(),
                related_transaction_id: Some(earlier.id.clone()),
                category: later.category.clone(),
                kind: SuspiciousKind::RapidSuccession,
                severity: AnomalySeverity::High,
                reason: format!(
                    "Two {} charges of ~${:.2} within {} minutes",
                    later.category,
                    later.spend(),
                    RAPID_WINDOW_MINUTES
                ),
            });
        }
    }

    // Unusual location: a grid cell never seen before for an established category
    let mut seen: HashMap<&str, HashSet<(i64, i64)>> = HashMap::new();
    for tx in spending {
        let Some(location) = tx.location else {
            continue;
        };
        let cell = location.grid_cell();
        let known = seen.entry(tx.category.as_str()).or_default();

        if !known.is_empty() && !known.contains(&cell) {
            flagged.push(SuspiciousActivity {
                transaction_id: tx.id.clone(),
                related_transaction_id: None,
                category: tx.category.clone(),
                kind: SuspiciousKind::UnusualLocation,
                severity: AnomalySeverity::Medium,
                reason: format!(
                    "{} transaction at a new location ({:.2}, {:.2})",
                    tx.category, location.latitude, location.longitude
                ),
            });
        }
        known.insert(cell);
    }

    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        now() - Duration::days(days)
    }

    fn tx(id: &str, amount: f64, category: &str, date: DateTime<Utc>) -> Transaction {
        Transaction::new(id, -amount, category, date)
    }

    #[test]
    fn test_outlier_amount_flagged_as_medium() {
        let mut txs: Vec<Transaction> = (0..10)
            .map(|i| tx(&format!("g{}", i), 50.0, "groceries", days_ago(100 - i * 7)))
            .collect();
        txs.push(tx("big", 500.0, "groceries", days_ago(5)));

        let report = AnomalyDetector::new().detect_anomalies_at(&txs, now());

        assert_eq!(report.amount_anomalies.len(), 1);
        let anomaly = &report.amount_anomalies[0];
        assert_eq!(anomaly.transaction_id, "big");
        assert!(anomaly.z_score > 3.0 && anomaly.z_score <= 5.0);
        assert_eq!(anomaly.severity, AnomalySeverity::Medium);
    }

    #[test]
    fn test_transaction_at_mean_never_flagged() {
        let txs = vec![
            tx("a", 10.0, "fuel", days_ago(40)),
            tx("b", 50.0, "fuel", days_ago(20)),
            tx("c", 30.0, "fuel", days_ago(10)),
        ];
        let report = AnomalyDetector::new().detect_anomalies_at(&txs, now());
        assert!(!report
            .amount_anomalies
            .iter()
            .any(|a| a.transaction_id == "c"));

        let identical = vec![
            tx("x", 20.0, "parking", days_ago(3)),
            tx("y", 20.0, "parking", days_ago(2)),
        ];
        let report = AnomalyDetector::new().detect_anomalies_at(&identical, now());
        assert!(report.amount_anomalies.is_empty());
    }

    #[test]
    fn test_frequency_spike() {
        // One coffee every ten days, then five in a single day
        let mut txs: Vec<Transaction> = (0..6)
            .map(|i| tx(&format!("c{}", i), 4.0, "coffee", days_ago(60 - i * 10)))
            .collect();
        for i in 0..5 {
            txs.push(tx(
                &format!("burst{}", i),
                4.0,
                "coffee",
                days_ago(2) + Duration::hours(i),
            ));
        }

        let report = AnomalyDetector::new().detect_anomalies_at(&txs, now());

        assert_eq!(report.frequency_anomalies.len(), 1);
        let spike = &report.frequency_anomalies[0];
        assert_eq!(spike.count, 5);
        assert_eq!(spike.date, days_ago(2).date_naive());
        assert_eq!(spike.severity, AnomalySeverity::High);
    }

    #[test]
    fn test_pattern_break_in_recent_window() {
        let mut txs: Vec<Transaction> = (0..9)
            .map(|i| tx(&format!("p{}", i), 100.0, "phone", days_ago(300 - i * 30)))
            .collect();
        txs.push(tx("jump", 140.0, "phone", days_ago(3)));

        let report = AnomalyDetector::new().detect_anomalies_at(&txs, now());

        assert_eq!(report.pattern_breaks.len(), 1);
        let pattern_break = &report.pattern_breaks[0];
        assert_eq!(pattern_break.transaction_id, "jump");
        assert!((pattern_break.expected - 100.0).abs() < 1e-9);
        assert!((pattern_break.deviation - 0.4).abs() < 1e-9);
        assert_eq!(pattern_break.severity, AnomalySeverity::Low);
    }

    #[test]
    fn test_doubled_bill_breaks_pattern() {
        let mut txs: Vec<Transaction> = (0..9)
            .map(|i| tx(&format!("p{}", i), 100.0, "phone", days_ago(300 - i * 30)))
            .collect();
        txs.push(tx("doubled", 200.0, "phone", days_ago(3)));

        let report = AnomalyDetector::new().detect_anomalies_at(&txs, now());

        // z-score lands exactly on the amount threshold, so only the
        // pattern check catches it
        assert!(report.amount_anomalies.is_empty());
        assert_eq!(report.pattern_breaks.len(), 1);
        let pattern_break = &report.pattern_breaks[0];
        assert_eq!(pattern_break.transaction_id, "doubled");
        assert_eq!(pattern_break.expected, 100.0);
        assert!((pattern_break.deviation - 1.0).abs() < 1e-9);
        assert_eq!(pattern_break.severity, AnomalySeverity::Medium);
    }

    #[test]
    fn test_pattern_needs_history_before_window() {
        // Three steady charges all inside the window: nothing to compare against
        let txs = vec![
            tx("a", 100.0, "phone", days_ago(20)),
            tx("b", 100.0, "phone", days_ago(10)),
            tx("c", 150.0, "phone", days_ago(1)),
        ];
        let report = AnomalyDetector::new().detect_anomalies_at(&txs, now());
        assert!(report.pattern_breaks.is_empty());
    }

    #[test]
    fn test_old_pattern_break_ignored() {
        let mut txs: Vec<Transaction> = (0..9)
            .map(|i| tx(&format!("p{}", i), 100.0, "phone", days_ago(300 - i * 10)))
            .collect();
        txs.push(tx("old_jump", 140.0, "phone", days_ago(120)));

        let report = AnomalyDetector::new().detect_anomalies_at(&txs, now());
        assert!(report.pattern_breaks.is_empty());
    }

    #[test]
    fn test_rapid_succession() {
        let base = days_ago(1);
        let txs = vec![
            tx("first", 89.99, "electronics", base),
            tx("dup", 89.50, "electronics", base + Duration::minutes(3)),
            tx("later", 89.99, "electronics", base + Duration::minutes(30)),
            tx("other", 89.99, "books", base + Duration::minutes(1)),
        ];

        let report = AnomalyDetector::new().detect_anomalies_at(&txs, now());
        let rapid: Vec<_> = report
            .suspicious_activity
            .iter()
            .filter(|s| s.kind == SuspiciousKind::RapidSuccession)
            .collect();

        assert_eq!(rapid.len(), 1);
        assert_eq!(rapid[0].transaction_id, "dup");
        assert_eq!(rapid[0].related_transaction_id.as_deref(), Some("first"));
        assert_eq!(rapid[0].severity, AnomalySeverity::High);
    }

    #[test]
    fn test_unusual_location() {
        let txs = vec![
            tx("home1", 30.0, "dining", days_ago(20)).with_location(40.7128, -74.0060),
            tx("home2", 35.0, "dining", days_ago(10)).with_location(40.7131, -74.0058),
            tx("away", 32.0, "dining", days_ago(2)).with_location(34.0522, -118.2437),
            tx("first_fuel", 50.0, "fuel", days_ago(2)).with_location(34.0522, -118.2437),
        ];

        let report = AnomalyDetector::new().detect_anomalies_at(&txs, now());
        let unusual: Vec<_> = report
            .suspicious_activity
            .iter()
            .filter(|s| s.kind == SuspiciousKind::UnusualLocation)
            .collect();

        assert_eq!(unusual.len(), 1);
        assert_eq!(unusual[0].transaction_id, "away");
        assert_eq!(unusual[0].severity, AnomalySeverity::Medium);
    }

    #[test]
    fn test_empty_input() {
        let report = AnomalyDetector::new().detect_anomalies_at(&[], now());
        assert!(report.is_empty());
    }

    #[test]
    fn test_detection_is_idempotent() {
        let txs: Vec<Transaction> = (0..30)
            .map(|i| tx(&format!("t{}", i), 20.0 + (i % 4) as f64, "misc", days_ago(i)))
            .collect();
        let detector = AnomalyDetector::new();
        assert_eq!(
            detector.detect_anomalies_at(&txs, now()),
            detector.detect_anomalies_at(&txs, now())
        );
    }
}
