//! Domain models for Finsight

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single dated, categorized money movement
///
/// Owned by the caller; the engines only ever borrow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Signed or unsigned; see [`Transaction::is_income`] for classification
    pub amount: f64,
    pub category: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// Explicit direction of the money movement (absent = decided by sign)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionKind>,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        amount: f64,
        category: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            category: category.into(),
            date,
            merchant: None,
            location: None,
            kind: None,
        }
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant = Some(merchant.into());
        self
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = Some(GeoPoint {
            latitude,
            longitude,
        });
        self
    }

    pub fn with_kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// An explicit `kind` wins; unmarked transactions follow the sign of
    /// `amount` (positive = income, negative or zero = spending)
    pub fn is_income(&self) -> bool {
        match self.kind {
            Some(kind) => kind == TransactionKind::Income,
            None => self.amount > 0.0,
        }
    }

    pub fn is_expense(&self) -> bool {
        !self.is_income()
    }

    /// Spending magnitude (sign-agnostic)
    pub fn spend(&self) -> f64 {
        self.amount.abs()
    }

    /// Calendar day of the transaction (UTC)
    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }
}

/// Geographic coordinates attached to a card-present transaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Grid cell of roughly 1 km (coordinates rounded to two decimals)
    pub fn grid_cell(&self) -> (i64, i64) {
        (
            (self.latitude * 100.0).round() as i64,
            (self.longitude * 100.0).round() as i64,
        )
    }
}

/// Direction of a money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Expense,
    Income,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expense" | "debit" | "sale" => Ok(Self::Expense),
            "income" | "credit" | "deposit" => Ok(Self::Income),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a fitted trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Spending transactions only, in input order
pub fn expenses(transactions: &[Transaction]) -> Vec<&Transaction> {
    transactions.iter().filter(|t| t.is_expense()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_unmarked_transactions_follow_sign() {
        let groceries = Transaction::new("t1", -42.0, "dining", at(1));
        assert!(groceries.is_expense());
        assert_eq!(groceries.spend(), 42.0);

        let salary = Transaction::new("t2", 4000.0, "salary", at(1));
        assert!(salary.is_income());

        let zero = Transaction::new("t3", 0.0, "fees", at(1));
        assert!(zero.is_expense());
    }

    #[test]
    fn test_explicit_kind_overrides_sign() {
        let unsigned_bill = Transaction::new("t1", 42.0, "dining", at(1))
            .with_kind(TransactionKind::Expense);
        assert!(unsigned_bill.is_expense());
        assert_eq!(unsigned_bill.spend(), 42.0);

        let chargeback = Transaction::new("t2", -15.0, "refunds", at(2))
            .with_kind(TransactionKind::Income);
        assert!(chargeback.is_income());
    }

    #[test]
    fn test_expenses_filter() {
        let txs = vec![
            Transaction::new("a", -10.0, "dining", at(1)),
            Transaction::new("b", 3000.0, "salary", at(2)),
            Transaction::new("c", 20.0, "dining", at(3)).with_kind(TransactionKind::Expense),
        ];
        let ids: Vec<_> = expenses(&txs).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_grid_cell_rounds_to_about_a_kilometer() {
        let a = GeoPoint {
            latitude: 47.6062,
            longitude: -122.3321,
        };
        let b = GeoPoint {
            latitude: 47.6058,
            longitude: -122.3349,
        };
        assert_eq!(a.grid_cell(), b.grid_cell());

        let far = GeoPoint {
            latitude: 47.65,
            longitude: -122.33,
        };
        assert_ne!(a.grid_cell(), far.grid_cell());
    }

    #[test]
    fn test_transaction_kind_parsing() {
        assert_eq!(
            "Income".parse::<TransactionKind>().unwrap(),
            TransactionKind::Income
        );
        assert_eq!(
            "debit".parse::<TransactionKind>().unwrap(),
            TransactionKind::Expense
        );
        assert!("transfer".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn test_transaction_json_shape() {
        let tx = Transaction::new("t1", -12.5, "coffee", at(4)).with_merchant("Blue Bottle");
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["merchant"], "Blue Bottle");
        assert!(json.get("location").is_none());

        let back: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }
}
