//! Transaction import from CSV and JSON files

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use csv::{ReaderBuilder, StringRecord};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Transaction, TransactionKind};

/// Column positions resolved from the header row
struct Columns {
    date: usize,
    amount: usize,
    category: usize,
    id: Option<usize>,
    merchant: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
    kind: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| Error::Import(format!("Missing required column: {}", name)))
        };

        Ok(Self {
            date: require("date")?,
            amount: require("amount")?,
            category: require("category")?,
            id: find("id"),
            merchant: find("merchant"),
            latitude: find("latitude"),
            longitude: find("longitude"),
            kind: find("type"),
        })
    }
}

/// Non-empty, trimmed value of an optional column
fn optional<'r>(record: &'r StringRecord, column: Option<usize>) -> Option<&'r str> {
    column
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn required<'r>(record: &'r StringRecord, column: usize, name: &str) -> Result<&'r str> {
    optional(record, Some(column)).ok_or_else(|| Error::Import(format!("empty {}", name)))
}

/// Generate a stable id for a row without an id column
fn generate_id(
    date: &DateTime<Utc>,
    category: &str,
    merchant: Option<&str>,
    amount: f64,
    row: usize,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_rfc3339().as_bytes());
    hasher.update(category.as_bytes());
    hasher.update(merchant.unwrap_or("").as_bytes());
    hasher.update(amount.to_be_bytes());
    // Row index keeps identical same-day purchases distinct
    hasher.update(row.to_be_bytes());
    hex::encode(&hasher.finalize()[..12])
}

/// Parse a CSV export with `date,amount,category` columns (plus optional
/// `id,merchant,latitude,longitude,type`)
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut transactions = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let record = result?;
        // Header is line 1
        let line = index + 2;
        let tx = parse_record(&record, &columns, index)
            .map_err(|e| Error::Import(format!("row {}: {}", line, e)))?;
        transactions.push(tx);
    }

    debug!(count = transactions.len(), "Parsed CSV transactions");
    Ok(transactions)
}

fn parse_record(record: &StringRecord, columns: &Columns, index: usize) -> Result<Transaction> {
    let date = parse_date(required(record, columns.date, "date")?)?;
    let amount = parse_amount(required(record, columns.amount, "amount")?)?;
    let category = required(record, columns.category, "category")?.to_string();
    let merchant = optional(record, columns.merchant);

    // Without a type column the sign decides (see Transaction::is_income)
    let kind = optional(record, columns.kind)
        .map(str::parse::<TransactionKind>)
        .transpose()
        .map_err(Error::Import)?;

    let id = match optional(record, columns.id) {
        Some(id) => id.to_string(),
        None => generate_id(&date, &category, merchant, amount, index),
    };

    let mut tx = Transaction::new(id, amount, category, date);
    if let Some(kind) = kind {
        tx = tx.with_kind(kind);
    }
    if let Some(merchant) = merchant {
        tx = tx.with_merchant(merchant);
    }

    match (
        optional(record, columns.latitude),
        optional(record, columns.longitude),
    ) {
        (Some(lat), Some(lng)) => {
            let lat = parse_coordinate(lat, 90.0)?;
            let lng = parse_coordinate(lng, 180.0)?;
            tx = tx.with_location(lat, lng);
        }
        (None, None) => {}
        _ => {
            return Err(Error::Import(
                "latitude and longitude must be given together".into(),
            ))
        }
    }

    Ok(tx)
}

/// Parse a JSON array of transactions
pub fn parse_json<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let transactions: Vec<Transaction> = serde_json::from_reader(reader)?;
    for tx in &transactions {
        if !tx.amount.is_finite() {
            return Err(Error::Import(format!(
                "transaction {}: amount is not a finite number",
                tx.id
            )));
        }
    }
    debug!(count = transactions.len(), "Parsed JSON transactions");
    Ok(transactions)
}

/// Load transactions from a `.csv` or `.json` file
pub fn load_transactions(path: &Path) -> Result<Vec<Transaction>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    let reader = || File::open(path).map(BufReader::new);
    let transactions = match extension.as_deref() {
        Some("csv") => parse_csv(reader()?)?,
        Some("json") => parse_json(reader()?)?,
        _ => {
            return Err(Error::Import(format!(
                "Unsupported file type (expected .csv or .json): {}",
                path.display()
            )))
        }
    };

    debug!(
        path = %path.display(),
        count = transactions.len(),
        "Loaded transactions"
    );
    Ok(transactions)
}

/// Parse a timestamp or date in various common formats (dates become midnight UTC)
fn parse_date(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&dt));
    }

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%Y", // 01/15/2024
    ];
    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&dt));
            }
        }
    }

    Err(Error::Import(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols and commas
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::Import(format!("Unable to parse amount: {}", s)))
}

fn parse_coordinate(s: &str, limit: f64) -> Result<f64> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.abs() <= limit)
        .ok_or_else(|| Error::Import(format!("Invalid coordinate: {}", s)))
}
