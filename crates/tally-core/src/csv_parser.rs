//! CSV statement parser
//!
//! Banks disagree on column names, so each canonical field is resolved from
//! an ordered list of header synonyms (first non-empty value wins). Rows that
//! cannot produce a usable transaction are dropped, never reported as errors:
//! a statement with a few junk lines still imports the good ones.

use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::Result;
use crate::merchant::MerchantNormalizer;
use crate::models::{ParsedTransaction, TransactionType};

pub const DEFAULT_DATE_COLUMNS: &[&str] =
    &["Date", "Transaction Date", "Posted Date", "date", "transaction_date"];
pub const DEFAULT_DESCRIPTION_COLUMNS: &[&str] = &[
    "Description",
    "Transaction Description",
    "Memo",
    "description",
    "memo",
    "Details",
];
pub const DEFAULT_DEBIT_COLUMNS: &[&str] = &["Debit", "debit"];
pub const DEFAULT_CREDIT_COLUMNS: &[&str] = &["Credit", "credit"];
pub const DEFAULT_AMOUNT_COLUMNS: &[&str] = &["Amount", "amount", "Transaction Amount"];

/// Header synonyms for each canonical field, in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSynonyms {
    pub date: Vec<String>,
    pub description: Vec<String>,
    pub debit: Vec<String>,
    pub credit: Vec<String>,
    pub amount: Vec<String>,
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnSynonyms {
    fn default() -> Self {
        Self {
            date: owned(DEFAULT_DATE_COLUMNS),
            description: owned(DEFAULT_DESCRIPTION_COLUMNS),
            debit: owned(DEFAULT_DEBIT_COLUMNS),
            credit: owned(DEFAULT_CREDIT_COLUMNS),
            amount: owned(DEFAULT_AMOUNT_COLUMNS),
        }
    }
}

/// Why a row was skipped. Only used for trace logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropReason {
    MissingDate,
    EmptyDescription,
    UnparseableAmount,
    ZeroAmount,
    UnparseableDate,
}

/// Parse CSV text with the default columns and merchant rules
pub fn parse_csv(text: &str) -> Result<Vec<ParsedTransaction>> {
    CsvStatementParser::default().parse(text)
}

/// Parser for bank CSV exports
#[derive(Debug, Clone, Default)]
pub struct CsvStatementParser {
    columns: ColumnSynonyms,
    merchants: MerchantNormalizer,
}

impl CsvStatementParser {
    pub fn new(columns: ColumnSynonyms, merchants: MerchantNormalizer) -> Self {
        Self { columns, merchants }
    }

    pub fn with_columns(columns: ColumnSynonyms) -> Self {
        Self {
            columns,
            merchants: MerchantNormalizer::default(),
        }
    }

    pub fn columns(&self) -> &ColumnSynonyms {
        &self.columns
    }

    /// Parse CSV text into transactions, in input order
    pub fn parse(&self, text: &str) -> Result<Vec<ParsedTransaction>> {
        self.parse_reader(text.as_bytes())
    }

    /// Parse from any reader. Fails only if the CSV itself cannot be tokenized.
    pub fn parse_reader<R: Read>(&self, reader: R) -> Result<Vec<ParsedTransaction>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = HeaderIndex::new(rdr.headers()?);
        let mut transactions = Vec::new();
        let mut dropped = 0usize;

        for (row, result) in rdr.records().enumerate() {
            let record = result?;
            match self.parse_record(&headers, &record) {
                Ok(tx) => transactions.push(tx),
                Err(reason) => {
                    dropped += 1;
                    // +2: header line, 1-based
                    trace!(line = row + 2, ?reason, "Skipping CSV row");
                }
            }
        }

        debug!(
            "Parsed {} transactions from CSV ({} rows skipped)",
            transactions.len(),
            dropped
        );
        Ok(transactions)
    }

    fn parse_record(
        &self,
        headers: &HeaderIndex,
        record: &StringRecord,
    ) -> std::result::Result<ParsedTransaction, DropReason> {
        let date_value = headers.first_non_empty(record, &self.columns.date);
        let description = headers
            .first_non_empty(record, &self.columns.description)
            .unwrap_or_default()
            .trim();

        let (amount, transaction_type) = self.resolve_amount(headers, record)?;

        let date_value = date_value.ok_or(DropReason::MissingDate)?;
        if description.is_empty() {
            return Err(DropReason::EmptyDescription);
        }
        if amount.is_zero() {
            return Err(DropReason::ZeroAmount);
        }
        let date = parse_date(date_value).ok_or(DropReason::UnparseableDate)?;

        Ok(
            ParsedTransaction::new(date, description, amount, transaction_type)
                .with_merchant(self.merchants.normalize(description)),
        )
    }

    /// Split debit/credit columns take precedence over a single signed column
    fn resolve_amount(
        &self,
        headers: &HeaderIndex,
        record: &StringRecord,
    ) -> std::result::Result<(Decimal, TransactionType), DropReason> {
        if let Some(debit) = headers.first_non_empty(record, &self.columns.debit) {
            let amount = parse_amount(debit).ok_or(DropReason::UnparseableAmount)?;
            return Ok((amount.abs(), TransactionType::Debit));
        }
        if let Some(credit) = headers.first_non_empty(record, &self.columns.credit) {
            let amount = parse_amount(credit).ok_or(DropReason::UnparseableAmount)?;
            return Ok((amount.abs(), TransactionType::Credit));
        }

        let Some(value) = headers.first_non_empty(record, &self.columns.amount) else {
            return Ok((Decimal::ZERO, TransactionType::Credit));
        };
        let amount = parse_amount(value).ok_or(DropReason::UnparseableAmount)?;
        let transaction_type = if amount.is_sign_negative() && !amount.is_zero() {
            TransactionType::Debit
        } else {
            TransactionType::Credit
        };
        Ok((amount.abs(), transaction_type))
    }
}

/// Header name to column position. Duplicate headers: first one wins.
struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    fn new(headers: &StringRecord) -> Self {
        let mut positions = HashMap::with_capacity(headers.len());
        for (i, name) in headers.iter().enumerate() {
            positions.entry(name.to_string()).or_insert(i);
        }
        Self { positions }
    }

    fn first_non_empty<'r>(&self, record: &'r StringRecord, names: &[String]) -> Option<&'r str> {
        names
            .iter()
            .filter_map(|name| self.positions.get(name))
            .filter_map(|&i| record.get(i))
            .find(|value| !value.is_empty())
    }
}

/// Parse an amount string, keeping only digits, `.` and `-`
///
/// `"$1,234.56"` becomes `1234.56`. Parentheses are dropped like any other
/// symbol, so `"(100.00)"` reads as a positive 100.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",  // 2025-01-15
    "%Y/%m/%d",  // 2025/01/15
    "%m-%d-%Y",  // 01-15-2025
    "%b %d, %Y", // Jan 15, 2025
    "%B %d, %Y", // January 15, 2025
    "%d %b %Y",  // 15 Jan 2025
    "%d %B %Y",  // 15 January 2025
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Parse a statement date in the formats banks commonly export
///
/// Returns `None` for anything that is not a real calendar date; `02/30/2025`
/// is rejected rather than rolled into March.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    parse_slash_date(s)
}

/// `MM/DD/YYYY` or `MM/DD/YY`, padded or not
fn parse_slash_date(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split('/').map(str::trim).collect();
    let [month, day, year] = parts.as_slice() else {
        return None;
    };

    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    let year: i32 = match year.len() {
        2 => 2000 + year.parse::<i32>().ok()?,
        4 => year.parse().ok()?,
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month, day)
}
