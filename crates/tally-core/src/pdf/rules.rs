//! Rule-based statement reconstruction
//!
//! Scans extracted statement text line by line for
//! `MM/DD[/YY[YY]]  description  amount  [balance]` rows and writes them out
//! as `Date,Description,Amount` CSV, the same shape the AI reconstructor
//! produces. Works offline and without credentials, but only on statements
//! whose text layer keeps one transaction per line.
//!
//! Sign handling: an amount printed negative (`-12.00`, `(12.00)`,
//! `12.00-`) is a debit. Unsigned amounts take the sign of the section they
//! appear in (`Withdrawals`, `Deposits`, ...) and count as credits outside
//! any recognised section.

use std::str::FromStr;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::StatementReconstructor;

static TRANSACTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\s*(?P<date>\d{1,2}/\d{1,2}(?:/\d{2}(?:\d{2})?)?)\s+",
        r"(?P<desc>.+?)\s+",
        r"(?P<amount>\(?[-+]?\$?\d[\d,]*\.\d{2}\)?-?)",
        r"(?:\s+(?P<balance>-?\$?\d[\d,]*\.\d{2}))?\s*$"
    ))
    .expect("valid regex")
});

static DEBIT_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(withdrawals|debits|purchases|checks paid|fees|electronic withdrawals|atm & debit card withdrawals)\b")
        .expect("valid regex")
});

static CREDIT_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(deposits|credits|deposits and additions|additions)\b").expect("valid regex")
});

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Unknown,
    Debits,
    Credits,
}

/// Deterministic reconstructor for line-oriented statement text
#[derive(Debug, Clone, Default)]
pub struct LineReconstructor {
    /// Year for `MM/DD` rows when the text never mentions one
    default_year: Option<i32>,
}

impl LineReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_year(year: i32) -> Self {
        Self {
            default_year: Some(year),
        }
    }

    /// Rebuild statement text as CSV. Yields just the header row when no
    /// transaction lines are found.
    pub fn reconstruct_text(&self, text: &str) -> Result<String> {
        let year = statement_year(text).or(self.default_year);
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["Date", "Description", "Amount"])?;

        let mut section = Section::Unknown;
        let mut rows = 0usize;

        for line in text.lines() {
            let Some(caps) = TRANSACTION_LINE.captures(line) else {
                if DEBIT_SECTION.is_match(line) {
                    section = Section::Debits;
                } else if CREDIT_SECTION.is_match(line) {
                    section = Section::Credits;
                }
                continue;
            };

            let Some(date) = resolve_date(&caps["date"], year) else {
                trace!(line, "Skipping line with unusable date");
                continue;
            };
            let Some(amount) = signed_amount(&caps["amount"], section) else {
                trace!(line, "Skipping line with unusable amount");
                continue;
            };

            writer.write_record([
                date.format("%m/%d/%Y").to_string(),
                caps["desc"].trim().to_string(),
                amount.to_string(),
            ])?;
            rows += 1;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Reconstruction(format!("Failed to finish CSV: {}", e)))?;
        let csv = String::from_utf8(bytes).map_err(|e| Error::Reconstruction(e.to_string()))?;

        debug!(rows, ?year, "Rule-based reconstruction complete");
        Ok(csv)
    }
}

#[async_trait]
impl StatementReconstructor for LineReconstructor {
    async fn reconstruct(&self, statement_text: &str) -> Result<String> {
        self.reconstruct_text(statement_text)
    }

    fn name(&self) -> &str {
        "rules"
    }
}

/// First plausible four-digit year in the text
fn statement_year(text: &str) -> Option<i32> {
    YEAR.find(text).and_then(|m| m.as_str().parse().ok())
}

fn resolve_date(raw: &str, year: Option<i32>) -> Option<NaiveDate> {
    let mut parts = raw.split('/');
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    let year = match parts.next() {
        Some(y) if y.len() == 2 => 2000 + y.parse::<i32>().ok()?,
        Some(y) => y.parse().ok()?,
        None => year?,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn signed_amount(raw: &str, section: Section) -> Option<Decimal> {
    let printed_negative =
        raw.contains('-') || (raw.starts_with('(') && raw.ends_with(')'));
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let magnitude = Decimal::from_str(&digits).ok()?;

    let negative = printed_negative || section == Section::Debits;
    Some(if negative { -magnitude } else { magnitude })
}
