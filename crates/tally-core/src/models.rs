//! Data models for statement import

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Direction of money flow relative to the account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money leaving the account
    Debit,
    /// Money entering the account
    Credit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One bank statement line in canonical form
///
/// `amount` is always the magnitude; direction lives in `transaction_type`.
/// Parsers never emit a zero amount, an empty description, or an
/// unresolvable date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
}

impl ParsedTransaction {
    /// Build a transaction, taking the absolute value of `amount`
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        amount: Decimal,
        transaction_type: TransactionType,
    ) -> Self {
        Self {
            date,
            description: description.into(),
            amount: amount.abs(),
            transaction_type,
            merchant_name: None,
        }
    }

    pub fn with_merchant(mut self, merchant: impl Into<String>) -> Self {
        self.merchant_name = Some(merchant.into());
        self
    }

    /// Signed amount: negative for debits, positive for credits
    pub fn signed_amount(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Debit => -self.amount,
            TransactionType::Credit => self.amount,
        }
    }
}

/// Statement file formats the dispatcher understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Csv,
    Pdf,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }

    /// Infer the file type from a file name's extension, in any case
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.to_ascii_lowercase().parse()
    }
}

impl std::str::FromStr for FileType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(Self::Csv),
            "pdf" => Ok(Self::Pdf),
            _ => Err(Error::UnsupportedFileType(s.to_string())),
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Budget category assigned to an imported transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Income,
    Expense,
    Bill,
    Savings,
    Debt,
    Transfer,
}

/// How predictable a spending line is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpendingType {
    Fixed,
    Flexible,
    Discretionary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringPattern {
    Weekly,
    Biweekly,
    Monthly,
    Annual,
}

/// Input to the categorizer for one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizationRequest {
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    pub date: NaiveDate,
}

impl From<&ParsedTransaction> for CategorizationRequest {
    fn from(tx: &ParsedTransaction) -> Self {
        Self {
            description: tx.description.clone(),
            amount: tx.amount,
            merchant_name: tx.merchant_name.clone(),
            date: tx.date,
        }
    }
}

/// Categorizer output for one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizationResult {
    pub category: Category,
    pub subcategory: String,
    pub spending_type: SpendingType,
    /// 0-100
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_pattern: Option<RecurringPattern>,
    #[serde(default)]
    pub reasoning: String,
}

/// A parsed transaction that survived duplicate filtering, with its category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedTransaction {
    #[serde(flatten)]
    pub transaction: ParsedTransaction,
    pub categorization: CategorizationResult,
    /// True when the categorizer was unavailable and the fallback rules applied
    pub fallback: bool,
}

/// Result of one statement import, ready for an external persister
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub file_type: FileType,
    pub total_parsed: usize,
    pub duplicates_skipped: usize,
    pub transactions: Vec<CategorizedTransaction>,
}

impl ImportOutcome {
    pub fn transactions_imported(&self) -> usize {
        self.transactions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_new_takes_absolute_amount() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 16).unwrap();
        let tx = ParsedTransaction::new(date, "Gas Station", dec!(-45.50), TransactionType::Debit);
        assert_eq!(tx.amount, dec!(45.50));
        assert_eq!(tx.signed_amount(), dec!(-45.50));
    }

    #[test]
    fn test_file_type_parse() {
        assert_eq!("csv".parse::<FileType>().unwrap(), FileType::Csv);
        assert_eq!("pdf".parse::<FileType>().unwrap(), FileType::Pdf);
        for declared in ["xlsx", "CSV", " pdf ", ""] {
            let err = declared.parse::<FileType>().unwrap_err();
            assert!(matches!(err, Error::UnsupportedFileType(_)), "{:?}", declared);
        }
    }

    #[test]
    fn test_file_type_from_path() {
        assert_eq!(
            FileType::from_path(Path::new("statements/jan.csv")).unwrap(),
            FileType::Csv
        );
        assert_eq!(
            FileType::from_path(Path::new("jan.PDF")).unwrap(),
            FileType::Pdf
        );
        assert!(FileType::from_path(Path::new("jan.xlsx")).is_err());
        assert!(FileType::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_transaction_json_shape() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let tx = ParsedTransaction::new(date, "Amazon.com", dec!(50.00), TransactionType::Credit)
            .with_merchant("Amazon");
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["date"], "2025-01-15");
        assert_eq!(json["transactionType"], "credit");
        assert_eq!(json["merchantName"], "Amazon");

        let back: ParsedTransaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn test_existing_transaction_accepts_numeric_amount() {
        let json = r#"{"date":"2025-01-15","description":"Rent","amount":1200.5,"transactionType":"debit"}"#;
        let tx: ParsedTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.amount, dec!(1200.5));
        assert!(tx.merchant_name.is_none());
    }
}
