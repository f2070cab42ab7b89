//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::fs;
use std::path::{Path, PathBuf};

use tally_core::{FileType, ImportOutcome, ParsedTransaction, TransactionType};
use tempfile::TempDir;

use crate::commands::{self, placeholder_list, truncate};

const STATEMENT: &str = "\
Date,Description,Amount
01/15/2025,NETFLIX.COM,-15.99
01/16/2025,ACME PAYROLL,2000.00
01/17/2025,WAL-MART #1234,-42.10
";

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Config that keeps tests off the network
fn rules_config(dir: &TempDir) -> PathBuf {
    write(dir, "import.toml", "[ai]\nbackend = \"rules\"\n")
}

fn read_outcome(path: &Path) -> ImportOutcome {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ========== Import Command Tests ==========

#[tokio::test]
async fn test_cmd_import_writes_outcome() {
    let dir = TempDir::new().unwrap();
    let config = rules_config(&dir);
    let file = write(&dir, "jan.csv", STATEMENT);
    let out = dir.path().join("out.json");

    commands::cmd_import(Some(&config), &file, None, None, None, Some(&out), true)
        .await
        .unwrap();

    let outcome = read_outcome(&out);
    assert_eq!(outcome.file_type, FileType::Csv);
    assert_eq!(outcome.total_parsed, 3);
    assert_eq!(outcome.duplicates_skipped, 0);
    assert!(outcome.transactions.iter().all(|t| t.fallback));
    assert_eq!(
        outcome.transactions[2].transaction.merchant_name.as_deref(),
        Some("Walmart")
    );
}

#[tokio::test]
async fn test_cmd_import_skips_existing() {
    let dir = TempDir::new().unwrap();
    let config = rules_config(&dir);
    let file = write(&dir, "jan.csv", STATEMENT);
    let existing = write(
        &dir,
        "existing.json",
        r#"[{"date":"2025-01-16","description":"Netflix.com","amount":15.99,"transactionType":"debit"}]"#,
    );
    let out = dir.path().join("out.json");

    commands::cmd_import(Some(&config), &file, None, Some(&existing), None, Some(&out), true)
        .await
        .unwrap();
    assert_eq!(read_outcome(&out).duplicates_skipped, 1);

    // Zero tolerance: the stored copy is a day off
    commands::cmd_import(Some(&config), &file, None, Some(&existing), Some(0), Some(&out), true)
        .await
        .unwrap();
    assert_eq!(read_outcome(&out).duplicates_skipped, 0);
}

#[tokio::test]
async fn test_cmd_import_ignores_existing_outside_statement_dates() {
    let dir = TempDir::new().unwrap();
    let config = rules_config(&dir);
    let file = write(&dir, "jan.csv", STATEMENT);
    // Statement covers 01/15..01/17; this copy is a day before it starts
    let existing = write(
        &dir,
        "existing.json",
        r#"[{"date":"2025-01-14","description":"NETFLIX.COM","amount":15.99,"transactionType":"debit"}]"#,
    );
    let out = dir.path().join("out.json");

    commands::cmd_import(Some(&config), &file, None, Some(&existing), None, Some(&out), true)
        .await
        .unwrap();
    let outcome = read_outcome(&out);
    assert_eq!(outcome.duplicates_skipped, 0);
    assert_eq!(outcome.transactions.len(), 3);
}

#[tokio::test]
async fn test_cmd_parse_declared_type_is_exact() {
    let dir = TempDir::new().unwrap();
    let config = rules_config(&dir);
    let file = write(&dir, "jan.csv", STATEMENT);
    assert!(commands::cmd_parse(Some(&config), &file, Some("CSV")).await.is_err());
}

#[tokio::test]
async fn test_cmd_import_mock_backend_categorizes() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "import.toml", "[ai]\nbackend = \"mock\"\n");
    let file = write(&dir, "jan.csv", STATEMENT);
    let out = dir.path().join("out.json");

    commands::cmd_import(Some(&config), &file, None, None, None, Some(&out), false)
        .await
        .unwrap();

    let outcome = read_outcome(&out);
    assert!(!outcome.transactions[0].fallback);
    assert_eq!(outcome.transactions[0].categorization.subcategory, "Subscriptions");
}

#[tokio::test]
async fn test_cmd_import_empty_statement_fails() {
    let dir = TempDir::new().unwrap();
    let config = rules_config(&dir);
    let file = write(&dir, "empty.csv", "Date,Description,Amount\n");

    let err = commands::cmd_import(Some(&config), &file, None, None, None, None, true)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("No valid transactions found in file"));
}

#[tokio::test]
async fn test_cmd_import_rejects_negative_tolerance() {
    let dir = TempDir::new().unwrap();
    let config = rules_config(&dir);
    let file = write(&dir, "jan.csv", STATEMENT);

    let result = commands::cmd_import(Some(&config), &file, None, None, Some(-1), None, true).await;
    assert!(result.is_err());
}

// ========== Parse Command Tests ==========

#[tokio::test]
async fn test_cmd_parse_declared_type_overrides_extension() {
    let dir = TempDir::new().unwrap();
    let config = rules_config(&dir);
    let file = write(&dir, "statement.txt", STATEMENT);

    assert!(commands::cmd_parse(Some(&config), &file, None).await.is_err());
    assert!(commands::cmd_parse(Some(&config), &file, Some("csv")).await.is_ok());
}

#[tokio::test]
async fn test_cmd_parse_unsupported_type() {
    let dir = TempDir::new().unwrap();
    let config = rules_config(&dir);
    let file = write(&dir, "jan.csv", STATEMENT);

    let err = commands::cmd_parse(Some(&config), &file, Some("xlsx"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Unsupported file type"));
}

#[tokio::test]
async fn test_cmd_parse_missing_file() {
    let dir = TempDir::new().unwrap();
    let config = rules_config(&dir);
    let result = commands::cmd_parse(Some(&config), &dir.path().join("nope.csv"), None).await;
    assert!(result.is_err());
}

// ========== Dedup / Normalize Command Tests ==========

#[test]
fn test_cmd_dedup() {
    let dir = TempDir::new().unwrap();
    let config = rules_config(&dir);
    let left = write(
        &dir,
        "left.json",
        r#"[{"date":"2025-01-15","description":"Amazon.com","amount":50,"transactionType":"debit"}]"#,
    );
    let right = write(
        &dir,
        "right.json",
        r#"[{"date":"2025-01-15","description":"AMAZON.COM*ABC123","amount":"50.00","transactionType":"debit"}]"#,
    );

    assert!(commands::cmd_dedup(Some(&config), &left, &right, None).is_ok());
    assert!(commands::cmd_dedup(Some(&config), &left, &right, Some(-2)).is_err());
}

#[test]
fn test_read_transactions() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "txs.json",
        r#"[{"date":"2025-01-15","description":"Rent","amount":1200,"transactionType":"debit"}]"#,
    );
    let txs: Vec<ParsedTransaction> = commands::read_transactions(&path).unwrap();
    assert_eq!(txs[0].transaction_type, TransactionType::Debit);

    let bad = write(&dir, "bad.json", "{not json");
    assert!(commands::read_transactions(&bad).is_err());
}

#[test]
fn test_cmd_normalize() {
    let dir = TempDir::new().unwrap();
    let config = rules_config(&dir);
    assert!(commands::cmd_normalize(Some(&config), "AMAZON.COM*ABC123").is_ok());
}

#[test]
fn test_resolve_file_type() {
    assert_eq!(
        commands::resolve_file_type(Path::new("a.PDF"), None).unwrap(),
        FileType::Pdf
    );
    assert_eq!(
        commands::resolve_file_type(Path::new("a.bin"), Some("csv")).unwrap(),
        FileType::Csv
    );
    assert!(commands::resolve_file_type(Path::new("a.xlsx"), None).is_err());
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a much longer description", 10), "a much ...");
    assert_eq!(truncate("ÄÖÜÄÖÜÄÖÜÄÖÜ", 5), "ÄÖ...");
}

// ========== Config / Prompts Command Tests ==========

#[test]
fn test_cmd_config() {
    let dir = TempDir::new().unwrap();
    let config = rules_config(&dir);
    assert!(commands::cmd_config(Some(&config)).is_ok());

    let bad = write(&dir, "bad.toml", "[duplicates]\ntolerance_days = -3\n");
    assert!(commands::cmd_config(Some(&bad)).is_err());
    assert!(commands::cmd_config(Some(&dir.path().join("missing.toml"))).is_err());
}

#[test]
fn test_cmd_prompts() {
    assert!(commands::cmd_prompts_list().is_ok());
    assert!(commands::cmd_prompts_show("reconstruct_statement").is_ok());
    let err = commands::cmd_prompts_show("nonexistent").unwrap_err();
    assert!(err.to_string().contains("categorize_transactions"));
}

#[test]
fn test_placeholder_list() {
    assert_eq!(placeholder_list(&["count", "transactions"]), "{{count}} {{transactions}}");
    assert_eq!(placeholder_list(&[]), "");
}
