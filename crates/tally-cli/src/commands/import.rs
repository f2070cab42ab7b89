//! Statement command implementations

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{StatementImporter, StatementParser};

use super::{load_config, read_transactions, resolve_file_type, write_json};

/// Parse a statement and print the transactions as JSON
pub async fn cmd_parse(config_path: Option<&Path>, file: &Path, file_type: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let file_type = resolve_file_type(file, file_type)?;
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to open file: {}", file.display()))?;

    let transactions = StatementParser::from_config(&config)
        .parse_statement(&bytes, file_type)
        .await
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    eprintln!("Parsed {} transactions", transactions.len());
    write_json(&transactions, None)
}

/// Import a statement: parse, skip duplicates of `existing`, categorize
pub async fn cmd_import(
    config_path: Option<&Path>,
    file: &Path,
    file_type: Option<&str>,
    existing: Option<&Path>,
    tolerance: Option<i64>,
    output: Option<&Path>,
    no_ai: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(days) = tolerance {
        anyhow::ensure!(days >= 0, "--tolerance must be >= 0, got {}", days);
        config.duplicates.tolerance_days = days;
    }

    let file_type = resolve_file_type(file, file_type)?;
    let existing = match existing {
        Some(path) => read_transactions(path)?,
        None => Vec::new(),
    };
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to open file: {}", file.display()))?;

    let mut importer = StatementImporter::from_config(&config);
    if no_ai {
        importer = importer.without_categorizer();
    }

    eprintln!("📥 Importing {} ({})...", file.display(), file_type);

    let outcome = importer
        .import(&bytes, file_type, &existing)
        .await
        .with_context(|| format!("Failed to import {}", file.display()))?;

    let fallbacks = outcome.transactions.iter().filter(|t| t.fallback).count();

    eprintln!("✅ Import complete!");
    eprintln!("   Parsed: {}", outcome.total_parsed);
    eprintln!("   Skipped (duplicates): {}", outcome.duplicates_skipped);
    eprintln!("   To import: {}", outcome.transactions_imported());
    if fallbacks > 0 {
        eprintln!("   Categorized by fallback rules: {}", fallbacks);
    }

    write_json(&outcome, output)?;
    if let Some(path) = output {
        eprintln!("   Written to {}", path.display());
    }
    Ok(())
}
