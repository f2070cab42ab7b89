//! Shared command utilities and the `config` command

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tally_core::{
    config::default_config_path, prompts::default_prompts_dir, AIBackend, AIClient, FileType,
    ImportConfig, ParsedTransaction,
};

/// Load the import config: an explicit `--config` path, else the default
/// override location, else the built-in defaults
pub fn load_config(path: Option<&Path>) -> Result<ImportConfig> {
    match path {
        Some(path) => ImportConfig::from_path(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => ImportConfig::load().context("Failed to load config"),
    }
}

/// File type from `--type`, or from the file extension
pub fn resolve_file_type(file: &Path, declared: Option<&str>) -> Result<FileType> {
    let file_type = match declared {
        Some(declared) => declared.parse::<FileType>()?,
        None => FileType::from_path(file)?,
    };
    Ok(file_type)
}

/// Read a JSON array of transactions
pub fn read_transactions(path: &Path) -> Result<Vec<ParsedTransaction>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse transactions JSON: {}", path.display()))
}

/// Pretty-print JSON to a file, or to stdout when no path is given
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

/// Show the effective configuration and where overrides are read from
pub fn cmd_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    println!("Tally Configuration");
    println!("{}", "=".repeat(50));
    println!();

    let source = match config_path {
        Some(path) => path.display().to_string(),
        None => match default_config_path() {
            Some(path) if path.exists() => path.display().to_string(),
            _ => "(built-in defaults)".to_string(),
        },
    };
    println!("Config source:     {}", source);
    println!(
        "Override path:     {}",
        default_config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not available)".to_string())
    );
    println!(
        "Prompt overrides:  {}",
        default_prompts_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not available)".to_string())
    );

    println!();
    println!("Columns:");
    println!("  date:        {}", config.columns.date.join(", "));
    println!("  description: {}", config.columns.description.join(", "));
    println!("  debit:       {}", config.columns.debit.join(", "));
    println!("  credit:      {}", config.columns.credit.join(", "));
    println!("  amount:      {}", config.columns.amount.join(", "));

    println!();
    println!("Merchant rules:    {}", config.merchants.len());
    println!(
        "Duplicate window:  ±{} day(s), amounts within 0.005",
        config.duplicates.tolerance_days
    );

    println!();
    println!("AI backend:        {}", config.ai.backend);
    match AIClient::from_settings(&config.ai) {
        Some(client) => {
            println!("  Active:          {}", client.kind());
            println!("  Model:           {}", client.model());
            println!("  Host:            {}", client.host());
        }
        None => println!("  Active:          rules (line scanner for PDFs, fallback categories)"),
    }
    println!("  Max tokens:      {}", config.ai.max_tokens);
    println!("  Timeout:         {}s", config.ai.timeout.as_secs());

    Ok(())
}
