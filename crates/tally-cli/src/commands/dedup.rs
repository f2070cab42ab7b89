//! Duplicate and merchant command implementations

use std::path::Path;

use anyhow::Result;
use tally_core::{DuplicateDetector, MerchantNormalizer};

use super::{load_config, read_transactions};

/// Print the normalized merchant name for a description
pub fn cmd_normalize(config_path: Option<&Path>, description: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let normalizer = MerchantNormalizer::new(config.merchants);
    println!("{}", normalizer.normalize(description));
    Ok(())
}

/// Flag every (left, right) pair the duplicate rule matches
pub fn cmd_dedup(
    config_path: Option<&Path>,
    left: &Path,
    right: &Path,
    tolerance: Option<i64>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let tolerance = tolerance.unwrap_or(config.duplicates.tolerance_days);
    anyhow::ensure!(tolerance >= 0, "--tolerance must be >= 0, got {}", tolerance);

    let left_txs = read_transactions(left)?;
    let right_txs = read_transactions(right)?;

    let pairs = DuplicateDetector::new(tolerance).find_pairs(&left_txs, &right_txs);

    if pairs.is_empty() {
        println!("No duplicates found (tolerance ±{} day(s))", tolerance);
        return Ok(());
    }

    println!("Found {} duplicate pair(s):\n", pairs.len());
    for pair in &pairs {
        let a = &left_txs[pair.left];
        let b = &right_txs[pair.right];
        println!(
            "  [{}] {} {:>10} {:<30}  ~  [{}] {} {:>10} {}",
            pair.left,
            a.date,
            a.signed_amount(),
            truncate(&a.description, 30),
            pair.right,
            b.date,
            b.signed_amount(),
            b.description
        );
    }

    Ok(())
}

/// Truncate to at most `max` characters, marking the cut with "..."
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
