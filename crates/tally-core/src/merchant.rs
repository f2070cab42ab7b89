//! Merchant name normalization
//!
//! Turns a raw bank description such as `"POS AMAZON.COM*ABC123"` into a short
//! label (`"Amazon"`). Cleanup runs first (method prefixes, reference numbers,
//! trailing dates), then an ordered rule table maps known substrings to a
//! display name. Unknown merchants come back as the cleaned description with
//! their original casing.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Built-in rule table, in match order
pub const DEFAULT_MERCHANT_RULES: &[(&str, &str)] = &[
    ("AMAZON.COM", "Amazon"),
    ("AMZN", "Amazon"),
    ("WAL-MART", "Walmart"),
    ("WALMART", "Walmart"),
    ("TARGET", "Target"),
    ("STARBUCKS", "Starbucks"),
    ("MCDONALD", "McDonald's"),
    ("UBER", "Uber"),
    ("LYFT", "Lyft"),
    ("NETFLIX", "Netflix"),
    ("SPOTIFY", "Spotify"),
    ("APPLE.COM", "Apple"),
    ("GOOGLE", "Google"),
];

/// A case-insensitive substring rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantRule {
    pub pattern: String,
    pub name: String,
}

impl MerchantRule {
    pub fn new(pattern: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            name: name.into(),
        }
    }
}

/// The built-in rules as owned values
pub fn default_rules() -> Vec<MerchantRule> {
    DEFAULT_MERCHANT_RULES
        .iter()
        .map(|(pattern, name)| MerchantRule::new(*pattern, *name))
        .collect()
}

struct Cleanup {
    method_prefix: Regex,
    star_reference: Regex,
    hash_reference: Regex,
    trailing_date: Regex,
}

static CLEANUP: LazyLock<Cleanup> = LazyLock::new(|| Cleanup {
    method_prefix: Regex::new(r"(?i)^(POS|ATM|ACH|DEBIT|CREDIT|ONLINE|RECURRING)\s+")
        .expect("valid regex"),
    star_reference: Regex::new(r"(?s)\*\d+.*$").expect("valid regex"),
    hash_reference: Regex::new(r"(?s)#\d+.*$").expect("valid regex"),
    trailing_date: Regex::new(r"(?s)\s+\d{2}/\d{2}.*$").expect("valid regex"),
});

static DEFAULT_NORMALIZER: LazyLock<MerchantNormalizer> =
    LazyLock::new(|| MerchantNormalizer::new(default_rules()));

/// Strip method prefixes, reference numbers and trailing dates
pub fn clean_description(description: &str) -> String {
    let cleanup = &*CLEANUP;
    let cleaned = cleanup.method_prefix.replace(description, "");
    let cleaned = cleanup.star_reference.replace(&cleaned, "");
    let cleaned = cleanup.hash_reference.replace(&cleaned, "");
    let cleaned = cleanup.trailing_date.replace(&cleaned, "");
    cleaned.trim().to_string()
}

/// Normalize with the built-in rule table
pub fn normalize_merchant_name(description: &str) -> String {
    DEFAULT_NORMALIZER.normalize(description)
}

/// Normalizer over a configurable rule table
#[derive(Debug, Clone)]
pub struct MerchantNormalizer {
    /// (uppercased pattern, display name)
    rules: Vec<(String, String)>,
}

impl MerchantNormalizer {
    pub fn new(rules: Vec<MerchantRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter(|r| !r.pattern.is_empty())
            .map(|r| (r.pattern.to_uppercase(), r.name))
            .collect();
        Self { rules }
    }

    /// Number of rules in the table
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Display name for a known merchant, if any rule matches
    pub fn lookup(&self, cleaned: &str) -> Option<&str> {
        let upper = cleaned.to_uppercase();
        self.rules
            .iter()
            .find(|(pattern, _)| upper.contains(pattern.as_str()))
            .map(|(_, name)| name.as_str())
    }

    /// Normalize a raw description. Never fails.
    pub fn normalize(&self, description: &str) -> String {
        let cleaned = clean_description(description);
        match self.lookup(&cleaned) {
            Some(name) => name.to_string(),
            None => cleaned,
        }
    }
}

impl Default for MerchantNormalizer {
    fn default() -> Self {
        DEFAULT_NORMALIZER.clone()
    }
}
