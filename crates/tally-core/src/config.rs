//! Import configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/tally/config/import.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! An override file only needs the keys it changes. Omitted keys keep the
//! built-in values, and a `[[merchants]]` list in an override replaces the
//! whole default rule table.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::csv_parser::ColumnSynonyms;
use crate::error::{Error, Result};
use crate::merchant::{default_rules, MerchantRule};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/import.toml");

/// Default date window for duplicate matching, in days
pub const DEFAULT_TOLERANCE_DAYS: i64 = 1;

/// Which service reconstructs PDFs and categorizes transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Anthropic,
    OpenaiCompatible,
    Mock,
    /// No AI: deterministic PDF line scanner, fallback categorization
    Rules,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenaiCompatible => "openai_compatible",
            Self::Mock => "mock",
            Self::Rules => "rules",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai_compatible" | "openai-compatible" | "openai" => Ok(Self::OpenaiCompatible),
            "mock" => Ok(Self::Mock),
            "rules" | "none" => Ok(Self::Rules),
            other => Err(Error::Config(format!("Unknown AI backend: {}", other))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSettings {
    pub tolerance_days: i64,
}

impl Default for DuplicateSettings {
    fn default() -> Self {
        Self {
            tolerance_days: DEFAULT_TOLERANCE_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiSettings {
    pub backend: BackendKind,
    pub model: String,
    pub max_tokens: u32,
    /// Whole-file budget for one PDF import or categorization batch
    pub timeout: Duration,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Anthropic,
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 8000,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Effective import configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportConfig {
    pub columns: ColumnSynonyms,
    pub merchants: Vec<MerchantRule>,
    pub duplicates: DuplicateSettings,
    pub ai: AiSettings,
}

impl ImportConfig {
    /// Built-in configuration, ignoring any override file
    pub fn builtin() -> Self {
        Self {
            merchants: default_rules(),
            ..Default::default()
        }
    }

    /// Load from the default override location, or the embedded defaults
    pub fn load() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => parse_config(DEFAULT_CONFIG),
        }
    }

    /// Load an explicit override file. A missing file is an error here,
    /// since the caller asked for it by name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        parse_config(&content)
    }

    /// Parse TOML content merged over the built-in defaults
    pub fn parse(content: &str) -> Result<Self> {
        parse_config(content)
    }

    /// The embedded default file, verbatim
    pub fn embedded_toml() -> &'static str {
        DEFAULT_CONFIG
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config").join("import.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    columns: Option<RawColumns>,
    merchants: Option<Vec<MerchantRule>>,
    duplicates: Option<RawDuplicates>,
    ai: Option<RawAi>,
}

#[derive(Debug, Deserialize)]
struct RawColumns {
    date: Option<Vec<String>>,
    description: Option<Vec<String>>,
    debit: Option<Vec<String>>,
    credit: Option<Vec<String>>,
    amount: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawDuplicates {
    tolerance_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawAi {
    backend: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

fn parse_config(content: &str) -> Result<ImportConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = ImportConfig::builtin();

    if let Some(columns) = raw.columns {
        let target = &mut config.columns;
        for (value, slot) in [
            (columns.date, &mut target.date),
            (columns.description, &mut target.description),
            (columns.debit, &mut target.debit),
            (columns.credit, &mut target.credit),
            (columns.amount, &mut target.amount),
        ] {
            if let Some(names) = value {
                *slot = names;
            }
        }
        if config.columns.date.is_empty() {
            return Err(Error::Config("[columns] date must list at least one header".into()));
        }
    }

    if let Some(merchants) = raw.merchants {
        if let Some(rule) = merchants.iter().find(|r| r.pattern.trim().is_empty()) {
            return Err(Error::Config(format!(
                "Merchant rule for '{}' has an empty pattern",
                rule.name
            )));
        }
        config.merchants = merchants;
    }

    if let Some(duplicates) = raw.duplicates {
        if let Some(days) = duplicates.tolerance_days {
            if days < 0 {
                return Err(Error::Config(format!(
                    "[duplicates] tolerance_days must be >= 0, got {}",
                    days
                )));
            }
            config.duplicates.tolerance_days = days;
        }
    }

    if let Some(ai) = raw.ai {
        if let Some(backend) = ai.backend {
            config.ai.backend = backend.parse()?;
        }
        if let Some(model) = ai.model {
            config.ai.model = model;
        }
        if let Some(max_tokens) = ai.max_tokens {
            config.ai.max_tokens = max_tokens;
        }
        if let Some(timeout) = ai.timeout_secs {
            config.ai.timeout = Duration::from_secs(timeout);
        }
    }

    Ok(config)
}
