//! Tally Core Library
//!
//! Statement import engine for the Tally budgeting app:
//! - CSV statement parsing with configurable column synonyms
//! - PDF statement parsing (text extraction + CSV reconstruction)
//! - Merchant name normalization
//! - Duplicate detection against stored transactions
//! - Transaction categorization with rule-based fallback
//! - Pluggable AI backends (Anthropic, OpenAI-compatible, mock)
//! - Prompt library for customizable AI prompts

pub mod ai;
pub mod categorize;
pub mod config;
pub mod csv_parser;
pub mod dedup;
pub mod dispatch;
pub mod error;
pub mod merchant;
pub mod models;
pub mod pdf;
pub mod pipeline;
pub mod prompts;

/// Test utilities including a mock Anthropic server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AIClient, AnthropicBackend, MockBackend, OpenAICompatibleBackend};
pub use categorize::{categorize_batch, fallback_categorization, Categorizer};
pub use config::{AiSettings, BackendKind, DuplicateSettings, ImportConfig};
pub use csv_parser::{parse_csv, ColumnSynonyms, CsvStatementParser};
pub use dedup::{
    is_duplicate, is_duplicate_default, DateWindow, DuplicateDetector, DuplicatePair,
    DuplicateReport, AMOUNT_TOLERANCE,
};
pub use dispatch::{parse_statement, StatementParser};
pub use error::{Error, ErrorKind, Result};
pub use merchant::{normalize_merchant_name, MerchantNormalizer, MerchantRule};
pub use models::{
    CategorizationRequest, CategorizationResult, CategorizedTransaction, Category, FileType,
    ImportOutcome, ParsedTransaction, RecurringPattern, SpendingType, TransactionType,
};
pub use pdf::{
    LineReconstructor, PdfStatementParser, PdfTextExtractor, StatementReconstructor, TextExtractor,
};
pub use pipeline::StatementImporter;
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
