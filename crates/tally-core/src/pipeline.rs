//! Statement import pipeline
//!
//! parse → reject empty → filter duplicates → categorize
//!
//! The importer never persists anything. The caller supplies stored
//! transactions and persists [`ImportOutcome::transactions`]. Only stored
//! transactions inside [`DuplicateDetector::existing_window`] of the parsed
//! batch are compared.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::ai::AIClient;
use crate::categorize::{categorize_batch, Categorizer};
use crate::config::ImportConfig;
use crate::dedup::DuplicateDetector;
use crate::dispatch::StatementParser;
use crate::error::{Error, Result};
use crate::models::{FileType, ImportOutcome, ParsedTransaction};

#[derive(Clone)]
pub struct StatementImporter {
    parser: StatementParser,
    detector: DuplicateDetector,
    categorizer: Option<Arc<dyn Categorizer>>,
    timeout: Option<Duration>,
}

impl StatementImporter {
    pub fn new(parser: StatementParser, detector: DuplicateDetector) -> Self {
        Self {
            parser,
            detector,
            categorizer: None,
            timeout: None,
        }
    }

    /// Importer wired from configuration, with the configured AI backend
    /// handling both PDF reconstruction and categorization
    pub fn from_config(config: &ImportConfig) -> Self {
        let mut importer = Self::new(
            StatementParser::from_config(config),
            DuplicateDetector::new(config.duplicates.tolerance_days),
        )
        .with_timeout(config.ai.timeout);

        if let Some(client) = AIClient::from_settings(&config.ai) {
            importer = importer.with_categorizer(Arc::new(client));
        }
        importer
    }

    pub fn with_categorizer(mut self, categorizer: Arc<dyn Categorizer>) -> Self {
        self.categorizer = Some(categorizer);
        self
    }

    /// Categorize with the fallback rules only
    pub fn without_categorizer(mut self) -> Self {
        self.categorizer = None;
        self
    }

    /// Budget for parsing one file, and separately for one categorization batch
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn detector(&self) -> &DuplicateDetector {
        &self.detector
    }

    pub fn parser(&self) -> &StatementParser {
        &self.parser
    }

    /// Import one statement against the caller's stored transactions
    pub async fn import(
        &self,
        bytes: &[u8],
        file_type: FileType,
        existing: &[ParsedTransaction],
    ) -> Result<ImportOutcome> {
        let parse = self.parser.parse_statement(bytes, file_type);
        let parsed = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, parse)
                .await
                .map_err(|_| Error::Timeout(limit.as_secs()))??,
            None => parse.await?,
        };

        if parsed.is_empty() {
            return Err(Error::NoValidTransactions);
        }
        let total_parsed = parsed.len();

        let in_window: Vec<ParsedTransaction> = match self.detector.existing_window(&parsed) {
            Some(window) => existing
                .iter()
                .filter(|stored| window.contains(stored.date))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        debug!(
            existing = existing.len(),
            in_window = in_window.len(),
            "Checking duplicates"
        );
        let report = self.detector.filter_new(parsed, &in_window);
        let duplicates_skipped = report.duplicates.len();

        let transactions =
            categorize_batch(self.categorizer.as_deref(), report.new, self.timeout).await;

        let outcome = ImportOutcome {
            file_type,
            total_parsed,
            duplicates_skipped,
            transactions,
        };

        info!(
            %file_type,
            parsed = outcome.total_parsed,
            duplicates = outcome.duplicates_skipped,
            imported = outcome.transactions_imported(),
            "Import complete"
        );
        Ok(outcome)
    }

    /// Read a file and import it, inferring the type from its extension
    pub async fn import_file(
        &self,
        path: &Path,
        existing: &[ParsedTransaction],
    ) -> Result<ImportOutcome> {
        let file_type = FileType::from_path(path)?;
        let bytes = tokio::fs::read(path).await?;
        self.import(&bytes, file_type, existing).await
    }
}
