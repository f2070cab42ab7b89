//! PDF statement parsing
//!
//! A PDF import runs three steps in sequence:
//! 1. [`TextExtractor`] pulls the text layer out of the PDF bytes
//! 2. [`StatementReconstructor`] rewrites that text as `Date,Description,Amount` CSV
//! 3. the CSV parser turns the reconstruction into transactions
//!
//! Any step failing fails the whole file; there are no partial results.

mod rules;

pub use rules::LineReconstructor;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::ai::parsing::strip_code_fences;
use crate::csv_parser::CsvStatementParser;
use crate::error::{Error, Result};
use crate::models::ParsedTransaction;

/// Extracts plain text from a document
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, bytes: &[u8]) -> Result<String>;
}

/// Turns extracted statement text into CSV with `Date,Description,Amount` columns
#[async_trait]
pub trait StatementReconstructor: Send + Sync {
    async fn reconstruct(&self, statement_text: &str) -> Result<String>;

    /// Short label for logs
    fn name(&self) -> &str;
}

/// Text extraction with `pdf-extract`, run on the blocking pool
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract_text(&self, bytes: &[u8]) -> Result<String> {
        let owned = bytes.to_vec();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&owned))
            .await
            .map_err(|e| Error::Extraction(format!("PDF extraction aborted: {}", e)))?
            .map_err(|e| Error::Extraction(e.to_string()))?;

        if text.trim().is_empty() {
            return Err(Error::Extraction(
                "PDF has no text layer (scanned statements are not supported)".into(),
            ));
        }

        debug!(chars = text.len(), "Extracted PDF text");
        Ok(text)
    }
}

/// Extract, reconstruct, then parse as CSV
#[derive(Clone)]
pub struct PdfStatementParser {
    extractor: Arc<dyn TextExtractor>,
    reconstructor: Arc<dyn StatementReconstructor>,
    csv: CsvStatementParser,
}

impl PdfStatementParser {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        reconstructor: Arc<dyn StatementReconstructor>,
        csv: CsvStatementParser,
    ) -> Self {
        Self {
            extractor,
            reconstructor,
            csv,
        }
    }

    /// Parser using `pdf-extract` and the given reconstructor
    pub fn with_reconstructor(reconstructor: Arc<dyn StatementReconstructor>) -> Self {
        Self::new(
            Arc::new(PdfTextExtractor),
            reconstructor,
            CsvStatementParser::default(),
        )
    }

    pub async fn parse(&self, bytes: &[u8]) -> Result<Vec<ParsedTransaction>> {
        let text = self.extractor.extract_text(bytes).await?;
        if text.trim().is_empty() {
            return Err(Error::Extraction("No text extracted from PDF".into()));
        }

        let reconstructed = self.reconstructor.reconstruct(&text).await?;
        let csv = strip_code_fences(&reconstructed);
        debug!(
            reconstructor = self.reconstructor.name(),
            csv_lines = csv.lines().count(),
            "Reconstructed PDF statement"
        );

        self.csv.parse(&csv)
    }
}
