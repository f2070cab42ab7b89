//! Route statement bytes to the right parser by declared file type

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::ai::AIClient;
use crate::config::{AiSettings, BackendKind, ImportConfig};
use crate::csv_parser::CsvStatementParser;
use crate::error::{Error, Result};
use crate::merchant::MerchantNormalizer;
use crate::models::{FileType, ParsedTransaction};
use crate::pdf::{
    LineReconstructor, PdfStatementParser, PdfTextExtractor, StatementReconstructor, TextExtractor,
};

const UTF8_BOM: char = '\u{feff}';

/// Parses CSV or PDF statements into canonical transactions
#[derive(Clone)]
pub struct StatementParser {
    csv: CsvStatementParser,
    extractor: Arc<dyn TextExtractor>,
    reconstructor: Option<Arc<dyn StatementReconstructor>>,
}

impl Default for StatementParser {
    fn default() -> Self {
        Self::new(CsvStatementParser::default())
    }
}

impl StatementParser {
    /// CSV-only parser; PDFs fail with a missing credential until a
    /// reconstructor is attached
    pub fn new(csv: CsvStatementParser) -> Self {
        Self {
            csv,
            extractor: Arc::new(PdfTextExtractor),
            reconstructor: None,
        }
    }

    pub fn with_reconstructor(mut self, reconstructor: Arc<dyn StatementReconstructor>) -> Self {
        self.reconstructor = Some(reconstructor);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Parser wired from configuration: column synonyms and merchant rules
    /// from the config, and a reconstructor for the selected AI backend.
    /// The `rules` backend reconstructs PDFs with [`LineReconstructor`];
    /// `openai_compatible` without a host fails PDF imports with
    /// [`Error::MissingCredential`].
    pub fn from_config(config: &ImportConfig) -> Self {
        let csv = CsvStatementParser::new(
            config.columns.clone(),
            MerchantNormalizer::new(config.merchants.clone()),
        );
        Self::new(csv).with_reconstructor(default_reconstructor(&config.ai))
    }

    pub fn has_reconstructor(&self) -> bool {
        self.reconstructor.is_some()
    }

    /// Parse with a caller-declared type string (`"csv"` or `"pdf"`)
    pub async fn parse(&self, bytes: &[u8], declared_type: &str) -> Result<Vec<ParsedTransaction>> {
        let file_type: FileType = declared_type.parse()?;
        self.parse_statement(bytes, file_type).await
    }

    pub async fn parse_statement(
        &self,
        bytes: &[u8],
        file_type: FileType,
    ) -> Result<Vec<ParsedTransaction>> {
        debug!(%file_type, bytes = bytes.len(), "Parsing statement");
        match file_type {
            FileType::Csv => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| Error::Encoding(e.to_string()))?;
                self.csv.parse(text.trim_start_matches(UTF8_BOM))
            }
            FileType::Pdf => {
                let reconstructor = self.reconstructor.clone().ok_or_else(|| {
                    Error::MissingCredential("a statement reconstructor for PDF import".into())
                })?;
                PdfStatementParser::new(self.extractor.clone(), reconstructor, self.csv.clone())
                    .parse(bytes)
                    .await
            }
        }
    }
}

/// Parse with default column synonyms and the environment-selected AI backend
pub async fn parse_statement(bytes: &[u8], file_type: FileType) -> Result<Vec<ParsedTransaction>> {
    StatementParser::default()
        .with_reconstructor(default_reconstructor(&AiSettings::default()))
        .parse_statement(bytes, file_type)
        .await
}

fn default_reconstructor(settings: &AiSettings) -> Arc<dyn StatementReconstructor> {
    if let Some(client) = AIClient::from_settings(settings) {
        return Arc::new(client);
    }
    match AIClient::selected_backend(settings) {
        BackendKind::Rules => Arc::new(LineReconstructor::new()),
        _ => Arc::new(Unconfigured("OPENAI_COMPATIBLE_HOST")),
    }
}

/// Stands in for an AI backend whose connection setting is missing
struct Unconfigured(&'static str);

#[async_trait]
impl StatementReconstructor for Unconfigured {
    async fn reconstruct(&self, _statement_text: &str) -> Result<String> {
        Err(Error::MissingCredential(self.0.into()))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::TransactionType;
    use rust_decimal_macros::dec;

    struct FixedText(&'static str);

    #[async_trait]
    impl TextExtractor for FixedText {
        async fn extract_text(&self, _bytes: &[u8]) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_unsupported_type() {
        let err = StatementParser::default()
            .parse(b"a,b\n1,2\n", "xlsx")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported file type"));
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }

    #[tokio::test]
    async fn test_declared_type_is_exact() {
        let csv = b"Date,Description,Amount\n01/15/2025,Coffee,-4.50\n";
        let transactions = StatementParser::default().parse(csv, "csv").await.unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].transaction_type, TransactionType::Debit);

        let err = StatementParser::default().parse(csv, "CSV").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }

    #[tokio::test]
    async fn test_csv_bom_is_stripped() {
        let csv = "\u{feff}Date,Description,Amount\n2025-01-15,Coffee,-4.50\n";
        let transactions = StatementParser::default()
            .parse_statement(csv.as_bytes(), FileType::Csv)
            .await
            .unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount, dec!(4.50));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_encoding_error() {
        let err = StatementParser::default()
            .parse_statement(&[0xff, 0xfe, 0x00, b'a'], FileType::Csv)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
        assert_eq!(err.kind(), ErrorKind::StructuralParse);
    }

    #[tokio::test]
    async fn test_pdf_without_reconstructor() {
        let parser = StatementParser::default().with_extractor(Arc::new(FixedText("01/15/2025 X -1.00")));
        assert!(!parser.has_reconstructor());
        let err = parser.parse(b"%PDF", "pdf").await.unwrap_err();
        assert!(matches!(err, Error::MissingCredential(_)));
    }

    #[tokio::test]
    async fn test_pdf_with_line_reconstructor() {
        let parser = StatementParser::default()
            .with_extractor(Arc::new(FixedText("01/15/2025 STARBUCKS #12 -5.75\n")))
            .with_reconstructor(Arc::new(LineReconstructor::new()));
        let transactions = parser.parse(b"%PDF", "pdf").await.unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].merchant_name.as_deref(), Some("Starbucks"));
    }

    #[test]
    fn test_from_config_rules_backend_has_reconstructor() {
        let mut config = ImportConfig::builtin();
        config.ai.backend = BackendKind::Rules;
        assert!(StatementParser::from_config(&config).has_reconstructor());
    }

    #[tokio::test]
    async fn test_from_config_openai_compatible_without_host_fails_pdf() {
        if std::env::var("OPENAI_COMPATIBLE_HOST").is_ok() || std::env::var("AI_BACKEND").is_ok() {
            return;
        }
        let mut config = ImportConfig::builtin();
        config.ai.backend = BackendKind::OpenaiCompatible;

        let parser = StatementParser::from_config(&config)
            .with_extractor(Arc::new(FixedText("01/15/2025 STARBUCKS #12 -5.75\n")));
        assert!(parser.has_reconstructor());

        let err = parser.parse(b"%PDF", "pdf").await.unwrap_err();
        assert!(matches!(err, Error::MissingCredential(ref var) if var == "OPENAI_COMPATIBLE_HOST"));
        assert_eq!(err.kind(), ErrorKind::Precondition);

        // CSV does not need the backend
        let csv = b"Date,Description,Amount\n01/15/2025,Coffee,-4.50\n";
        assert_eq!(parser.parse(csv, "csv").await.unwrap().len(), 1);
    }
}
