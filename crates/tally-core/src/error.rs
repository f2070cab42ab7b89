//! Error types for Tally

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported file type: {0}. Please upload a CSV or PDF file.")]
    UnsupportedFileType(String),

    #[error("Failed to parse CSV file. Please check the format. ({0})")]
    Csv(#[from] csv::Error),

    #[error("Statement is not valid UTF-8 text: {0}")]
    Encoding(String),

    #[error("Failed to extract text from PDF: {0}")]
    Extraction(String),

    #[error("Missing credential: {0} is not configured")]
    MissingCredential(String),

    #[error("Statement reconstruction failed: {0}")]
    Reconstruction(String),

    #[error("No valid transactions found in file")]
    NoValidTransactions,

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Coarse classification of an [`Error`] for callers that need to decide
/// how to report it (user-facing message, operator alert, retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller misuse (e.g. an unsupported declared file type). Not retryable.
    InputValidation,
    /// The file could not be tokenized or its text could not be extracted.
    StructuralParse,
    /// A required credential or setting is missing. Operator problem.
    Precondition,
    /// The file parsed but held no usable transactions.
    NoTransactions,
    /// An external collaborator (AI service, network) failed.
    External,
    /// Anything else: I/O, configuration, malformed internal data.
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedFileType(_) => ErrorKind::InputValidation,
            Error::Csv(_) | Error::Encoding(_) | Error::Extraction(_) => ErrorKind::StructuralParse,
            Error::MissingCredential(_) => ErrorKind::Precondition,
            Error::NoValidTransactions => ErrorKind::NoTransactions,
            Error::Reconstruction(_) | Error::Timeout(_) | Error::Http(_) => ErrorKind::External,
            Error::Io(_)
            | Error::Json(_)
            | Error::Regex(_)
            | Error::Config(_)
            | Error::InvalidData(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_message() {
        let err = Error::UnsupportedFileType("xlsx".into());
        assert!(err.to_string().contains("Unsupported file type"));
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }

    #[test]
    fn test_kinds_are_distinct() {
        assert_eq!(
            Error::MissingCredential("ANTHROPIC_API_KEY".into()).kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            Error::Extraction("bad header".into()).kind(),
            ErrorKind::StructuralParse
        );
        assert_eq!(
            Error::Reconstruction("empty".into()).kind(),
            ErrorKind::External
        );
        assert_eq!(Error::NoValidTransactions.kind(), ErrorKind::NoTransactions);
    }
}
