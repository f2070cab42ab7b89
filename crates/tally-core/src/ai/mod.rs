//! Pluggable AI backend abstraction
//!
//! Two jobs go to a language model during import:
//! - rebuilding a PDF statement's extracted text as `Date,Description,Amount` CSV
//! - categorizing the transactions that survive duplicate filtering
//!
//! # Architecture
//!
//! - `AIBackend` trait: the operations every backend provides
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `AnthropicBackend`, `OpenAICompatibleBackend`, `MockBackend`
//!
//! `AIClient` also implements [`StatementReconstructor`] and [`Categorizer`],
//! which is how the PDF parser and the import pipeline see it.
//!
//! # Configuration
//!
//! Environment variables (override the `[ai]` config section):
//! - `AI_BACKEND`: anthropic, openai_compatible, mock, or rules
//! - `ANTHROPIC_API_KEY`: required for the anthropic backend
//! - `ANTHROPIC_MODEL`: model name (default from config)
//! - `ANTHROPIC_BASE_URL`: API base (default: https://api.anthropic.com)
//! - `OPENAI_COMPATIBLE_HOST`: server URL (required for openai_compatible)
//! - `OPENAI_COMPATIBLE_MODEL`: model name (default from config)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required

mod anthropic;
mod mock;
mod openai_compatible;
pub mod parsing;

pub use anthropic::{AnthropicBackend, DEFAULT_ANTHROPIC_URL};
pub use mock::MockBackend;
pub use openai_compatible::OpenAICompatibleBackend;

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::warn;

use crate::categorize::Categorizer;
use crate::config::{AiSettings, BackendKind};
use crate::error::{Error, Result};
use crate::models::{CategorizationRequest, CategorizationResult};
use crate::pdf::StatementReconstructor;
use crate::prompts::{PromptId, PromptLibrary};

/// Operations every AI backend provides
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Turn extracted statement text into `Date,Description,Amount` CSV
    async fn reconstruct_statement(&self, statement_text: &str) -> Result<String>;

    /// Categorize a batch; results are positional
    async fn categorize_transactions(
        &self,
        requests: &[CategorizationRequest],
    ) -> Result<Vec<CategorizationResult>>;

    fn model(&self) -> &str;

    fn host(&self) -> &str;
}

/// Concrete AI client enum
#[derive(Clone)]
pub enum AIClient {
    /// Anthropic Messages API
    Anthropic(AnthropicBackend),
    /// Any OpenAI chat-completions server (vLLM, LocalAI, llama-server, ...)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Deterministic backend for tests and offline runs
    Mock(MockBackend),
}

impl AIClient {
    /// Backend selected by `AI_BACKEND`, or by config when it is unset or invalid
    pub fn selected_backend(settings: &AiSettings) -> BackendKind {
        match std::env::var("AI_BACKEND") {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                warn!(backend = %value, "Unknown AI_BACKEND, using {}", settings.backend);
                settings.backend
            }),
            Err(_) => settings.backend,
        }
    }

    /// Build a client from config, with environment variables taking precedence
    ///
    /// Returns `None` for the `rules` backend, or when `openai_compatible` is
    /// selected without a host. A missing Anthropic key still yields a client:
    /// it fails each call with [`Error::MissingCredential`] before touching
    /// the network, so CSV imports keep working and fall back to rule-based
    /// categorization.
    pub fn from_settings(settings: &AiSettings) -> Option<Self> {
        match Self::selected_backend(settings) {
            BackendKind::Anthropic => Some(AIClient::Anthropic(AnthropicBackend::from_env(settings))),
            BackendKind::OpenaiCompatible => {
                let backend = OpenAICompatibleBackend::from_env(settings);
                if backend.is_none() {
                    warn!("AI_BACKEND=openai_compatible but OPENAI_COMPATIBLE_HOST is not set");
                }
                backend.map(AIClient::OpenAICompatible)
            }
            BackendKind::Mock => Some(AIClient::Mock(MockBackend::new())),
            BackendKind::Rules => None,
        }
    }

    /// Client from environment variables and built-in defaults
    pub fn from_env() -> Option<Self> {
        Self::from_settings(&AiSettings::default())
    }

    pub fn anthropic(api_key: &str, model: &str) -> Self {
        AIClient::Anthropic(AnthropicBackend::new(Some(api_key.to_string()), model))
    }

    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Which backend this is, for logs and `tally config`
    pub fn kind(&self) -> BackendKind {
        match self {
            AIClient::Anthropic(_) => BackendKind::Anthropic,
            AIClient::OpenAICompatible(_) => BackendKind::OpenaiCompatible,
            AIClient::Mock(_) => BackendKind::Mock,
        }
    }
}

#[async_trait]
impl AIBackend for AIClient {
    async fn reconstruct_statement(&self, statement_text: &str) -> Result<String> {
        match self {
            AIClient::Anthropic(b) => b.reconstruct_statement(statement_text).await,
            AIClient::OpenAICompatible(b) => b.reconstruct_statement(statement_text).await,
            AIClient::Mock(b) => b.reconstruct_statement(statement_text).await,
        }
    }

    async fn categorize_transactions(
        &self,
        requests: &[CategorizationRequest],
    ) -> Result<Vec<CategorizationResult>> {
        match self {
            AIClient::Anthropic(b) => b.categorize_transactions(requests).await,
            AIClient::OpenAICompatible(b) => b.categorize_transactions(requests).await,
            AIClient::Mock(b) => b.categorize_transactions(requests).await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Anthropic(b) => b.model(),
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Anthropic(b) => b.host(),
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}

#[async_trait]
impl StatementReconstructor for AIClient {
    async fn reconstruct(&self, statement_text: &str) -> Result<String> {
        self.reconstruct_statement(statement_text).await
    }

    fn name(&self) -> &str {
        self.model()
    }
}

#[async_trait]
impl Categorizer for AIClient {
    async fn categorize(
        &self,
        requests: &[CategorizationRequest],
    ) -> Result<Vec<CategorizationResult>> {
        self.categorize_transactions(requests).await
    }

    fn name(&self) -> &str {
        self.model()
    }
}

/// Rendered system and user text for one request
pub(crate) struct RenderedPrompt {
    pub system: Option<String>,
    pub user: String,
}

pub(crate) fn render_prompt(
    prompts: &RwLock<PromptLibrary>,
    id: PromptId,
    vars: &HashMap<&str, &str>,
) -> Result<RenderedPrompt> {
    let mut prompts = prompts
        .write()
        .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
    let template = prompts.get(id)?;
    Ok(RenderedPrompt {
        system: template.system_section().map(str::to_string),
        user: template.render_user(vars),
    })
}

pub(crate) fn reconstruction_prompt(
    prompts: &RwLock<PromptLibrary>,
    statement_text: &str,
) -> Result<RenderedPrompt> {
    let mut vars = HashMap::new();
    vars.insert("statement_text", statement_text);
    render_prompt(prompts, PromptId::ReconstructStatement, &vars)
}

pub(crate) fn categorization_prompt(
    prompts: &RwLock<PromptLibrary>,
    requests: &[CategorizationRequest],
) -> Result<RenderedPrompt> {
    let transactions = serde_json::to_string_pretty(requests)?;
    let count = requests.len().to_string();
    let mut vars = HashMap::new();
    vars.insert("transactions", transactions.as_str());
    vars.insert("count", count.as_str());
    render_prompt(prompts, PromptId::CategorizeTransactions, &vars)
}

/// Reconstruction failures keep their kind only for missing credentials;
/// everything else (HTTP, bad status, empty body) is a reconstruction failure.
pub(crate) fn reconstruction_error(err: Error) -> Error {
    match err {
        Error::MissingCredential(_) | Error::Reconstruction(_) => err,
        other => Error::Reconstruction(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_client_mock() {
        let client = AIClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
        assert_eq!(client.kind(), BackendKind::Mock);
    }

    #[test]
    fn test_reconstruction_error_mapping() {
        let err = reconstruction_error(Error::InvalidData("HTTP 500".into()));
        assert!(matches!(err, Error::Reconstruction(_)));

        let err = reconstruction_error(Error::MissingCredential("ANTHROPIC_API_KEY".into()));
        assert!(matches!(err, Error::MissingCredential(_)));
    }

    #[test]
    fn test_prompts_render() {
        let prompts = RwLock::new(PromptLibrary::embedded_only());
        let rendered = reconstruction_prompt(&prompts, "01/15 COFFEE -4.50").unwrap();
        assert!(rendered.user.contains("01/15 COFFEE -4.50"));
        assert!(rendered.user.contains("Date,Description,Amount"));
        assert!(rendered.system.is_some());

        let requests = vec![CategorizationRequest {
            description: "NETFLIX.COM".into(),
            amount: rust_decimal_macros::dec!(15.99),
            merchant_name: Some("Netflix".into()),
            date: chrono::NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        }];
        let rendered = categorization_prompt(&prompts, &requests).unwrap();
        assert!(rendered.user.contains("\"merchantName\": \"Netflix\""));
        assert!(rendered.user.contains("exactly 1 objects"));
    }

    #[tokio::test]
    async fn test_mock_client_as_reconstructor() {
        let client = AIClient::mock();
        let csv = client
            .reconstruct("01/15/2025 STARBUCKS #123 -5.75\n")
            .await
            .unwrap();
        assert!(csv.starts_with("Date,Description,Amount"));
        assert!(csv.contains("STARBUCKS"));
    }
}
