//! Anthropic Messages API backend
//!
//! Sends a single user message (plus the prompt's system section) to
//! `POST {base_url}/v1/messages` and joins the text blocks of the reply.
//!
//! # Configuration
//!
//! - `ANTHROPIC_API_KEY`: required; without it every call fails fast with
//!   `Error::MissingCredential` and no request is sent
//! - `ANTHROPIC_MODEL`: overrides `[ai] model`
//! - `ANTHROPIC_BASE_URL`: overrides the public endpoint (used by tests)

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AiSettings;
use crate::error::{Error, Result};
use crate::models::{CategorizationRequest, CategorizationResult};
use crate::prompts::PromptLibrary;

use super::parsing::{clean_csv_response, parse_categorizations};
use super::{categorization_prompt, reconstruction_error, reconstruction_prompt, AIBackend};

pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Anthropic Messages API request
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Anthropic Messages API response (the parts we read)
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }
}

#[derive(Clone)]
pub struct AnthropicBackend {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl AnthropicBackend {
    /// Backend against the public API with the default token budget
    pub fn new(api_key: Option<String>, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: DEFAULT_ANTHROPIC_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.to_string(),
            max_tokens: AiSettings::default().max_tokens,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Build from `[ai]` settings with `ANTHROPIC_*` variables on top
    pub fn from_env(settings: &AiSettings) -> Self {
        let api_key = std::env::var(API_KEY_VAR).ok();
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| settings.model.clone());
        let mut backend = Self::new(api_key, &model).with_max_tokens(settings.max_tokens);
        if let Ok(url) = std::env::var("ANTHROPIC_BASE_URL") {
            backend = backend.with_base_url(&url);
        }
        backend
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send one prompt and return the reply text
    pub async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::MissingCredential(API_KEY_VAR.into()))?;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending Anthropic request");

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::InvalidData(format!(
                "Anthropic API error ({}): {}",
                status, body
            )));
        }

        let messages_response: MessagesResponse = response.json().await?;
        if messages_response.stop_reason.as_deref() == Some("max_tokens") {
            warn!(
                max_tokens = self.max_tokens,
                "Anthropic response hit max_tokens; output may be truncated"
            );
        }

        messages_response
            .text()
            .ok_or_else(|| Error::InvalidData("No text in Anthropic response".into()))
    }
}

#[async_trait]
impl AIBackend for AnthropicBackend {
    async fn reconstruct_statement(&self, statement_text: &str) -> Result<String> {
        let prompt = reconstruction_prompt(&self.prompts, statement_text)?;
        let response = self
            .complete(prompt.system.as_deref(), &prompt.user)
            .await
            .map_err(reconstruction_error)?;
        clean_csv_response(&response)
    }

    async fn categorize_transactions(
        &self,
        requests: &[CategorizationRequest],
    ) -> Result<Vec<CategorizationResult>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let prompt = categorization_prompt(&self.prompts, requests)?;
        let response = self.complete(prompt.system.as_deref(), &prompt.user).await?;
        debug!(chars = response.len(), "Anthropic categorization response");
        parse_categorizations(&response)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
