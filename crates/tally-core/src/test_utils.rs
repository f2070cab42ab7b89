//! Test utilities for tally-core
//!
//! A mock Anthropic Messages API server for integration tests and offline
//! development. Point `AnthropicBackend::with_base_url` (or
//! `ANTHROPIC_BASE_URL`) at [`MockAnthropicServer::url`].
//!
//! The server tells the two prompts apart by their trailing markers:
//! - `Statement text:`: answers with the rule-based reconstruction of the
//!   text, wrapped in a ```` ```csv ```` fence the way models often reply
//! - `Transactions to categorize:`: answers with one categorization per
//!   input transaction, after a line of prose

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

use crate::models::CategorizationRequest;
use crate::pdf::LineReconstructor;

const STATEMENT_MARKER: &str = "Statement text:";
const TRANSACTIONS_MARKER: &str = "Transactions to categorize:";

/// How the mock answers `POST /v1/messages`
#[derive(Debug, Clone, Default)]
pub enum MockBehavior {
    /// Reconstruct and categorize
    #[default]
    Normal,
    /// Reply to every request with this HTTP status
    Status(u16),
    /// Reply 200 with this exact text content
    Text(String),
}

#[derive(Clone)]
struct MockState {
    behavior: MockBehavior,
    requests: Arc<AtomicUsize>,
}

/// Mock Anthropic server bound to an ephemeral local port
pub struct MockAnthropicServer {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockAnthropicServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        Self::start_with(MockBehavior::Normal).await
    }

    pub async fn start_with(behavior: MockBehavior) -> Self {
        let requests = Arc::new(AtomicUsize::new(0));
        let state = MockState {
            behavior,
            requests: requests.clone(),
        };
        let app = Router::new()
            .route("/v1/messages", post(handle_messages))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            requests,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of `/v1/messages` requests received so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockAnthropicServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Deserialize)]
struct MessagesRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

async fn handle_messages(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(request): Json<MessagesRequest>,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);

    if !headers.contains_key("x-api-key") || !headers.contains_key("anthropic-version") {
        return (StatusCode::UNAUTHORIZED, "missing x-api-key").into_response();
    }

    let text = match &state.behavior {
        MockBehavior::Status(code) => {
            let status = StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, "mock failure").into_response();
        }
        MockBehavior::Text(text) => text.clone(),
        MockBehavior::Normal => {
            let prompt = request
                .messages
                .last()
                .map(|m| m.content.as_str())
                .unwrap_or_default();
            respond_to(prompt)
        }
    };

    Json(json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "model": request.model,
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
    }))
    .into_response()
}

fn respond_to(prompt: &str) -> String {
    if let Some((_, statement)) = prompt.split_once(STATEMENT_MARKER) {
        let csv = LineReconstructor::new()
            .reconstruct_text(statement)
            .unwrap_or_else(|_| "Date,Description,Amount\n".to_string());
        return format!("```csv\n{}```", csv);
    }

    if let Some((_, transactions)) = prompt.split_once(TRANSACTIONS_MARKER) {
        let requests: Vec<CategorizationRequest> =
            serde_json::from_str(transactions.trim()).unwrap_or_default();
        let results: Vec<serde_json::Value> = requests.iter().map(categorize_mock).collect();
        return format!(
            "Here are the categorizations:\n```json\n{}\n```",
            serde_json::to_string_pretty(&results).unwrap()
        );
    }

    "I'm not sure what you're asking.".to_string()
}

fn categorize_mock(request: &CategorizationRequest) -> serde_json::Value {
    let d = request.description.to_uppercase();
    if d.contains("PAYROLL") || d.contains("DEPOSIT") {
        json!({
            "category": "income",
            "subcategory": "Salary",
            "spendingType": "fixed",
            "confidence": 92,
            "isRecurring": true,
            "recurringPattern": "biweekly",
            "reasoning": "Employer deposit"
        })
    } else if d.contains("NETFLIX") || d.contains("SPOTIFY") {
        json!({
            "category": "bill",
            "subcategory": "Subscriptions",
            "spendingType": "fixed",
            "confidence": 95,
            "isRecurring": true,
            "recurringPattern": "monthly",
            "reasoning": "Streaming subscription"
        })
    } else {
        json!({
            "category": "expense",
            "subcategory": "Shopping",
            "spendingType": "discretionary",
            "confidence": 60,
            "isRecurring": false,
            "reasoning": "General purchase"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respond_to_reconstruction_prompt() {
        let reply = respond_to("Statement text:\n01/15/2025 COFFEE SHOP -4.50\n");
        assert!(reply.starts_with("```csv\nDate,Description,Amount"));
        assert!(reply.contains("01/15/2025,COFFEE SHOP,-4.50"));
    }

    #[test]
    fn test_respond_to_categorization_prompt() {
        let prompt = r#"Transactions to categorize:
[{"description":"NETFLIX.COM","amount":15.99,"date":"2025-01-15"}]"#;
        let reply = respond_to(prompt);
        assert!(reply.contains("\"subcategory\": \"Subscriptions\""));
    }

    fn backend(server: &MockAnthropicServer) -> crate::ai::AnthropicBackend {
        crate::ai::AnthropicBackend::new(Some("test-key".into()), "claude-test")
            .with_base_url(&server.url())
            .with_prompts(crate::prompts::PromptLibrary::embedded_only())
    }

    #[tokio::test]
    async fn test_anthropic_backend_round_trip() {
        use crate::ai::AIBackend;

        let server = MockAnthropicServer::start().await;
        let backend = backend(&server);

        let csv = backend
            .reconstruct_statement("Period ending 2025\n01/15 NETFLIX.COM -15.99\n")
            .await
            .unwrap();
        assert!(csv.starts_with("Date,Description,Amount"));
        assert!(!csv.contains("```"));

        let requests = vec![CategorizationRequest {
            description: "NETFLIX.COM".into(),
            amount: rust_decimal_macros::dec!(15.99),
            merchant_name: Some("Netflix".into()),
            date: chrono::NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        }];
        let results = backend.categorize_transactions(&requests).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].subcategory, "Subscriptions");
        assert_eq!(server.request_count(), 2);
    }

    #[tokio::test]
    async fn test_anthropic_error_status_is_reconstruction_error() {
        use crate::ai::AIBackend;

        let server = MockAnthropicServer::start_with(MockBehavior::Status(529)).await;
        let err = backend(&server).reconstruct_statement("text").await.unwrap_err();
        assert!(matches!(err, crate::error::Error::Reconstruction(_)));
    }

    #[tokio::test]
    async fn test_anthropic_prose_reply_fails_categorization() {
        use crate::ai::AIBackend;

        let server = MockAnthropicServer::start_with(MockBehavior::Text("No idea.".into())).await;
        let requests = vec![CategorizationRequest {
            description: "X".into(),
            amount: rust_decimal_macros::dec!(1),
            merchant_name: None,
            date: chrono::NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        }];
        assert!(backend(&server).categorize_transactions(&requests).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_server_requires_api_key() {
        let server = MockAnthropicServer::start().await;
        let response = reqwest::Client::new()
            .post(format!("{}/v1/messages", server.url()))
            .json(&json!({"model": "m", "messages": [{"role": "user", "content": "hi"}]}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401);
        assert_eq!(server.request_count(), 1);
    }
}
