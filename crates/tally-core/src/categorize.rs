//! Transaction categorization
//!
//! Survivors of duplicate filtering are sent to a [`Categorizer`] in one
//! batch. Results are positional. When the categorizer errors, times out,
//! or answers with too few results, the affected transactions get
//! [`fallback_categorization`] instead, so an import never fails because
//! categorization did.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{
    CategorizationRequest, CategorizationResult, CategorizedTransaction, Category,
    ParsedTransaction, SpendingType, TransactionType,
};

/// Credit descriptions that read as incoming money rather than a refund
const DEPOSIT_KEYWORDS: &[&str] = &[
    "deposit",
    "salary",
    "paycheck",
    "payment from",
    "zelle payment from",
    "venmo",
    "transfer from",
];

const REFUND_KEYWORDS: &[&str] = &["refund", "return"];

/// Assigns categories to a batch of transactions
#[async_trait]
pub trait Categorizer: Send + Sync {
    /// One result per request, in request order
    async fn categorize(
        &self,
        requests: &[CategorizationRequest],
    ) -> Result<Vec<CategorizationResult>>;

    /// Short label for logs
    fn name(&self) -> &str;
}

/// Rule-based category used when no categorizer result is available
pub fn fallback_categorization(tx: &ParsedTransaction) -> CategorizationResult {
    let mut result = CategorizationResult {
        category: Category::Expense,
        subcategory: "Uncategorized".to_string(),
        spending_type: SpendingType::Flexible,
        confidence: 0.0,
        is_recurring: false,
        recurring_pattern: None,
        reasoning: "fallback".to_string(),
    };

    if tx.transaction_type == TransactionType::Credit {
        let description = tx.description.to_lowercase();
        if DEPOSIT_KEYWORDS.iter().any(|k| description.contains(k)) {
            result.category = Category::Income;
            result.subcategory = "Deposit".to_string();
        } else if REFUND_KEYWORDS.iter().any(|k| description.contains(k)) {
            result.category = Category::Income;
            result.subcategory = "Refund".to_string();
        }
    }

    result
}

fn with_fallback(transactions: Vec<ParsedTransaction>) -> Vec<CategorizedTransaction> {
    transactions
        .into_iter()
        .map(|transaction| CategorizedTransaction {
            categorization: fallback_categorization(&transaction),
            transaction,
            fallback: true,
        })
        .collect()
}

/// Categorize a batch, falling back per transaction where needed
///
/// `categorizer` of `None` means rule-based categorization only.
pub async fn categorize_batch(
    categorizer: Option<&dyn Categorizer>,
    transactions: Vec<ParsedTransaction>,
    timeout: Option<Duration>,
) -> Vec<CategorizedTransaction> {
    let Some(categorizer) = categorizer else {
        return with_fallback(transactions);
    };
    if transactions.is_empty() {
        return Vec::new();
    }

    let requests: Vec<CategorizationRequest> =
        transactions.iter().map(CategorizationRequest::from).collect();

    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, categorizer.categorize(&requests))
            .await
            .unwrap_or(Err(Error::Timeout(limit.as_secs()))),
        None => categorizer.categorize(&requests).await,
    };

    let results = match outcome {
        Ok(results) => results,
        Err(e) => {
            warn!(
                categorizer = categorizer.name(),
                count = transactions.len(),
                "Categorization failed, using fallback rules: {}",
                e
            );
            return with_fallback(transactions);
        }
    };

    if results.len() < transactions.len() {
        warn!(
            expected = transactions.len(),
            received = results.len(),
            "Categorizer returned too few results; remaining transactions use fallback rules"
        );
    } else if results.len() > transactions.len() {
        warn!(
            expected = transactions.len(),
            received = results.len(),
            "Categorizer returned extra results; ignoring them"
        );
    }

    let mut results = results.into_iter();
    let categorized: Vec<CategorizedTransaction> = transactions
        .into_iter()
        .map(|transaction| match results.next() {
            Some(categorization) => CategorizedTransaction {
                transaction,
                categorization,
                fallback: false,
            },
            None => CategorizedTransaction {
                categorization: fallback_categorization(&transaction),
                transaction,
                fallback: true,
            },
        })
        .collect();

    debug!(
        categorizer = categorizer.name(),
        count = categorized.len(),
        fallbacks = categorized.iter().filter(|c| c.fallback).count(),
        "Categorization complete"
    );
    categorized
}
