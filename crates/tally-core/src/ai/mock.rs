//! Mock backend for testing
//!
//! Deterministic stand-in for a language model. Reconstruction runs the
//! rule-based line scanner; categorization matches a few well-known
//! merchants and otherwise answers with a low-confidence expense.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{
    CategorizationRequest, CategorizationResult, Category, RecurringPattern, SpendingType,
};
use crate::pdf::LineReconstructor;

use super::AIBackend;

#[derive(Clone, Default)]
pub struct MockBackend {
    /// Canned reconstruction output, returned verbatim when set
    pub reconstruction: Option<String>,
    /// Fail every call with a reconstruction/categorization error
    pub failing: bool,
    /// Return this many fewer categorizations than requested
    pub short_by: usize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose every call fails, for exercising fallbacks
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_reconstruction(mut self, csv: impl Into<String>) -> Self {
        self.reconstruction = Some(csv.into());
        self
    }

    pub fn with_short_response(mut self, missing: usize) -> Self {
        self.short_by = missing;
        self
    }
}

fn result(
    category: Category,
    subcategory: &str,
    spending_type: SpendingType,
    recurring: Option<RecurringPattern>,
    reasoning: &str,
) -> CategorizationResult {
    CategorizationResult {
        category,
        subcategory: subcategory.to_string(),
        spending_type,
        confidence: if recurring.is_some() { 90.0 } else { 75.0 },
        is_recurring: recurring.is_some(),
        recurring_pattern: recurring,
        reasoning: reasoning.to_string(),
    }
}

fn categorize_one(request: &CategorizationRequest) -> CategorizationResult {
    let text = format!(
        "{} {}",
        request.description,
        request.merchant_name.as_deref().unwrap_or_default()
    )
    .to_uppercase();

    match text.as_str() {
        t if t.contains("NETFLIX") || t.contains("SPOTIFY") => result(
            Category::Bill,
            "Subscriptions",
            SpendingType::Fixed,
            Some(RecurringPattern::Monthly),
            "Streaming subscription",
        ),
        t if t.contains("PAYROLL") || t.contains("SALARY") || t.contains("DIRECT DEP") => result(
            Category::Income,
            "Salary",
            SpendingType::Fixed,
            Some(RecurringPattern::Biweekly),
            "Employer deposit",
        ),
        t if t.contains("RENT") => result(
            Category::Bill,
            "Rent",
            SpendingType::Fixed,
            Some(RecurringPattern::Monthly),
            "Housing payment",
        ),
        t if t.contains("STARBUCKS") || t.contains("MCDONALD") => result(
            Category::Expense,
            "Restaurants",
            SpendingType::Discretionary,
            None,
            "Dining out",
        ),
        t if t.contains("WALMART") || t.contains("TARGET") || t.contains("GROCER") => result(
            Category::Expense,
            "Groceries",
            SpendingType::Flexible,
            None,
            "General merchandise",
        ),
        t if t.contains("SAVINGS") => result(
            Category::Savings,
            "Savings Transfer",
            SpendingType::Fixed,
            None,
            "Transfer to savings",
        ),
        _ => CategorizationResult {
            category: Category::Expense,
            subcategory: "Other".to_string(),
            spending_type: SpendingType::Flexible,
            confidence: 40.0,
            is_recurring: false,
            recurring_pattern: None,
            reasoning: "No strong signal".to_string(),
        },
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn reconstruct_statement(&self, statement_text: &str) -> Result<String> {
        if self.failing {
            return Err(Error::Reconstruction("mock backend configured to fail".into()));
        }
        match &self.reconstruction {
            Some(csv) => Ok(csv.clone()),
            None => LineReconstructor::new().reconstruct_text(statement_text),
        }
    }

    async fn categorize_transactions(
        &self,
        requests: &[CategorizationRequest],
    ) -> Result<Vec<CategorizationResult>> {
        if self.failing {
            return Err(Error::InvalidData("mock backend configured to fail".into()));
        }
        let keep = requests.len().saturating_sub(self.short_by);
        Ok(requests.iter().take(keep).map(categorize_one).collect())
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn request(description: &str) -> CategorizationRequest {
        CategorizationRequest {
            description: description.to_string(),
            amount: dec!(10),
            merchant_name: None,
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_mock_categorize_known_merchants() {
        let mock = MockBackend::new();
        let results = mock
            .categorize_transactions(&[request("NETFLIX.COM"), request("ACME PAYROLL"), request("???")])
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].category, Category::Bill);
        assert!(results[0].is_recurring);
        assert_eq!(results[1].category, Category::Income);
        assert_eq!(results[2].subcategory, "Other");
    }

    #[tokio::test]
    async fn test_mock_short_response() {
        let mock = MockBackend::new().with_short_response(1);
        let results = mock
            .categorize_transactions(&[request("a"), request("b")])
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let mock = MockBackend::failing();
        assert!(mock.reconstruct_statement("x").await.is_err());
        assert!(mock.categorize_transactions(&[request("a")]).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_canned_reconstruction() {
        let mock = MockBackend::new().with_reconstruction("Date,Description,Amount\n");
        assert_eq!(
            mock.reconstruct_statement("ignored").await.unwrap(),
            "Date,Description,Amount\n"
        );
    }
}
