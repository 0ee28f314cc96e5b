//! AI-backed transaction categorization with a deterministic
//! keyword fallback.
//!
//! The model is asked for a strict JSON object; any shape mismatch,
//! unknown category, or provider failure falls closed to keyword
//! inference. The returned category is never empty.

use fiscus_core::{
    prompt::Prompt,
    traits::Responder,
    types::{Transaction, TransactionKind},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::llm_json::strip_code_fences;

/// Categories available for income transactions.
pub const INCOME_CATEGORIES: &[&str] = &[
    "Salary",
    "Freelance",
    "Investment Returns",
    "Rental Income",
    "Business Income",
    "Refunds",
    "Gifts",
    "Other Income",
];

/// Categories available for expense transactions.
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Food & Dining",
    "Groceries",
    "Transportation",
    "Utilities",
    "Housing",
    "Healthcare",
    "Entertainment",
    "Shopping",
    "Education",
    "Insurance",
    "Travel",
    "Personal Care",
    "Subscriptions",
    "Taxes",
    "Other Expenses",
];

/// Confidence assigned to keyword-fallback categorizations.
const FALLBACK_CONFIDENCE: f64 = 0.4;

/// A categorization decision for one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryResult {
    pub category: String,
    pub confidence: f64,
    pub subcategory: Option<String>,
}

/// Expected JSON shape of the model's answer.
#[derive(Deserialize)]
struct ModelCategory {
    category: String,
    confidence: f64,
    #[serde(default)]
    subcategory: Option<String>,
}

fn categories_for(kind: TransactionKind) -> &'static [&'static str] {
    match kind {
        TransactionKind::Income => INCOME_CATEGORIES,
        TransactionKind::Expense => EXPENSE_CATEGORIES,
    }
}

fn default_category(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Income => "Other Income",
        TransactionKind::Expense => "Other Expenses",
    }
}

/// Deterministic keyword inference used when the model is unavailable
/// or returns an unusable answer.
pub fn infer_category(description: &str, kind: TransactionKind) -> &'static str {
    let lower = description.to_lowercase();
    let matches = |kws: &[&str]| kws.iter().any(|kw| lower.contains(kw));

    match kind {
        TransactionKind::Income => {
            if matches(&["salary", "payroll", "wages"]) {
                "Salary"
            } else if matches(&["freelance", "contract"]) {
                "Freelance"
            } else if matches(&["dividend", "interest", "investment"]) {
                "Investment Returns"
            } else if matches(&["refund"]) {
                "Refunds"
            } else {
                "Other Income"
            }
        }
        TransactionKind::Expense => {
            if matches(&["restaurant", "cafe", "food"]) {
                "Food & Dining"
            } else if matches(&["grocery", "supermarket", "market"]) {
                "Groceries"
            } else if matches(&["uber", "lyft", "gas", "fuel"]) {
                "Transportation"
            } else if matches(&["electric", "water", "internet", "phone"]) {
                "Utilities"
            } else if matches(&["rent", "mortgage"]) {
                "Housing"
            } else if matches(&["netflix", "spotify", "subscription"]) {
                "Subscriptions"
            } else if matches(&["insurance"]) {
                "Insurance"
            } else if matches(&["doctor", "hospital", "pharmacy"]) {
                "Healthcare"
            } else {
                "Other Expenses"
            }
        }
    }
}

/// AI-backed categorizer over a responder.
pub struct Categorizer {
    responder: Arc<dyn Responder>,
}

impl Categorizer {
    pub fn new(responder: Arc<dyn Responder>) -> Self {
        Self { responder }
    }

    fn system_prompt(kind: TransactionKind) -> String {
        let kind_name = match kind {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        };
        format!(
            "You are a financial transaction categorization expert. Analyze transaction descriptions and assign the most appropriate category with a confidence score.\n\n\
             Available {kind_name} categories:\n{}\n\n\
             Rules:\n\
             - Analyze the transaction description carefully\n\
             - Consider common merchant names, keywords, and patterns\n\
             - Return a confidence score between 0 and 1 (1 = very confident)\n\
             - Be specific: \"Food & Dining\" for restaurants, \"Groceries\" for supermarkets\n\
             - Default to \"{}\" if uncertain\n\n\
             Respond with JSON in this exact format:\n\
             {{\n  \"category\": \"selected category from the list\",\n  \"confidence\": 0.95,\n  \"subcategory\": \"optional specific detail\"\n}}",
            categories_for(kind).join(", "),
            default_category(kind),
        )
    }

    /// Strictly parse a model reply. Returns `None` on any shape
    /// mismatch or when the category is not in the allowed list.
    fn parse_reply(text: &str, kind: TransactionKind) -> Option<CategoryResult> {
        let json = strip_code_fences(text);
        let parsed: ModelCategory = serde_json::from_str(json).ok()?;
        if !categories_for(kind).contains(&parsed.category.as_str()) {
            return None;
        }
        Some(CategoryResult {
            category: parsed.category,
            confidence: parsed.confidence.clamp(0.0, 1.0),
            subcategory: parsed.subcategory,
        })
    }

    /// Categorize one transaction description. Never fails and never
    /// returns an empty category.
    pub async fn categorize(
        &self,
        description: &str,
        amount: f64,
        kind: TransactionKind,
    ) -> CategoryResult {
        let kind_name = match kind {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        };
        let prompt = Prompt::new(format!(
            "Categorize this {kind_name} transaction:\nDescription: {description}\nAmount: ${amount}"
        ))
        .with_system(Self::system_prompt(kind));

        match self.responder.generate(&prompt).await {
            Ok(reply) => {
                if let Some(result) = Self::parse_reply(&reply.text, kind) {
                    debug!(
                        "categorized '{description}' as {} ({:.2})",
                        result.category, result.confidence
                    );
                    return result;
                }
                warn!("unusable categorization reply for '{description}', using keyword fallback");
            }
            Err(e) => {
                warn!("categorization failed for '{description}': {e}");
            }
        }

        CategoryResult {
            category: infer_category(description, kind).to_string(),
            confidence: FALLBACK_CONFIDENCE,
            subcategory: None,
        }
    }

    /// Re-run categorization over a whole transaction set, in place.
    pub async fn recategorize_all(&self, transactions: &mut [Transaction]) {
        for t in transactions {
            let result = self.categorize(&t.description, t.amount, t.kind).await;
            t.category = result.category;
            t.category_confidence = Some(result.confidence);
            t.subcategory = result.subcategory;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fiscus_core::error::FiscusError;
    use fiscus_core::prompt::Reply;

    /// Responder returning a fixed reply, or failing.
    struct MockResponder {
        reply: Option<String>,
    }

    #[async_trait]
    impl Responder for MockResponder {
        fn name(&self) -> &str {
            "mock"
        }

        fn requires_api_key(&self) -> bool {
            false
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn generate(&self, _prompt: &Prompt) -> Result<Reply, FiscusError> {
            match &self.reply {
                Some(text) => Ok(Reply {
                    text: text.clone(),
                    provider: "mock".into(),
                    tokens_used: None,
                    processing_ms: 1,
                }),
                None => Err(FiscusError::Provider("mock down".into())),
            }
        }
    }

    fn categorizer(reply: Option<&str>) -> Categorizer {
        Categorizer::new(Arc::new(MockResponder {
            reply: reply.map(str::to_string),
        }))
    }

    #[tokio::test]
    async fn test_valid_model_reply_used() {
        let c = categorizer(Some(
            r#"{"category":"Groceries","confidence":0.93,"subcategory":"Supermarket"}"#,
        ));
        let result = c
            .categorize("WHOLE FOODS MARKET", 84.20, TransactionKind::Expense)
            .await;
        assert_eq!(result.category, "Groceries");
        assert!((result.confidence - 0.93).abs() < 1e-9);
        assert_eq!(result.subcategory.as_deref(), Some("Supermarket"));
    }

    #[tokio::test]
    async fn test_fenced_model_reply_used() {
        let c = categorizer(Some(
            "```json\n{\"category\":\"Subscriptions\",\"confidence\":0.9}\n```",
        ));
        let result = c
            .categorize("NETFLIX.COM", 15.99, TransactionKind::Expense)
            .await;
        assert_eq!(result.category, "Subscriptions");
    }

    #[tokio::test]
    async fn test_unknown_category_falls_back() {
        let c = categorizer(Some(r#"{"category":"Pet Care","confidence":0.9}"#));
        let result = c
            .categorize("VET CLINIC", 120.0, TransactionKind::Expense)
            .await;
        assert_eq!(result.category, "Other Expenses");
        assert!((result.confidence - FALLBACK_CONFIDENCE).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_prose_reply_falls_back() {
        let c = categorizer(Some("This looks like groceries to me!"));
        let result = c
            .categorize("TRADER JOES", 45.0, TransactionKind::Expense)
            .await;
        assert_eq!(result.category, "Groceries");
        assert!((result.confidence - FALLBACK_CONFIDENCE).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back_deterministically() {
        let c = categorizer(None);
        let a = c
            .categorize("UBER TRIP 123", 18.50, TransactionKind::Expense)
            .await;
        let b = c
            .categorize("UBER TRIP 123", 18.50, TransactionKind::Expense)
            .await;
        assert_eq!(a.category, "Transportation");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_category_never_empty() {
        let c = categorizer(Some(""));
        let result = c.categorize("", 0.0, TransactionKind::Income).await;
        assert!(!result.category.is_empty());
        assert_eq!(result.category, "Other Income");
    }

    #[test]
    fn test_confidence_clamped() {
        let result =
            Categorizer::parse_reply(r#"{"category":"Salary","confidence":1.7}"#, TransactionKind::Income)
                .unwrap();
        assert!((result.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_infer_income_keywords() {
        assert_eq!(infer_category("ACME PAYROLL", TransactionKind::Income), "Salary");
        assert_eq!(infer_category("quarterly dividend", TransactionKind::Income), "Investment Returns");
        assert_eq!(infer_category("amazon refund", TransactionKind::Income), "Refunds");
        assert_eq!(infer_category("misc", TransactionKind::Income), "Other Income");
    }

    #[test]
    fn test_infer_expense_keywords() {
        assert_eq!(infer_category("Shell Gas Station", TransactionKind::Expense), "Transportation");
        assert_eq!(infer_category("monthly rent", TransactionKind::Expense), "Housing");
        assert_eq!(infer_category("CVS PHARMACY", TransactionKind::Expense), "Healthcare");
    }
}
