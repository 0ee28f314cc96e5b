//! Rule-based local responder. Always available; terminates the
//! fallback chain so the orchestrator can never come up empty-handed.

use async_trait::async_trait;
use fiscus_core::{
    error::FiscusError,
    prompt::{Prompt, Reply},
    traits::Responder,
};
use std::time::Instant;

use crate::guard::{is_financial_query, REDIRECT_RESPONSE};

/// Local keyword-rule responder.
pub struct LocalResponder;

/// Rules checked in order; first keyword hit wins.
const RULES: &[(&[&str], &str)] = &[
    (
        &["budget"],
        "Creating a budget is essential for financial health! Track your income and expenses in the Finances tab. I recommend the 50/30/20 rule: 50% for needs, 30% for wants, and 20% for savings and debt repayment.",
    ),
    (
        &["save", "saving"],
        "Great question about savings! Start by setting aside at least 20% of your income. Build an emergency fund covering 3-6 months of expenses, then focus on long-term goals. Use the Finances tab to track your progress.",
    ),
    (
        &["expense", "spend"],
        "Track your expenses in the Finances tab to see where your money goes. Categorizing transactions helps identify areas where you can cut back. Small daily expenses often add up more than you think!",
    ),
    (
        &["invest"],
        "Investing is important for long-term wealth building. Consider starting with low-cost index funds, diversify your portfolio, and think long-term. Track your investments in the Finances tab. Always research before investing!",
    ),
    (
        &["currency", "convert"],
        "You can convert currencies in the Finances tab! I'll help you get real-time exchange rates for accurate conversions between different currencies.",
    ),
];

const DEFAULT_RESPONSE: &str = "I can help you with budgeting, expense tracking, currency conversion, savings advice, and investment monitoring. Check out the Finances tab to manage your transactions and see detailed insights. What specific financial question do you have?";

fn respond_to(input: &str) -> &'static str {
    if !is_financial_query(input) {
        return REDIRECT_RESPONSE;
    }
    let lower = input.to_lowercase();
    for (keywords, response) in RULES {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return response;
        }
    }
    DEFAULT_RESPONSE
}

#[async_trait]
impl Responder for LocalResponder {
    fn name(&self) -> &str {
        "local"
    }

    fn requires_api_key(&self) -> bool {
        false
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, prompt: &Prompt) -> Result<Reply, FiscusError> {
        let start = Instant::now();
        Ok(Reply {
            text: respond_to(&prompt.user).to_string(),
            provider: "local".to_string(),
            tokens_used: None,
            processing_ms: start.elapsed().as_millis() as u64,
        })
    }
}
