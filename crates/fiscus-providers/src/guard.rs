//! Financial domain guard.
//!
//! Keeps every AI interaction within the personal-finance context:
//! a system prompt, a keyword check on the user input, and a
//! post-hoc validation of responses.

/// System prompt prepended to every assistant request.
pub const FINANCIAL_SYSTEM_PROMPT: &str = "You are a financial AI assistant for a personal finance management app. You ONLY help with:\n\
- Expense tracking and budgeting\n\
- Currency conversion and exchange rates\n\
- Financial planning and savings advice\n\
- Transaction categorization\n\
- Investment tracking and portfolio analysis\n\
- Banking and financial questions\n\
- Scheduling finance-related meetings\n\n\
If the user asks about topics outside of personal finance, politely redirect them by saying: \"I'm a financial assistant and can only help with money, budgeting, expenses, investments, and finance-related topics. How can I assist with your finances today?\"\n\n\
Keep responses concise, friendly, and focused on helping users manage their money better.";

/// Canned redirect for off-topic queries.
pub const REDIRECT_RESPONSE: &str = "I'm a financial assistant and can only help with money, budgeting, expenses, investments, and finance-related topics. How can I assist with your finances today?";

const FINANCIAL_KEYWORDS: &[&str] = &[
    "money", "expense", "budget", "finance", "currency", "convert", "transaction", "spend",
    "save", "invest", "stock", "price", "cost", "payment", "bank", "account", "balance",
    "income", "revenue", "profit", "loss", "tax", "financial", "dollar", "euro", "yen",
    "pound", "exchange", "rate",
];

const REFUSAL_PHRASES: &[&str] = &[
    "financial assistant",
    "only help with",
    "finance-related",
    "money",
    "budgeting",
];

/// Whether the input mentions any finance keyword.
pub fn is_financial_query(input: &str) -> bool {
    let lower = input.to_lowercase();
    FINANCIAL_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Reinforcement note attached to the prompt suffix, nudging the model
/// to stay on topic. Kept out of the user text itself so keyword checks
/// see what the user actually wrote.
pub const CONTEXT_REINFORCEMENT: &str = "(Remember: Only provide finance-related assistance)";

/// Validate a model response against the original input. On-topic queries
/// and self-redirecting responses pass through; anything else is replaced
/// with the canned redirect.
pub fn validate_response(response: &str, original_input: &str) -> String {
    let lower = response.to_lowercase();
    let is_refusal = REFUSAL_PHRASES.iter().any(|p| lower.contains(p));

    if is_refusal || is_financial_query(original_input) {
        response.to_string()
    } else {
        REDIRECT_RESPONSE.to_string()
    }
}
