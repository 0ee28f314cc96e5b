use async_trait::async_trait;

use crate::error::FiscusError;
use crate::prompt::{Prompt, Reply};

/// An AI backend that can answer a prompt.
///
/// Implementations live in `fiscus-providers`. The orchestrator holds a
/// priority-ordered list of responders and falls through on failure.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Responder name (e.g. "gemini", "openai", "local").
    fn name(&self) -> &str;

    /// Whether this responder needs an API key to function.
    fn requires_api_key(&self) -> bool;

    /// Check if the responder is ready to serve requests.
    async fn is_available(&self) -> bool;

    /// Generate a response for the given prompt.
    async fn generate(&self, prompt: &Prompt) -> Result<Reply, FiscusError>;
}
