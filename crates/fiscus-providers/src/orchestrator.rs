//! Provider fallback orchestrator.
//!
//! Tries each configured responder in fixed priority order (gemini,
//! openai, local), retrying each with exponential backoff before
//! falling through. No responder failure is fatal to the caller.

use fiscus_core::{
    config::Config,
    error::FiscusError,
    prompt::{Prompt, Reply, Turn},
    traits::Responder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::gemini::GeminiResponder;
use crate::guard::{validate_response, CONTEXT_REINFORCEMENT, FINANCIAL_SYSTEM_PROMPT};
use crate::intent::{self, Intent};
use crate::local::LocalResponder;
use crate::openai::OpenAiResponder;
use crate::retry::RetryPolicy;

/// Apology returned when every responder is exhausted. Should be
/// unreachable while the local responder is in the chain.
const EXHAUSTED_RESPONSE: &str =
    "I'm having trouble connecting right now. Please try again in a moment.";

/// Sentinel provider name tagging the exhaustion apology.
const EXHAUSTED_PROVIDER: &str = "error";

/// The assistant's answer to one user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantReply {
    pub intent: Intent,
    pub response: String,
    pub provider: String,
}

/// Fallback orchestrator over a priority-ordered responder chain.
pub struct Orchestrator {
    responders: Vec<Arc<dyn Responder>>,
    retry: RetryPolicy,
}

impl Orchestrator {
    /// Build the responder chain from config: gemini, then openai, then
    /// the always-available local rules.
    pub fn from_config(config: &Config) -> Self {
        let mut responders: Vec<Arc<dyn Responder>> = Vec::new();

        if let Some(gemini) = &config.provider.gemini {
            if gemini.enabled {
                responders.push(Arc::new(GeminiResponder::from_config(
                    gemini.api_key.clone(),
                    gemini.model.clone(),
                )));
            }
        }

        if let Some(openai) = &config.provider.openai {
            if openai.enabled {
                responders.push(Arc::new(OpenAiResponder::from_config(
                    openai.base_url.clone(),
                    openai.api_key.clone(),
                    openai.model.clone(),
                )));
            }
        }

        responders.push(Arc::new(LocalResponder));

        Self {
            responders,
            retry: RetryPolicy::from_config(&config.retry),
        }
    }

    /// Build from an explicit responder chain (used by tests).
    pub fn new(responders: Vec<Arc<dyn Responder>>, retry: RetryPolicy) -> Self {
        Self { responders, retry }
    }

    /// Names of the configured responders, in priority order.
    pub fn responder_names(&self) -> Vec<&str> {
        self.responders.iter().map(|r| r.name()).collect()
    }

    /// The highest-priority responder. Used for one-off tasks that need
    /// a single model rather than the fallback chain, like statement
    /// extraction.
    pub fn primary(&self) -> Arc<dyn Responder> {
        self.responders[0].clone()
    }

    /// Availability of each responder, in priority order.
    pub async fn availability(&self) -> Vec<(String, bool)> {
        let mut out = Vec::with_capacity(self.responders.len());
        for responder in &self.responders {
            out.push((responder.name().to_string(), responder.is_available().await));
        }
        out
    }

    /// Try each responder in order until one produces a reply.
    ///
    /// Unavailable responders are skipped; failing ones are retried per
    /// the policy, then fallen through. When every responder is
    /// exhausted, returns the canned apology tagged with the sentinel
    /// provider name instead of an error.
    pub async fn respond(&self, prompt: &Prompt) -> Reply {
        for responder in &self.responders {
            let name = responder.name();

            if !responder.is_available().await {
                info!("{name} responder not available, skipping");
                continue;
            }

            info!("trying {name} responder");
            match self.retry.run(|| responder.generate(prompt)).await {
                Ok(reply) => {
                    info!("{name} responder succeeded in {}ms", reply.processing_ms);
                    return reply;
                }
                Err(e) => {
                    warn!("{name} responder failed: {e}");
                }
            }
        }

        error!("all responders exhausted");
        Reply {
            text: EXHAUSTED_RESPONSE.to_string(),
            provider: EXHAUSTED_PROVIDER.to_string(),
            tokens_used: None,
            processing_ms: 0,
        }
    }

    /// Process one user message end to end: detect intent, apply the
    /// financial guard, run the fallback chain, and validate the
    /// response. Infallible by construction.
    pub async fn process_user_input(&self, input: &str, history: Vec<Turn>) -> AssistantReply {
        let intent = intent::detect(input);

        let prompt = Prompt::new(input)
            .with_system(FINANCIAL_SYSTEM_PROMPT)
            .with_history(history)
            .with_suffix(CONTEXT_REINFORCEMENT);

        let reply = self.respond(&prompt).await;
        // The exhaustion apology is returned verbatim; validating it
        // would swap in the redirect for off-topic inputs.
        let response = if reply.provider == EXHAUSTED_PROVIDER {
            reply.text
        } else {
            validate_response(&reply.text, input)
        };

        AssistantReply {
            intent,
            response,
            provider: reply.provider,
        }
    }
}
