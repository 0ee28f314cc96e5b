//! # fiscus-providers
//!
//! AI responder implementations and the fallback orchestrator.

pub mod gemini;
pub mod guard;
pub mod intent;
pub mod local;
pub mod openai;
pub mod orchestrator;
pub mod retry;
pub mod speech;

pub use orchestrator::{AssistantReply, Orchestrator};
