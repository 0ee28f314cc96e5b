//! # fiscus-core
//!
//! Core types, traits, configuration, and error handling for the Fiscus assistant.

pub mod config;
pub mod error;
pub mod prompt;
pub mod traits;
pub mod types;
