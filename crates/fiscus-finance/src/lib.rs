//! # fiscus-finance
//!
//! Finance services: currency conversion, transaction categorization,
//! market quotes, and bank statement import.

pub mod categorize;
pub mod currency;
mod llm_json;
pub mod quotes;
pub mod statement;

pub use categorize::{Categorizer, CategoryResult};
pub use currency::{Conversion, RateClient, RateTable};
pub use statement::{StatementImport, StatementReader};
