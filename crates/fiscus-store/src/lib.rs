//! # fiscus-store
//!
//! SQLite-backed persistence for Fiscus. Each data domain (messages,
//! events, transactions, profile) is stored as one JSON document in a
//! namespaced key-value table.

mod store;

pub use store::Store;
