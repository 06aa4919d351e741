//! Persistence layer for repository sync configuration.
//!
//! # Responsibility
//! - Define the store contract used by the manager.
//! - Isolate SQLite query details from orchestration.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod repository_store;
