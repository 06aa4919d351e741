//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate store, filesystem, schedule and launcher calls into the
//!   administrative operations.
//! - Keep the CLI decoupled from storage and host-tool details.

pub mod manager;
