//! Domain model for managed mirror repositories.
//!
//! # Responsibility
//! - Define the single persisted entity, [`repository::Repository`].
//! - Own the path derivation rules shared by provisioning and launching.

pub mod repository;
