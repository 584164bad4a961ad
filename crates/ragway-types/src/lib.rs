//! Shared domain types for ragway.
//!
//! Messages, model specs, generation events, retrieval results, usage
//! records, configuration, and the error enums shared across the workspace.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod model;
pub mod retrieval;
pub mod usage;
