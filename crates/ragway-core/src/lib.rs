//! Business logic and collaborator trait definitions for ragway.
//!
//! This crate defines the "ports" (provider, embedder, index, ledger and
//! repository traits) that the infrastructure layer implements, plus the
//! token budgeting, retrieval augmentation and streaming pipeline built on
//! them. It depends only on `ragway-types` -- never on `ragway-infra` or
//! any database/IO crate.

pub mod budget;
pub mod llm;
pub mod pipeline;
pub mod repository;
pub mod retrieval;
pub mod tokenizer;
pub mod usage;

#[cfg(test)]
pub(crate) mod testing;
