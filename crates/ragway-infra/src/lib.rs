//! Infrastructure layer for ragway.
//!
//! Contains implementations of the collaborator traits defined in
//! `ragway-core`: SQLite usage ledger and API key storage, the tiktoken
//! encoder factory, the OpenAI-compatible generation and embedding clients,
//! and the LanceDB similarity index. Also loads `config.toml`.

pub mod config;
pub mod embedding;
pub mod llm;
pub mod sqlite;
pub mod tokenizer;
pub mod vector;
