//! Embedding service clients.

pub mod openai;

pub use openai::OpenAiEmbedder;
