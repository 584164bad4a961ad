//! HTTP/REST API layer for ragway.
//!
//! Axum-based API with API key authentication, a streaming chat endpoint,
//! envelope error responses, and CORS support.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
