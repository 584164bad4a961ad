//! SQLite storage layer.
//!
//! Usage ledger and API key storage backed by SQLite with WAL mode and
//! split read/write connection pools.

pub mod api_key;
pub mod pool;
pub mod usage;
