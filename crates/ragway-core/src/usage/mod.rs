//! Quota enforcement and usage accounting.

pub mod box_ledger;
pub mod ledger;
