//! CoinTracker Core - Domain entities, services, and traits.
//!
//! This crate contains the wallet ledger and the sync engine. It is
//! database-agnostic and defines traits that are implemented by the
//! `storage-sqlite` crate; provider access comes from `chain-data`.

pub mod constants;
pub mod errors;
pub mod sync;
pub mod transactions;
pub mod wallets;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
