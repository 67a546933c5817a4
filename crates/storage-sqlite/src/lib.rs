//! SQLite storage implementation for CoinTracker.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `cointracker-core` and contains:
//! - Database connection pooling and the single-writer actor
//! - Diesel migrations
//! - Repository implementations for wallets, transactions and sync jobs
//!
//! # Architecture
//!
//! This crate is the only place in the application where Diesel dependencies exist.
//!
//! ```text
//!        core (ledger + sync engine)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod sync_jobs;
pub mod transactions;
pub mod wallets;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use sync_jobs::SyncJobRepository;
pub use transactions::TransactionRepository;
pub use wallets::WalletRepository;

// Re-export from cointracker-core for convenience
pub use cointracker_core::errors::{DatabaseError, Error, Result};
