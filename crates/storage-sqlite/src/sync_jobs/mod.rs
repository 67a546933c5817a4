//! SQLite storage implementation for sync jobs.

mod model;
mod repository;

pub use model::SyncJobDB;
pub use repository::SyncJobRepository;
