/// Most transactions fetched for one wallet in a single sync run.
pub const DEFAULT_MAX_SYNC_TRANSACTIONS: usize = 10_000;

/// Default page size for transaction listings.
pub const DEFAULT_TRANSACTIONS_LIMIT: i64 = 50;

/// Largest page a transaction listing may request.
pub const MAX_TRANSACTIONS_LIMIT: i64 = 200;

/// Default number of jobs returned for a wallet.
pub const DEFAULT_JOBS_LIMIT: i64 = 10;

/// Error recorded on runs that were cut short by a process restart.
pub const INTERRUPTED_SYNC_MESSAGE: &str = "Interrupted by server restart";
