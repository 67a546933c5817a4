//! Wallets module - domain models, services, and traits.

mod wallets_model;
mod wallets_service;
mod wallets_traits;


pub use wallets_model::{NewWallet, Wallet, WalletBalance, WalletSummary, WalletSyncStatus};
pub use wallets_service::WalletService;
pub use wallets_traits::{WalletRepositoryTrait, WalletServiceTrait};
