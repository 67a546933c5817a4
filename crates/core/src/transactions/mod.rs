//! Transactions module - ledger entries owned by a wallet.

mod transactions_model;
mod transactions_traits;

pub use transactions_model::{
    NewTransaction, Pagination, Transaction, TransactionPage, TransactionQuery, TransactionType,
};
pub use transactions_traits::TransactionRepositoryTrait;
