//! Database model for ledger transactions.

use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use rust_decimal::Decimal;

use cointracker_core::transactions::{NewTransaction, Transaction, TransactionType};

use crate::errors::StorageError;

#[derive(Queryable, Identifiable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionDB {
    pub id: i64,
    pub wallet_id: i64,
    pub txid: String,
    pub block_height: Option<i64>,
    pub timestamp: NaiveDateTime,
    pub value: String,
    pub tx_type: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::transactions)]
pub(crate) struct NewTransactionDB {
    pub wallet_id: i64,
    pub txid: String,
    pub block_height: Option<i64>,
    pub timestamp: NaiveDateTime,
    pub value: String,
    pub tx_type: String,
    pub created_at: NaiveDateTime,
}

impl NewTransactionDB {
    pub fn from_domain(domain: NewTransaction, created_at: NaiveDateTime) -> Self {
        Self {
            wallet_id: domain.wallet_id,
            txid: domain.txid,
            block_height: domain.block_height,
            timestamp: domain.timestamp,
            value: domain.value.to_string(),
            tx_type: domain.tx_type.as_str().to_string(),
            created_at,
        }
    }
}

pub(crate) fn parse_value(raw: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(raw)
        .map_err(|e| StorageError::CorruptValue(format!("transaction value '{}': {}", raw, e)))
}

impl TryFrom<TransactionDB> for Transaction {
    type Error = StorageError;

    fn try_from(db: TransactionDB) -> Result<Self, Self::Error> {
        Ok(Self {
            value: parse_value(&db.value)?,
            tx_type: TransactionType::from_str(&db.tx_type)?,
            id: db.id,
            wallet_id: db.wallet_id,
            txid: db.txid,
            block_height: db.block_height,
            timestamp: db.timestamp,
            created_at: db.created_at,
        })
    }
}
