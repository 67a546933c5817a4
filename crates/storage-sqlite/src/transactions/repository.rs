use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use log::debug;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use cointracker_core::errors::{Error, Result};
use cointracker_core::transactions::{
    NewTransaction, Transaction, TransactionRepositoryTrait, TransactionType,
};

use super::model::{parse_value, NewTransactionDB, TransactionDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::transactions;

pub struct TransactionRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl TransactionRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl TransactionRepositoryTrait for TransactionRepository {
    async fn insert_ignore_existing(&self, batch: Vec<NewTransaction>) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        self.writer
            .exec(move |conn| {
                let attempted = batch.len();
                let created_at = chrono::Utc::now().naive_utc();
                let mut inserted = 0;
                // INSERT OR IGNORE leans on UNIQUE(wallet_id, txid).
                for tx in batch {
                    inserted += diesel::insert_or_ignore_into(transactions::table)
                        .values(NewTransactionDB::from_domain(tx, created_at))
                        .execute(conn)?;
                }
                debug!(
                    "Inserted {} of {} transactions ({} already stored)",
                    inserted,
                    attempted,
                    attempted - inserted
                );
                Ok(inserted)
            })
            .await
    }

    fn existing_txids(&self, wallet_id: i64) -> Result<HashSet<String>> {
        let mut conn = get_connection(&self.pool)?;
        let txids = transactions::table
            .filter(transactions::wallet_id.eq(wallet_id))
            .select(transactions::txid)
            .load::<String>(&mut conn)
            .into_core()?;
        Ok(txids.into_iter().collect())
    }

    fn list_by_wallet(&self, wallet_id: i64, limit: i64, offset: i64) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        transactions::table
            .filter(transactions::wallet_id.eq(wallet_id))
            .select(TransactionDB::as_select())
            .order((transactions::timestamp.desc(), transactions::id.desc()))
            .limit(limit)
            .offset(offset)
            .load::<TransactionDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(|row| Transaction::try_from(row).map_err(Error::from))
            .collect()
    }

    fn count_by_wallet(&self, wallet_id: i64) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        transactions::table
            .filter(transactions::wallet_id.eq(wallet_id))
            .count()
            .get_result::<i64>(&mut conn)
            .into_core()
    }

    fn sum_signed_values(&self, wallet_id: i64) -> Result<Decimal> {
        let mut conn = get_connection(&self.pool)?;
        // Values are TEXT; summing in SQL would go through REAL and lose satoshis.
        let rows = transactions::table
            .filter(transactions::wallet_id.eq(wallet_id))
            .select((transactions::value, transactions::tx_type))
            .load::<(String, String)>(&mut conn)
            .into_core()?;

        rows.iter().try_fold(Decimal::ZERO, |total, (value, tx_type)| {
            let value = parse_value(value).map_err(Error::from)?;
            let tx_type = TransactionType::from_str(tx_type)?;
            Ok(total + tx_type.sign(value))
        })
    }
}
