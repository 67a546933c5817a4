use super::DbPool;
use crate::errors::StorageError;
use cointracker_core::errors::{DatabaseError, Error, Result};
use diesel::SqliteConnection;
use log::error;
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

// Jobs run on the writer's connection and may fail with Diesel or domain
// errors; both convert into StorageError.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> std::result::Result<T, StorageError> + Send + 'static>;

type ErasedValue = Box<dyn Any + Send + 'static>;

type Envelope = (Job<ErasedValue>, oneshot::Sender<Result<ErasedValue>>);

/// Bound on queued write jobs.
const WRITE_QUEUE_CAPACITY: usize = 1024;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::Sender<Envelope>,
}

impl WriteHandle {
    /// Executes `job` on the writer's dedicated connection inside an
    /// `IMMEDIATE` transaction. Jobs run one at a time in submission order.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> std::result::Result<T, StorageError> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as ErasedValue)),
                ret_tx,
            ))
            .await
            .map_err(|_| {
                Error::Database(DatabaseError::Internal(
                    "Writer actor is no longer running".to_string(),
                ))
            })?;

        let boxed = ret_rx.await.map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Writer actor dropped the reply without a result".to_string(),
            ))
        })??;

        boxed.downcast::<T>().map(|value| *value).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Writer actor returned an unexpected type".to_string(),
            ))
        })
    }
}

/// Spawns a background Tokio task that acts as the single writer to the
/// database. The actor holds one pooled connection for its whole life and
/// processes jobs serially.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) = mpsc::channel::<Envelope>(WRITE_QUEUE_CAPACITY);

    tokio::spawn(async move {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                // Dropping rx makes every exec() fail with a database error.
                error!("Writer actor could not get a connection: {}", e);
                return;
            }
        };

        while let Some((job, reply_tx)) = rx.recv().await {
            let result: Result<ErasedValue> = conn
                .immediate_transaction::<_, StorageError, _>(job)
                .map_err(Error::from);

            // The requester may have gone away; nothing to do then.
            let _ = reply_tx.send(result);
        }
    });

    WriteHandle { tx }
}
