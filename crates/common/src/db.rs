//! Scoped transactions for repository writes.

use std::future::Future;
use std::pin::Pin;

use sqlx::{PgConnection, PgPool};

/// Future returned by the work passed to [`with_transaction`].
pub type TxFuture<'t, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 't>>;

/// Runs `work` inside a single database transaction.
///
/// The transaction commits when `work` returns `Ok` and rolls back when it
/// returns `Err`. If the future is dropped midway, the transaction is dropped
/// uncommitted and the database rolls it back.
pub async fn with_transaction<T, E, F>(pool: &PgPool, work: F) -> Result<T, E>
where
    T: Send,
    E: From<sqlx::Error> + Send,
    F: for<'t> FnOnce(&'t mut PgConnection) -> TxFuture<'t, T, E> + Send,
{
    let mut tx = pool.begin().await?;

    let outcome = work(&mut *tx).await;

    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            tx.rollback().await?;
            Err(e)
        }
    }
}
