mod allocate;
mod history;
mod lookup;

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, IsolationLevel, TransactionTrait,
};

use crate::cache::SlugCache;
use crate::error::SlugResult;

pub use lookup::{SlugStatus, split_path};

/// A connection the service can run on.
pub trait SlugConnection: ConnectionTrait + TransactionTrait<Transaction = DatabaseTransaction> {
    /// True when writes stay invisible to other connections until the
    /// caller commits.
    fn in_transaction(&self) -> bool;
}

impl SlugConnection for DatabaseConnection {
    fn in_transaction(&self) -> bool {
        false
    }
}

impl SlugConnection for DatabaseTransaction {
    fn in_transaction(&self) -> bool {
        true
    }
}

/// Allocation and lookup over one connection or transaction.
///
/// Nested calls on a [`DatabaseTransaction`] use savepoints, so the service
/// can run inside a transaction the caller already opened for the owner save.
/// In that mode the shared [`SlugCache`] is neither read nor filled, because
/// the caller may still roll back. Invalidate the owner after committing:
///
/// ```ignore
/// let txn = db.begin().await?;
/// SlugService::new(&txn, &cache).allocate(&user, &config).await?;
/// txn.commit().await?;
/// cache.invalidate(&user.owner_ref());
/// ```
pub struct SlugService<'a, C: SlugConnection> {
    conn: &'a C,
    cache: &'a SlugCache,
    isolation: Option<IsolationLevel>,
}

impl<'a, C: SlugConnection> SlugService<'a, C> {
    pub fn new(conn: &'a C, cache: &'a SlugCache) -> Self {
        Self {
            conn,
            cache,
            isolation: None,
        }
    }

    /// Run allocations at `isolation`.
    ///
    /// Only meaningful when `conn` is a plain connection; PostgreSQL refuses
    /// to change the isolation level inside an open transaction.
    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = Some(isolation);
        self
    }

    /// Whether cached values may be served and stored.
    fn caches(&self) -> bool {
        !self.conn.in_transaction()
    }

    async fn begin(&self) -> SlugResult<DatabaseTransaction> {
        let txn = match self.isolation {
            Some(level) => self.conn.begin_with_config(Some(level), None).await?,
            None => self.conn.begin().await?,
        };
        Ok(txn)
    }
}
