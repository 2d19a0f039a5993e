use crate::{
    Connection, Context, DaoError, Dialects, Executor, Invalidator, Pool, Result, Statement,
    StatementHandler, executor::run_statement, util::dao_error,
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::Mutex;

/// Opens transactional scopes, one at a time.
///
/// Clones share the same flag: beginning a scope while another one opened
/// from the same family is alive fails with [`DaoError::TransactionState`].
#[derive(Clone)]
pub struct TransactionExecutor<P: Pool> {
    pool: P,
    dialects: Arc<Dialects>,
    active: Arc<AtomicBool>,
}

impl<P: Pool> TransactionExecutor<P> {
    pub fn new(pool: P, dialects: Arc<Dialects>) -> Self {
        Self {
            pool,
            dialects,
            active: Default::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub async fn begin(&self) -> Result<Transaction<P>> {
        if self.active.swap(true, Ordering::AcqRel) {
            return Err(dao_error(DaoError::TransactionState(
                "a transaction is already active, nested transactions are not supported".into(),
            )));
        }
        let active = ActiveFlag(self.active.clone());
        let mut connection = self.pool.acquire().await?;
        connection
            .begin()
            .await
            .context("While beginning the transaction")?;
        log::debug!("Transaction started");
        Ok(Transaction {
            pool: self.pool.clone(),
            dialects: self.dialects.clone(),
            scope: Mutex::new(Some(Scope {
                connection,
                written: Vec::new(),
            })),
            invalidator: None,
            _active: active,
        })
    }
}

struct ActiveFlag(Arc<AtomicBool>);

impl Drop for ActiveFlag {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A transactional scope: every statement runs, in submission order, on the
/// single connection held by the scope.
///
/// The first failing statement rolls the whole scope back and releases the
/// connection, later calls fail with [`DaoError::TransactionState`]. A scope
/// dropped without [`commit`](Transaction::commit) or [`rollback`](Transaction::rollback)
/// releases its connection, which discards the pending work.
///
/// A scope opened from a caching facade records its write statements and
/// applies the cache policy to them once committed, never before.
pub struct Transaction<P: Pool> {
    pool: P,
    dialects: Arc<Dialects>,
    scope: Mutex<Option<Scope<P::Connection>>>,
    invalidator: Option<Invalidator>,
    _active: ActiveFlag,
}

struct Scope<C> {
    connection: C,
    written: Vec<Statement>,
}

fn finished() -> crate::Error {
    dao_error(DaoError::TransactionState(
        "the transaction is already finished".into(),
    ))
}

impl<P: Pool> Transaction<P> {
    /// Invalidates the cache behind `invalidator` for every write committed by this scope.
    pub fn invalidating(mut self, invalidator: Invalidator) -> Self {
        self.invalidator = Some(invalidator);
        self
    }

    pub async fn commit(self) -> Result<()> {
        let Some(mut scope) = self.scope.lock().await.take() else {
            return Err(finished());
        };
        scope
            .connection
            .commit()
            .await
            .context("While committing the transaction")?;
        log::debug!("Transaction committed");
        if let Some(invalidator) = &self.invalidator {
            for statement in &scope.written {
                invalidator.invalidate(statement);
            }
        }
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        let Some(mut scope) = self.scope.lock().await.take() else {
            return Err(finished());
        };
        scope
            .connection
            .rollback()
            .await
            .context("While rolling back the transaction")?;
        log::debug!("Transaction rolled back");
        Ok(())
    }

    /// False once the scope has been rolled back after a failure.
    pub async fn is_open(&self) -> bool {
        self.scope.lock().await.is_some()
    }
}

impl<P: Pool> Executor for Transaction<P> {
    type Pool = P;

    fn pool(&self) -> &P {
        &self.pool
    }

    fn dialects(&self) -> &Arc<Dialects> {
        &self.dialects
    }

    async fn execute<H: StatementHandler>(
        &self,
        statement: Statement,
        handler: H,
    ) -> Result<H::Output> {
        let mut guard = self.scope.lock().await;
        let Some(scope) = guard.as_mut() else {
            return Err(finished());
        };
        let result = match statement.check_parameters() {
            Ok(()) => run_statement(&mut scope.connection, &self.dialects, &statement, handler).await,
            Err(e) => Err(e),
        };
        match &result {
            Ok(_) if self.invalidator.is_some() && !statement.is_read_only() => {
                scope.written.push(statement);
            }
            Ok(_) => {}
            Err(_) => {
                if let Some(mut scope) = guard.take() {
                    if let Err(e) = scope.connection.rollback().await {
                        log::error!("{:#}", e.context("While rolling back the failed transaction"));
                    }
                    log::warn!("Transaction rolled back after a failed statement");
                }
            }
        }
        result
    }
}

impl<P: Pool> Drop for Transaction<P> {
    fn drop(&mut self) {
        if self.scope.get_mut().take().is_some() {
            log::warn!("Transaction dropped without commit or rollback, the pending work is discarded");
        }
    }
}
