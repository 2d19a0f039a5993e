use crate::{
    Cache, Dialects, Executor, Fingerprint, Invalidator, QueryResult, Result, Statement,
    StatementHandler, WritePolicy,
    handler::CollectRows,
    stream::{self, StreamExt},
};
use std::sync::Arc;

/// Serves read statements from a cache, keyed by text, parameters and pagination.
///
/// A miss runs the statement through the wrapped executor, stores the rows and
/// then feeds them to the handler. Handlers with a row cap, like a "fetch one",
/// collect only those rows and keep them under a capped key; an uncapped entry
/// of the same statement answers them too. Write statements always reach the
/// wrapped executor and invalidate entries according to the [`WritePolicy`],
/// whatever their outcome.
///
/// A read that misses while a write runs may fetch the rows as they were before
/// the write. Those rows are not stored when an invalidation happened since the
/// read started, as tracked by the [`Invalidator`] shared by the clones of this
/// executor. Distinct executors over the same cache do not share that tracking.
#[derive(Clone)]
pub struct CachingExecutor<E> {
    inner: E,
    invalidator: Invalidator,
}

impl<E: Executor> CachingExecutor<E> {
    pub fn new(inner: E, cache: Arc<dyn Cache>) -> Self {
        Self {
            inner,
            invalidator: Invalidator::new(cache, Default::default()),
        }
    }

    pub fn with_policy(self, policy: WritePolicy) -> Self {
        Self {
            invalidator: Invalidator::new(self.invalidator.cache().clone(), policy),
            inner: self.inner,
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        self.invalidator.cache()
    }

    pub fn policy(&self) -> WritePolicy {
        self.invalidator.policy()
    }
}

impl<E: Executor> Executor for CachingExecutor<E> {
    type Pool = E::Pool;

    fn pool(&self) -> &E::Pool {
        self.inner.pool()
    }

    fn dialects(&self) -> &Arc<Dialects> {
        self.inner.dialects()
    }

    fn invalidator(&self) -> Option<&Invalidator> {
        Some(&self.invalidator)
    }

    async fn execute<H: StatementHandler>(
        &self,
        statement: Statement,
        handler: H,
    ) -> Result<H::Output> {
        if !statement.is_read_only() {
            let result = self.inner.execute(statement.clone(), handler).await;
            self.invalidator.invalidate(&statement);
            return result;
        }
        let cache = self.invalidator.cache();
        let max_rows = handler.max_rows();
        let key = Fingerprint::of(&statement);
        let hit = match max_rows {
            Some(_) => cache
                .get(&key)
                .or_else(|| cache.get(&key.clone().capped(max_rows))),
            None => cache.get(&key),
        };
        let rows = match hit {
            Some(rows) => {
                log::trace!("Cache hit: {}", statement);
                rows
            }
            None => {
                log::trace!("Cache miss: {}", statement);
                let generation = self.invalidator.generation();
                let rows = self
                    .inner
                    .execute(statement, CollectRows { max_rows })
                    .await?;
                self.invalidator
                    .put_if_current(generation, key.capped(max_rows), rows.clone());
                rows
            }
        };
        let results = stream::iter(rows.iter().cloned().map(|row| Ok(QueryResult::Row(row))));
        let handled: std::pin::Pin<Box<dyn Future<Output = Result<H::Output>> + Send + '_>> =
            Box::pin(handler.handle(results.boxed()));
        handled.await
    }
}
