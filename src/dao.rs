use crate::{
    Affected, AsValue, AsyncDao, AsyncExecutor, Cache, CachingExecutor, Entity, EntityMapper,
    Executor, FetchMany, FetchOne, Mode, PlainExecutor, Pool, Record, RecordMapper, Result,
    ResultSetParser, RoutingSqlParser, RowMapper, RowsAffected, ScalarMapper, SqlOperation,
    SqlParser, Statement, StatementHandler, StreamDao, StreamExecutor, Transaction,
    TransactionExecutor, WritePolicy, select_by_identifier,
};
use std::sync::Arc;

/// No parameters, for statements without placeholders.
pub const NO_PARAMS: [crate::Value; 0] = [];

/// Entry point of the data-access layer, owns one executor chain.
///
/// A `Dao` is never modified after construction: [`cached`](Dao::cached),
/// [`streamed`](Dao::streamed), [`asynchronous`](Dao::asynchronous) and
/// [`begin`](Dao::begin) return new facades wrapping a new chain, the receiver
/// keeps working as before.
///
/// Reads run with [`Mode::ReadOnly`], writes with [`Mode::Updatable`].
pub struct Dao<E: Executor> {
    executor: E,
    transactions: TransactionExecutor<E::Pool>,
}

/// Facade bound to one transactional scope, see [`Dao::begin`].
pub type TransactionDao<P> = Dao<Transaction<P>>;

impl<E: Executor + Clone> Clone for Dao<E> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            transactions: self.transactions.clone(),
        }
    }
}

impl<P: Pool> Dao<PlainExecutor<P>> {
    /// A facade running every statement on its own connection from `pool`.
    pub fn connect(pool: P) -> Self {
        Self::new(PlainExecutor::new(pool))
    }
}

fn read(sql: &str, params: impl IntoIterator<Item = impl AsValue>) -> Result<Statement> {
    Statement::new(sql, params, Mode::ReadOnly)
}

impl<E: Executor> Dao<E> {
    pub fn new(executor: E) -> Self {
        let transactions =
            TransactionExecutor::new(executor.pool().clone(), executor.dialects().clone());
        Self {
            executor,
            transactions,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Runs any statement with any handler.
    pub async fn run<H: StatementHandler>(
        &self,
        statement: Statement,
        handler: H,
    ) -> Result<H::Output> {
        self.executor.execute(statement, handler).await
    }

    pub async fn query<T: Entity>(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
    ) -> Result<Vec<T>> {
        let parser = ResultSetParser::new(EntityMapper::new());
        self.run(read(sql, params)?, FetchMany::new(parser)).await
    }

    /// First mapped row, the rest of the result is not read.
    pub async fn query_one<T: Entity>(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
    ) -> Result<Option<T>> {
        self.run(read(sql, params)?, FetchOne::new(EntityMapper::new()))
            .await
    }

    pub async fn query_records(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
    ) -> Result<Vec<Record>> {
        let parser = ResultSetParser::new(RecordMapper);
        self.run(read(sql, params)?, FetchMany::new(parser)).await
    }

    pub async fn query_one_record(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
    ) -> Result<Option<Record>> {
        self.run(read(sql, params)?, FetchOne::new(RecordMapper)).await
    }

    /// First column of the first row, `None` when the result is empty.
    pub async fn query_scalar<T: AsValue + Send>(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
    ) -> Result<Option<T>> {
        self.run(read(sql, params)?, FetchOne::new(ScalarMapper::new()))
            .await
    }

    pub async fn query_with<M, T>(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
        mapper: M,
    ) -> Result<Vec<T>>
    where
        M: RowMapper<T>,
        T: Send,
    {
        let parser = ResultSetParser::new(mapper);
        self.run(read(sql, params)?, FetchMany::new(parser)).await
    }

    /// `limit` rows starting at `offset`, `sql` must not carry a limit clause of its own.
    pub async fn page<T: Entity>(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<T>> {
        let statement = read(sql, params)?.paginated(offset, limit);
        let parser = ResultSetParser::new(EntityMapper::new());
        self.run(statement, FetchMany::new(parser)).await
    }

    pub async fn page_records(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Record>> {
        let statement = read(sql, params)?.paginated(offset, limit);
        let parser = ResultSetParser::new(RecordMapper);
        self.run(statement, FetchMany::new(parser)).await
    }

    /// Runs a DDL or DML statement, returns the affected-row count.
    pub async fn execute(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
    ) -> Result<RowsAffected> {
        let statement = Statement::new(sql, params, Mode::Updatable)?;
        self.run(statement, Affected).await
    }

    async fn write(&self, parser: RoutingSqlParser<'_>) -> Result<RowsAffected> {
        let statement = parser.parse()?;
        self.run(statement, Affected).await
    }

    pub async fn insert<T: Entity>(&self, entity: &T) -> Result<RowsAffected> {
        self.write(RoutingSqlParser::entity(entity, SqlOperation::Insert))
            .await
    }

    pub async fn update<T: Entity>(&self, entity: &T) -> Result<RowsAffected> {
        self.write(RoutingSqlParser::entity(entity, SqlOperation::Update))
            .await
    }

    pub async fn delete<T: Entity>(&self, entity: &T) -> Result<RowsAffected> {
        self.write(RoutingSqlParser::entity(entity, SqlOperation::Delete))
            .await
    }

    pub async fn insert_record(&self, table: &str, record: &Record) -> Result<RowsAffected> {
        self.write(RoutingSqlParser::record(
            table,
            None,
            record,
            SqlOperation::Insert,
        ))
        .await
    }

    pub async fn update_record(
        &self,
        table: &str,
        identifier: &str,
        record: &Record,
    ) -> Result<RowsAffected> {
        self.write(RoutingSqlParser::record(
            table,
            Some(identifier),
            record,
            SqlOperation::Update,
        ))
        .await
    }

    pub async fn delete_record(
        &self,
        table: &str,
        identifier: &str,
        record: &Record,
    ) -> Result<RowsAffected> {
        self.write(RoutingSqlParser::record(
            table,
            Some(identifier),
            record,
            SqlOperation::Delete,
        ))
        .await
    }

    pub async fn find_by_id<T: Entity>(&self, id: impl AsValue) -> Result<Option<T>> {
        let statement = select_by_identifier::<T>(id.as_value())?;
        self.run(statement, FetchOne::new(EntityMapper::new()))
            .await
    }

    /// Facade that serves repeated reads from `cache`, see [`CachingExecutor`].
    pub fn cached(&self, cache: Arc<dyn Cache>) -> Dao<CachingExecutor<E>>
    where
        E: Clone,
    {
        self.cached_with(cache, WritePolicy::default())
    }

    pub fn cached_with(&self, cache: Arc<dyn Cache>, policy: WritePolicy) -> Dao<CachingExecutor<E>>
    where
        E: Clone,
    {
        Dao {
            executor: CachingExecutor::new(self.executor.clone(), cache).with_policy(policy),
            transactions: self.transactions.clone(),
        }
    }

    /// Facade returning lazy sequences. Its statements always run on connections of
    /// their own, outside of any transactional scope of this facade.
    pub fn streamed(&self) -> StreamDao<E::Pool> {
        StreamDao::new(StreamExecutor::with_dialects(
            self.executor.pool().clone(),
            self.executor.dialects().clone(),
        ))
    }

    /// Facade returning futures completed by at most `workers` concurrent executions.
    pub fn asynchronous(&self, workers: usize) -> AsyncDao<E>
    where
        E: Clone + 'static,
    {
        AsyncDao::new(AsyncExecutor::new(self.executor.clone(), workers))
    }

    /// Opens a transactional scope. Only one scope can be open at a time among
    /// the facades derived from the same [`Dao::new`], a second one fails with
    /// [`DaoError::TransactionState`](crate::DaoError::TransactionState).
    ///
    /// Reads inside the scope bypass the cache of a caching facade, its writes
    /// invalidate that cache once committed.
    pub async fn begin(&self) -> Result<TransactionDao<E::Pool>> {
        let mut transaction = self.transactions.begin().await?;
        if let Some(invalidator) = self.executor.invalidator() {
            transaction = transaction.invalidating(invalidator.clone());
        }
        Ok(Dao {
            executor: transaction,
            transactions: self.transactions.clone(),
        })
    }
}

impl<P: Pool> Dao<Transaction<P>> {
    pub async fn commit(self) -> Result<()> {
        self.executor.commit().await
    }

    pub async fn rollback(self) -> Result<()> {
        self.executor.rollback().await
    }
}
