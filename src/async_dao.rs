use crate::{
    Affected, AsValue, AsyncExecutor, Entity, EntityMapper, Executor, FetchMany, FetchOne, Mode,
    Pending, Record, RecordMapper, Result, ResultSetParser, RoutingSqlParser, RowsAffected,
    ScalarMapper, SqlOperation, SqlParser, Statement, StatementHandler,
};

/// Asynchronous flavour of [`Dao`](crate::Dao), every operation returns a [`Pending`] at once.
///
/// Nothing is reported synchronously: a statement that cannot even be built
/// completes its `Pending` with the error. Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct AsyncDao<E> {
    executor: AsyncExecutor<E>,
}

impl<E: Executor + 'static> AsyncDao<E> {
    pub fn new(executor: AsyncExecutor<E>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &AsyncExecutor<E> {
        &self.executor
    }

    pub fn submit<H>(&self, statement: Result<Statement>, handler: H) -> Pending<H::Output>
    where
        H: StatementHandler + 'static,
        H::Output: 'static,
    {
        match statement {
            Ok(statement) => self.executor.submit(statement, handler),
            Err(error) => Pending::failed(error),
        }
    }

    pub fn query<T: Entity>(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
    ) -> Pending<Vec<T>> {
        self.submit(
            Statement::new(sql, params, Mode::ReadOnly),
            FetchMany::new(ResultSetParser::new(EntityMapper::new())),
        )
    }

    pub fn query_one<T: Entity>(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
    ) -> Pending<Option<T>> {
        self.submit(
            Statement::new(sql, params, Mode::ReadOnly),
            FetchOne::new(EntityMapper::new()),
        )
    }

    pub fn query_records(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
    ) -> Pending<Vec<Record>> {
        self.submit(
            Statement::new(sql, params, Mode::ReadOnly),
            FetchMany::new(ResultSetParser::new(RecordMapper)),
        )
    }

    pub fn query_scalar<T: AsValue + Send + 'static>(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
    ) -> Pending<Option<T>> {
        self.submit(
            Statement::new(sql, params, Mode::ReadOnly),
            FetchOne::new(ScalarMapper::new()),
        )
    }

    pub fn execute(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
    ) -> Pending<RowsAffected> {
        self.submit(Statement::new(sql, params, Mode::Updatable), Affected)
    }

    pub fn insert<T: Entity>(&self, entity: &T) -> Pending<RowsAffected> {
        self.submit(
            RoutingSqlParser::entity(entity, SqlOperation::Insert).parse(),
            Affected,
        )
    }

    pub fn update<T: Entity>(&self, entity: &T) -> Pending<RowsAffected> {
        self.submit(
            RoutingSqlParser::entity(entity, SqlOperation::Update).parse(),
            Affected,
        )
    }

    pub fn delete<T: Entity>(&self, entity: &T) -> Pending<RowsAffected> {
        self.submit(
            RoutingSqlParser::entity(entity, SqlOperation::Delete).parse(),
            Affected,
        )
    }
}
