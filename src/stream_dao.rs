use crate::{
    AsValue, Entity, EntityMapper, Mode, Pool, Record, RecordMapper, Result, ResultSetParser,
    RowMapper, RowStream, Statement, StreamExecutor,
};

/// Streaming flavour of [`Dao`](crate::Dao), every read returns a [`RowStream`].
///
/// Failures, including the ones found while building the statement, surface on the first pull.
#[derive(Clone)]
pub struct StreamDao<P: Pool> {
    executor: StreamExecutor<P>,
}

impl<P: Pool> StreamDao<P> {
    pub fn new(executor: StreamExecutor<P>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &StreamExecutor<P> {
        &self.executor
    }

    fn stream<M, T>(&self, statement: Result<Statement>, mapper: M) -> RowStream<T>
    where
        M: RowMapper<T> + 'static,
        T: Send + 'static,
    {
        match statement {
            Ok(statement) => self
                .executor
                .stream(statement, ResultSetParser::new(mapper)),
            Err(error) => RowStream::failed(error),
        }
    }

    pub fn query<T: Entity>(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
    ) -> RowStream<T> {
        self.stream(
            Statement::new(sql, params, Mode::ReadOnly),
            EntityMapper::new(),
        )
    }

    pub fn query_records(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
    ) -> RowStream<Record> {
        self.stream(
            Statement::new(sql, params, Mode::ReadOnly),
            RecordMapper,
        )
    }

    pub fn query_with<M, T>(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
        mapper: M,
    ) -> RowStream<T>
    where
        M: RowMapper<T> + 'static,
        T: Send + 'static,
    {
        self.stream(Statement::new(sql, params, Mode::ReadOnly), mapper)
    }

    pub fn page<T: Entity>(
        &self,
        sql: &str,
        params: impl IntoIterator<Item = impl AsValue>,
        offset: u64,
        limit: u64,
    ) -> RowStream<T> {
        self.stream(
            Statement::new(sql, params, Mode::ReadOnly).map(|v| v.paginated(offset, limit)),
            EntityMapper::new(),
        )
    }
}
