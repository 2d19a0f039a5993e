use crate::{
    QueryResult, Result, ResultSetParser, RowLabeled, RowMapper, RowsAffected,
    stream::{BoxStream, StreamExt},
};
use std::{future::Future, sync::Arc};

/// Raw outcome of a statement, as produced by the connection.
pub type ResultStream<'s> = BoxStream<'s, Result<QueryResult>>;

/// Callback that turns the raw outcome of a statement into the typed result
/// returned by an [`Executor`](crate::Executor).
pub trait StatementHandler: Send {
    type Output: Send;

    /// Rows the handler consumes at most, `None` when it reads the whole result.
    fn max_rows(&self) -> Option<usize> {
        None
    }

    fn handle<'s>(
        self,
        results: ResultStream<'s>,
    ) -> impl Future<Output = Result<Self::Output>> + Send + 's
    where
        Self: 's;
}

/// Collects every mapped row, up to the cap of the parser.
pub struct FetchMany<M, T> {
    parser: ResultSetParser<M, T>,
}

impl<M: RowMapper<T>, T> FetchMany<M, T> {
    pub fn new(parser: ResultSetParser<M, T>) -> Self {
        Self { parser }
    }
}

impl<M, T> StatementHandler for FetchMany<M, T>
where
    M: RowMapper<T>,
    T: Send,
{
    type Output = Vec<T>;

    fn max_rows(&self) -> Option<usize> {
        self.parser.max_rows()
    }

    fn handle<'s>(
        self,
        results: ResultStream<'s>,
    ) -> impl Future<Output = Result<Vec<T>>> + Send + 's
    where
        Self: 's,
    {
        async move { self.parser.parse_many(results).await }
    }
}

/// Maps the first row, the rest of the result is never pulled.
pub struct FetchOne<M, T> {
    parser: ResultSetParser<M, T>,
}

impl<M: RowMapper<T>, T> FetchOne<M, T> {
    pub fn new(mapper: M) -> Self {
        Self {
            parser: ResultSetParser::with_max_rows(mapper, 1),
        }
    }
}

impl<M, T> StatementHandler for FetchOne<M, T>
where
    M: RowMapper<T>,
    T: Send,
{
    type Output = Option<T>;

    fn max_rows(&self) -> Option<usize> {
        Some(1)
    }

    fn handle<'s>(
        self,
        results: ResultStream<'s>,
    ) -> impl Future<Output = Result<Option<T>>> + Send + 's
    where
        Self: 's,
    {
        async move { self.parser.parse_single(results).await }
    }
}

/// Sums the affected-row counts of a modify statement.
#[derive(Default, Debug, Clone, Copy)]
pub struct Affected;

impl StatementHandler for Affected {
    type Output = RowsAffected;

    fn handle<'s>(
        self,
        mut results: ResultStream<'s>,
    ) -> impl Future<Output = Result<RowsAffected>> + Send + 's
    where
        Self: 's,
    {
        async move {
            let mut total = RowsAffected::default();
            while let Some(result) = results.next().await {
                if let QueryResult::Affected(affected) = result? {
                    total.extend([affected]);
                }
            }
            Ok(total)
        }
    }
}

/// Materializes the result, up to an optional cap, used to fill the cache.
#[derive(Default, Debug, Clone, Copy)]
pub(crate) struct CollectRows {
    pub max_rows: Option<usize>,
}

impl StatementHandler for CollectRows {
    type Output = Arc<[RowLabeled]>;

    fn handle<'s>(
        self,
        mut results: ResultStream<'s>,
    ) -> impl Future<Output = Result<Arc<[RowLabeled]>>> + Send + 's
    where
        Self: 's,
    {
        async move {
            let mut rows = Vec::new();
            while self.max_rows.is_none_or(|max| rows.len() < max) {
                let Some(result) = results.next().await else {
                    break;
                };
                if let QueryResult::Row(row) = result? {
                    rows.push(row);
                }
            }
            Ok(rows.into())
        }
    }
}
