use crate::{
    QueryResult, Result, RowLabeled, RowMapper,
    stream::{Stream, StreamExt, TryStreamExt},
};
use std::{future, marker::PhantomData, pin::pin};

/// Drives the iteration over a tabular result and aggregates the mapped rows.
///
/// The optional row cap stops the iteration after that many rows, `1` gives
/// "fetch one" semantics without pulling the rest of the result from the connection.
pub struct ResultSetParser<M, T> {
    mapper: M,
    max_rows: Option<usize>,
    _target: PhantomData<fn() -> T>,
}

impl<M: RowMapper<T>, T> ResultSetParser<M, T> {
    pub fn new(mapper: M) -> Self {
        Self {
            mapper,
            max_rows: None,
            _target: PhantomData,
        }
    }

    pub fn with_max_rows(mapper: M, max_rows: usize) -> Self {
        Self {
            mapper,
            max_rows: Some(max_rows),
            _target: PhantomData,
        }
    }

    pub fn max_rows(&self) -> Option<usize> {
        self.max_rows
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    /// Maps the rows into an ordered sequence.
    pub async fn parse_many<S>(&self, results: S) -> Result<Vec<T>>
    where
        S: Stream<Item = Result<QueryResult>>,
    {
        let mut rows = pin!(rows_of(results));
        let mut out = Vec::new();
        while self.max_rows.is_none_or(|max| out.len() < max) {
            let Some(row) = rows.next().await else {
                break;
            };
            out.push(self.mapper.map_row(row?)?);
        }
        Ok(out)
    }

    /// Maps the first row only, ignoring the cap of the parser.
    pub async fn parse_single<S>(&self, results: S) -> Result<Option<T>>
    where
        S: Stream<Item = Result<QueryResult>>,
    {
        let mut rows = pin!(rows_of(results));
        match rows.next().await {
            Some(row) => Ok(Some(self.mapper.map_row(row?)?)),
            None => Ok(None),
        }
    }

    /// Maps the rows lazily, one per pull.
    pub fn parse_stream<'s, S>(self, results: S) -> impl Stream<Item = Result<T>> + Send + 's
    where
        S: Stream<Item = Result<QueryResult>> + Send + 's,
        M: 's,
        T: 's,
    {
        let max_rows = self.max_rows.unwrap_or(usize::MAX);
        let mapper = self.mapper;
        rows_of(results)
            .take(max_rows)
            .map(move |row| row.and_then(|row| mapper.map_row(row)))
    }
}

/// Keeps only the rows of a result, skipping the modify outcomes.
fn rows_of<S>(results: S) -> impl Stream<Item = Result<RowLabeled>>
where
    S: Stream<Item = Result<QueryResult>>,
{
    results.try_filter_map(|v| {
        future::ready(Ok(match v {
            QueryResult::Row(row) => Some(row),
            QueryResult::Affected(..) => None,
        }))
    })
}
