use crate::{
    Connection, DaoError, Dialects, Error, Pool, Result, ResultSetParser, RowMapper, Statement,
    executor::prepare,
    future,
    stream::{self, BoxStream, FusedStream, Stream, StreamExt},
    util::dao_error,
};
use async_stream::try_stream;
use std::{
    pin::{Pin, pin},
    sync::Arc,
    task::{Context, Poll},
};

/// Runs read statements as lazy sequences of mapped rows.
///
/// Each sequence owns its connection until it is exhausted, fails or is closed.
#[derive(Clone)]
pub struct StreamExecutor<P: Pool> {
    pool: P,
    dialects: Arc<Dialects>,
}

impl<P: Pool> StreamExecutor<P> {
    pub fn new(pool: P) -> Self {
        Self::with_dialects(pool, Default::default())
    }

    pub fn with_dialects(pool: P, dialects: Arc<Dialects>) -> Self {
        Self { pool, dialects }
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// Nothing happens until the first pull, which acquires the connection and
    /// runs the statement. Every following pull maps one more row.
    pub fn stream<M, T>(&self, statement: Statement, parser: ResultSetParser<M, T>) -> RowStream<T>
    where
        M: RowMapper<T> + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let dialects = self.dialects.clone();
        RowStream::new(try_stream! {
            if !statement.is_read_only() {
                Err(dao_error(DaoError::InvalidStatement(
                    "only read only statements can be streamed".into(),
                )))?;
            }
            statement.check_parameters()?;
            let mut connection = pool.acquire().await?;
            let prepared = prepare(&mut connection, &dialects, &statement).await?;
            let mut rows = pin!(parser.parse_stream(connection.run(prepared)));
            while let Some(row) = rows.next().await {
                yield row?;
            }
        })
    }
}

/// Forward only, single pass sequence of rows backed by an open connection.
///
/// The connection is released as soon as the sequence ends, an error is
/// returned or [`RowStream::close`] is called, and before the final item is
/// handed out. Pulling again afterwards yields nothing and never re-executes
/// the statement. The sequence is not `Sync`: it has exactly one consumer.
pub struct RowStream<T> {
    inner: Option<BoxStream<'static, Result<T>>>,
}

impl<T> RowStream<T> {
    pub(crate) fn new(stream: impl Stream<Item = Result<T>> + Send + 'static) -> Self {
        Self {
            inner: Some(stream.boxed()),
        }
    }

    /// A sequence whose only item is `error`.
    pub fn failed(error: Error) -> Self
    where
        T: Send + 'static,
    {
        Self::new(stream::once(future::ready(Err(error))))
    }

    /// Ends the sequence early, releasing its connection.
    pub fn close(&mut self) {
        self.inner = None;
    }
}

impl<T> Stream for RowStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<T>>> {
        let Some(inner) = self.inner.as_mut() else {
            return Poll::Ready(None);
        };
        match inner.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(value))) => Poll::Ready(Some(Ok(value))),
            Poll::Ready(last) => {
                self.inner = None;
                Poll::Ready(last)
            }
        }
    }
}

impl<T> FusedStream for RowStream<T> {
    fn is_terminated(&self) -> bool {
        self.inner.is_none()
    }
}
