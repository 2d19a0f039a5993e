use crate::{Mode, QueryResult, Result, StatementKind, Value, stream::Stream};
use std::{fmt::Display, future::Future};

/// Source of connections, usually a pool owned by the driver.
///
/// Cloning a pool must be cheap and every clone must hand out connections
/// from the same underlying set.
pub trait Pool: Clone + Send + Sync + 'static {
    type Connection: Connection;

    /// Borrow a connection. Dropping the connection gives it back to the pool.
    fn acquire(&self) -> impl Future<Output = Result<Self::Connection>> + Send;
}

/// A live database session.
///
/// Release is tied to `Drop`: a connection goes back to its pool exactly
/// once, whatever the exit path of the code that holds it.
pub trait Connection: Send + 'static {
    type Prepared: Prepared;

    /// Product name of the connected database, used to resolve the pagination dialect.
    fn product_name(&self) -> &str;

    /// Prepare a native statement.
    ///
    /// A [`StatementKind::Simple`] statement is sent as is and never receives
    /// bindings, its text is not scanned for placeholders.
    fn prepare(
        &mut self,
        sql: &str,
        mode: Mode,
        kind: StatementKind,
    ) -> impl Future<Output = Result<Self::Prepared>> + Send;

    /// Execute a prepared statement, yielding the rows of the result or the
    /// affected-row counts. Rows are produced lazily, one per pull.
    fn run<'s>(
        &'s mut self,
        prepared: Self::Prepared,
    ) -> impl Stream<Item = Result<QueryResult>> + Send + 's;

    /// Starts a transaction. A connection dropped before the matching
    /// `commit` or `rollback` must discard the pending work.
    fn begin(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// A parameterized, backend-prepared statement handle.
///
/// `bind` appends a value to the positional parameters, in placeholder order.
pub trait Prepared: Send + Display {
    fn bind(&mut self, value: Value) -> Result<&mut Self>;
    /// Remove all the previously bound values.
    fn clear_bindings(&mut self) -> Result<&mut Self>;
}
