mod asynchronous;
mod caching;
mod plain;
mod stream;
mod transaction;

pub use asynchronous::*;
pub use caching::*;
pub use plain::*;
pub use stream::*;
pub use transaction::*;

use crate::{
    Connection, Context, Dialects, Invalidator, Pagination, Pool, Prepared, Result, Statement,
    StatementHandler, StatementKind, stream::StreamExt, truncate_long,
};
use std::{borrow::Cow, future::Future, sync::Arc};

/// Executes a statement and hands the raw outcome to a handler.
///
/// Every call borrows one connection from the pool for its whole duration and
/// gives it back on every exit path, unless the executor is bound to a
/// transactional scope that owns the connection.
pub trait Executor: Send + Sync {
    type Pool: Pool;

    /// The pool connections are borrowed from.
    fn pool(&self) -> &Self::Pool;

    /// Dialects used to paginate statements.
    fn dialects(&self) -> &Arc<Dialects>;

    /// Cache invalidation applied after the writes of this executor, if it caches reads.
    fn invalidator(&self) -> Option<&Invalidator> {
        None
    }

    fn execute<H: StatementHandler>(
        &self,
        statement: Statement,
        handler: H,
    ) -> impl Future<Output = Result<H::Output>> + Send;
}

/// Applies the pagination of the statement, if any, with the dialect of the connected product.
pub(crate) fn render<'s>(
    product_name: &str,
    dialects: &Dialects,
    statement: &'s Statement,
) -> Result<Cow<'s, str>> {
    Ok(match statement.pagination() {
        None => Cow::Borrowed(statement.sql()),
        Some(Pagination { offset, limit }) => Cow::Owned(
            dialects
                .resolve(product_name)?
                .rewrite(statement.sql(), offset, limit),
        ),
    })
}

/// Prepares a statement on the connection and, for a prepared one, binds its parameters in order.
pub(crate) async fn prepare<C: Connection>(
    connection: &mut C,
    dialects: &Dialects,
    statement: &Statement,
) -> Result<C::Prepared> {
    let sql = render(connection.product_name(), dialects, statement)?;
    log::debug!("{}", truncate_long!(sql));
    let mut prepared = connection
        .prepare(&sql, statement.mode(), statement.kind())
        .await
        .with_context(|| format!("While preparing the statement:\n{}", truncate_long!(sql)))?;
    if statement.kind() == StatementKind::Prepared {
        for value in statement.parameters() {
            prepared.bind(value.clone())?;
        }
    }
    Ok(prepared)
}

/// Runs a statement on an already acquired connection.
pub(crate) async fn run_statement<C: Connection, H: StatementHandler>(
    connection: &mut C,
    dialects: &Dialects,
    statement: &Statement,
    handler: H,
) -> Result<H::Output> {
    let prepared = prepare(connection, dialects, statement).await?;
    let handled: std::pin::Pin<Box<dyn Future<Output = Result<H::Output>> + Send + '_>> =
        Box::pin(handler.handle(connection.run(prepared).boxed()));
    handled
        .await
        .with_context(|| format!("While executing the statement:\n{}", statement))
}
