use crate::{
    MemoryPrepared, execution_error,
    parse::parse_sql,
    pool::Shared,
    table::{Outcome, Tables, execute},
};
use async_stream::try_stream;
use quarry_core::{
    Connection, DaoError, Error, Mode, QueryResult, Result, RowLabeled, StatementKind,
    stream::Stream, truncate_long,
};
use std::sync::{Arc, atomic::Ordering};
use tokio::sync::OwnedSemaphorePermit;

/// A connection of a [`MemoryPool`](crate::MemoryPool).
///
/// Inside a transaction the connection works on a private copy of the tables,
/// `commit` publishes the copy and any other end discards it.
pub struct MemoryConnection {
    shared: Arc<Shared>,
    transaction: Option<Tables>,
    _permit: OwnedSemaphorePermit,
}

impl MemoryConnection {
    pub(crate) fn new(shared: Arc<Shared>, permit: OwnedSemaphorePermit) -> Self {
        Self {
            shared,
            transaction: None,
            _permit: permit,
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    fn apply(&mut self, prepared: MemoryPrepared) -> Result<Outcome> {
        let statement = prepared.into_bound()?;
        if let Some(tables) = self.transaction.as_mut() {
            return execute(tables, statement);
        }
        let mut tables = self
            .shared
            .tables
            .lock()
            .map_err(|_| execution_error("The database is poisoned"))?;
        execute(&mut tables, statement)
    }

    fn transaction_error(message: &str) -> Error {
        let error = Error::new(DaoError::TransactionState(message.into()));
        log::error!("{:#}", error);
        error
    }
}

impl Connection for MemoryConnection {
    type Prepared = MemoryPrepared;

    fn product_name(&self) -> &str {
        &self.shared.product
    }

    async fn prepare(
        &mut self,
        sql: &str,
        mode: Mode,
        kind: StatementKind,
    ) -> Result<MemoryPrepared> {
        let Some(statement) = parse_sql(sql) else {
            return Err(execution_error(format!(
                "Unsupported or malformed statement:\n{}",
                truncate_long!(sql)
            )));
        };
        if mode == Mode::ReadOnly && statement.is_write() {
            return Err(execution_error(format!(
                "A read only cursor cannot run:\n{}",
                truncate_long!(sql)
            )));
        }
        Ok(MemoryPrepared::new(sql.to_string(), statement, kind))
    }

    fn run<'s>(
        &'s mut self,
        prepared: MemoryPrepared,
    ) -> impl Stream<Item = Result<QueryResult>> + Send + 's {
        let shared = self.shared.clone();
        try_stream! {
            shared.counters.statements.fetch_add(1, Ordering::AcqRel);
            match self.apply(prepared)? {
                Outcome::Affected(affected) => {
                    yield QueryResult::Affected(affected);
                }
                Outcome::Rows { labels, rows } => {
                    for values in rows {
                        shared.counters.rows_fetched.fetch_add(1, Ordering::AcqRel);
                        yield QueryResult::Row(RowLabeled::new(labels.clone(), values));
                    }
                }
            }
        }
    }

    async fn begin(&mut self) -> Result<()> {
        if self.transaction.is_some() {
            return Err(Self::transaction_error(
                "the connection is already in a transaction",
            ));
        }
        let snapshot = self
            .shared
            .tables
            .lock()
            .map_err(|_| execution_error("The database is poisoned"))?
            .clone();
        self.transaction = Some(snapshot);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let Some(tables) = self.transaction.take() else {
            return Err(Self::transaction_error("no transaction to commit"));
        };
        *self
            .shared
            .tables
            .lock()
            .map_err(|_| execution_error("The database is poisoned"))? = tables;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if self.transaction.take().is_none() {
            return Err(Self::transaction_error("no transaction to roll back"));
        }
        Ok(())
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        if self.transaction.take().is_some() {
            log::debug!("Connection released inside a transaction, discarding its changes");
        }
        self.shared
            .counters
            .released
            .fetch_add(1, Ordering::AcqRel);
    }
}
