use crate::{Dialects, Executor, Pool, Result, Statement, StatementHandler, executor::run_statement};
use std::sync::Arc;

/// Borrows a connection per statement, runs it and releases the connection.
#[derive(Clone)]
pub struct PlainExecutor<P: Pool> {
    pool: P,
    dialects: Arc<Dialects>,
}

impl<P: Pool> PlainExecutor<P> {
    pub fn new(pool: P) -> Self {
        Self {
            pool,
            dialects: Default::default(),
        }
    }

    /// Replaces the default pagination dialects.
    pub fn with_dialects(mut self, dialects: Dialects) -> Self {
        self.dialects = dialects.into();
        self
    }
}

impl<P: Pool> Executor for PlainExecutor<P> {
    type Pool = P;

    fn pool(&self) -> &P {
        &self.pool
    }

    fn dialects(&self) -> &Arc<Dialects> {
        &self.dialects
    }

    async fn execute<H: StatementHandler>(
        &self,
        statement: Statement,
        handler: H,
    ) -> Result<H::Output> {
        statement.check_parameters()?;
        let mut connection = self.pool.acquire().await?;
        run_statement(&mut connection, &self.dialects, &statement, handler).await
    }
}
