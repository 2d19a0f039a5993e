use crate::{DaoError, Error, Executor, Result, Statement, StatementHandler, util::dao_error};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::{runtime::Handle, sync::Semaphore, task::JoinHandle};

/// Offloads executions to tasks of the current tokio runtime, at most `workers` at a time.
///
/// Submission never blocks and never fails synchronously: every outcome,
/// including the absence of a runtime, is delivered through the returned [`Pending`].
/// Independent submissions complete in no particular order.
pub struct AsyncExecutor<E> {
    inner: Arc<E>,
    workers: Arc<Semaphore>,
}

impl<E> Clone for AsyncExecutor<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            workers: self.workers.clone(),
        }
    }
}

impl<E: Executor + 'static> AsyncExecutor<E> {
    /// `workers` is clamped to at least one.
    pub fn new(inner: E, workers: usize) -> Self {
        Self {
            inner: Arc::new(inner),
            workers: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Number of workers currently idle.
    pub fn idle_workers(&self) -> usize {
        self.workers.available_permits()
    }

    pub fn submit<H>(&self, statement: Statement, handler: H) -> Pending<H::Output>
    where
        H: StatementHandler + 'static,
        H::Output: 'static,
    {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                let error = Error::new(e).context("Asynchronous execution requires a tokio runtime");
                log::error!("{:#}", error);
                return Pending::failed(error);
            }
        };
        let inner = self.inner.clone();
        let workers = self.workers.clone();
        Pending::spawned(handle.spawn(async move {
            let _permit = workers.acquire_owned().await?;
            inner.execute(statement, handler).await
        }))
    }
}

enum State<T> {
    Running(JoinHandle<Result<T>>),
    Failed(Option<Error>),
}

/// Completion of an asynchronous execution.
///
/// Resolves to the result of the wrapped executor, errors included. Dropping it
/// detaches the execution, which still runs to completion.
pub struct Pending<T> {
    state: State<T>,
}

impl<T> Pending<T> {
    pub(crate) fn spawned(handle: JoinHandle<Result<T>>) -> Self {
        Self {
            state: State::Running(handle),
        }
    }

    /// Completes with `error` on the first poll.
    pub fn failed(error: Error) -> Self {
        Self {
            state: State::Failed(Some(error)),
        }
    }

    /// Requests the cancellation of the execution.
    ///
    /// An execution that has not started yet never reaches the database. Once
    /// started, cancellation takes effect at the next suspension point and work
    /// already sent to the database is not undone. A cancelled execution
    /// completes with [`DaoError::Cancelled`].
    pub fn cancel(&self) {
        if let State::Running(handle) = &self.state {
            handle.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        match &self.state {
            State::Running(handle) => handle.is_finished(),
            State::Failed(..) => true,
        }
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<T>> {
        match &mut self.state {
            State::Running(handle) => match Pin::new(handle).poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(e)) if e.is_cancelled() => {
                    Poll::Ready(Err(dao_error(DaoError::Cancelled)))
                }
                Poll::Ready(Err(e)) => {
                    let error = Error::new(e).context("The asynchronous execution panicked");
                    log::error!("{:#}", error);
                    Poll::Ready(Err(error))
                }
            },
            State::Failed(error) => Poll::Ready(Err(error
                .take()
                .unwrap_or_else(|| Error::msg("Pending polled after completion")))),
        }
    }
}
