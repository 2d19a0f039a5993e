use thiserror::Error;

/// Failures raised by the data-access layer itself.
///
/// They travel inside [`crate::Error`] (an `anyhow::Error`) like every other
/// failure, callers classify them with `error.downcast_ref::<DaoError>()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DaoError {
    /// Empty or malformed statement text.
    #[error("Invalid statement: {0}")]
    InvalidStatement(String),
    /// The statement text has a different number of placeholders than bound values.
    #[error("The statement expects {expected} parameters but {actual} were supplied")]
    ParameterCount { expected: usize, actual: usize },
    /// Object based UPDATE or DELETE on an entity without an identifier.
    #[error("Entity `{0}` has no identifier field or its identifier is null")]
    MissingIdentifier(String),
    /// No pagination dialect is registered for the connected database.
    #[error("No pagination dialect supports the database `{0}`")]
    UnsupportedDialect(String),
    /// Nested or already finished transactional scope.
    #[error("Transaction state error: {0}")]
    TransactionState(String),
    /// Failure reported by the database (constraint violation, unknown table, disconnect).
    #[error("Execution error: {0}")]
    Execution(String),
    /// An asynchronous submission was cancelled before completing.
    #[error("The asynchronous execution was cancelled")]
    Cancelled,
}
