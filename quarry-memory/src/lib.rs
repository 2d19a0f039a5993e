mod connection;
mod parse;
mod pool;
mod prepared;
mod table;

pub use connection::*;
pub use pool::*;
pub use prepared::*;

use quarry_core::{DaoError, Error};

/// Failure of a statement, reported the way a database would.
pub(crate) fn execution_error(message: impl Into<String>) -> Error {
    let error = Error::new(DaoError::Execution(message.into()));
    log::error!("{:#}", error);
    error
}
