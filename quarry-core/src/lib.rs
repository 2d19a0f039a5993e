mod as_value;
mod cache;
mod connection;
mod entity;
mod error;
mod executor;
mod handler;
mod mapper;
mod pagination;
mod parser;
mod row;
mod sql_parser;
mod statement;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use cache::*;
pub use connection::*;
pub use entity::*;
pub use error::*;
pub use executor::*;
pub use handler::{Affected, FetchMany, FetchOne, ResultStream, StatementHandler};
pub use mapper::*;
pub use pagination::*;
pub use parser::*;
pub use row::*;
pub use sql_parser::*;
pub use statement::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
