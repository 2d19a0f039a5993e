mod async_dao;
mod dao;
mod stream_dao;
mod typed_dao;

pub use ::quarry_core::*;
pub use async_dao::*;
pub use dao::*;
pub use stream_dao::*;
pub use typed_dao::*;
