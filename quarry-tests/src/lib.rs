mod asynchronous;
mod caching;
mod errors;
mod limits;
mod records;
mod simple;
mod streaming;
mod transaction;

use crate::{
    asynchronous::asynchronous, caching::caching, errors::errors, limits::limits,
    records::records, simple::simple, streaming::streaming,
};
use log::LevelFilter;
use quarry::{Dao, Pool};
use std::env;
#[cfg(not(feature = "disable-transactions"))]
use transaction::transaction;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Runs the whole suite on `pool`. Every suite owns its tables, the database
/// behind the pool only needs to support the statements used here.
pub async fn execute_tests<P: Pool>(pool: P) {
    let dao = Dao::connect(pool);
    simple(&dao).await;
    records(&dao).await;
    limits(&dao).await;
    errors(&dao).await;
    caching(&dao).await;
    streaming(&dao).await;
    #[cfg(not(feature = "disable-transactions"))]
    transaction(&dao).await;
    asynchronous(&dao).await;
}

/// Evaluates the code with logging turned off, for the failures a test expects.
#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        let result = { $($code)+ };
        log::set_max_level(level);
        result
    }};
}
