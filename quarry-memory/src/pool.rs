use crate::{MemoryConnection, table::Tables};
use quarry_core::{Context, Error, Pool, Result};
use std::{
    collections::HashMap,
    sync::{
        Arc, LazyLock, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::Semaphore;
use url::Url;

/// Databases of the process, by name.
static DATABASES: LazyLock<Mutex<HashMap<String, Arc<Mutex<Tables>>>>> =
    LazyLock::new(Default::default);

#[derive(Default, Debug)]
pub(crate) struct Counters {
    pub(crate) acquired: AtomicU64,
    pub(crate) released: AtomicU64,
    pub(crate) statements: AtomicU64,
    pub(crate) rows_fetched: AtomicU64,
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) name: String,
    pub(crate) product: String,
    pub(crate) tables: Arc<Mutex<Tables>>,
    pub(crate) counters: Counters,
}

/// Connection accounting of one pool.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub acquired: u64,
    pub released: u64,
    /// Statements run, prepared statements are counted when executed.
    pub statements: u64,
    /// Rows handed out to consumers, counted one per pull.
    pub rows_fetched: u64,
}

impl PoolStats {
    /// Never underflows, the counters of a snapshot are read one at a time.
    pub fn in_use(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

/// Pool of connections to a named in-memory database.
///
/// Configured by URL: `memory://<name>?product=<vendor>&pool_size=<n>`.
/// Every pool created with the same name in the process sees the same tables.
/// `product` is the product name reported by the connections (default `memory`)
/// and `pool_size` the number of connections that can be acquired at once (default 8).
#[derive(Clone, Debug)]
pub struct MemoryPool {
    shared: Arc<Shared>,
    permits: Arc<Semaphore>,
}

impl MemoryPool {
    pub const DEFAULT_PRODUCT: &'static str = "memory";
    pub const DEFAULT_POOL_SIZE: usize = 8;

    pub fn connect(url: &str) -> Result<Self> {
        let context = || format!("While decoding the connection URL `{}`", url);
        let parsed = Url::parse(url).with_context(context)?;
        if parsed.scheme() != "memory" {
            let error = Error::msg(format!(
                "Expected the connection URL to start with `memory://`, found `{}://`",
                parsed.scheme()
            ))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let name = match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => parsed.path().trim_matches('/').to_string(),
        };
        let mut product = Self::DEFAULT_PRODUCT.to_string();
        let mut pool_size = Self::DEFAULT_POOL_SIZE;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "product" => product = value.into_owned(),
                "pool_size" => {
                    pool_size = value
                        .parse::<usize>()
                        .with_context(|| format!("Invalid pool_size `{}`", value))
                        .with_context(context)?
                }
                _ => log::warn!("Ignoring the unknown connection parameter `{}`", key),
            }
        }
        if pool_size == 0 {
            let error = Error::msg("The pool_size must be at least 1").context(context());
            log::error!("{:#}", error);
            return Err(error);
        }
        let tables = DATABASES
            .lock()
            .map_err(|_| Error::msg("The database registry is poisoned"))?
            .entry(name.clone())
            .or_default()
            .clone();
        log::debug!(
            "Memory pool of {} connections to `{}` as {}",
            pool_size,
            name,
            product
        );
        Ok(Self {
            shared: Arc::new(Shared {
                name,
                product,
                tables,
                counters: Default::default(),
            }),
            permits: Arc::new(Semaphore::new(pool_size)),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn product(&self) -> &str {
        &self.shared.product
    }

    /// Connections that can still be acquired without waiting.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn stats(&self) -> PoolStats {
        let counters = &self.shared.counters;
        let released = counters.released.load(Ordering::Acquire);
        PoolStats {
            acquired: counters.acquired.load(Ordering::Acquire),
            released,
            statements: counters.statements.load(Ordering::Acquire),
            rows_fetched: counters.rows_fetched.load(Ordering::Acquire),
        }
    }
}

impl Pool for MemoryPool {
    type Connection = MemoryConnection;

    async fn acquire(&self) -> Result<MemoryConnection> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .context("The memory pool is closed")?;
        self.shared
            .counters
            .acquired
            .fetch_add(1, Ordering::AcqRel);
        Ok(MemoryConnection::new(self.shared.clone(), permit))
    }
}
