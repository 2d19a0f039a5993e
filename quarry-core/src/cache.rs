use crate::{Pagination, RowLabeled, Statement, Value, mentions_table, written_table};
use std::{
    collections::HashMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

/// Cache key of a read statement: text, parameters, pagination and row cap.
///
/// Two statements share an entry only when all of them are equal, so the same
/// query with distinct parameters never returns the rows of the other one.
/// The cap is set for handlers that stop after a few rows, their entry holds
/// only those rows and never answers an uncapped read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    sql: Arc<str>,
    parameters: Arc<[Value]>,
    pagination: Option<Pagination>,
    max_rows: Option<usize>,
}

impl Fingerprint {
    pub fn of(statement: &Statement) -> Self {
        Self {
            sql: statement.sql().into(),
            parameters: statement.parameters().into(),
            pagination: statement.pagination(),
            max_rows: None,
        }
    }

    pub fn capped(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn max_rows(&self) -> Option<usize> {
        self.max_rows
    }

    /// Same statement, whatever the row cap.
    pub fn same_statement(&self, other: &Fingerprint) -> bool {
        self.sql == other.sql
            && self.parameters == other.parameters
            && self.pagination == other.pagination
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }
}

/// Shared storage used by the caching executor.
///
/// The executor only computes the keys and routes hits and misses, eviction
/// and sizing belong to the implementation.
pub trait Cache: Send + Sync {
    fn get(&self, key: &Fingerprint) -> Option<Arc<[RowLabeled]>>;

    fn put(&self, key: Fingerprint, rows: Arc<[RowLabeled]>);

    fn invalidate(&self, key: &Fingerprint);

    /// Removes every entry whose key satisfies the predicate.
    fn invalidate_matching(&self, predicate: &dyn Fn(&Fingerprint) -> bool);

    fn clear(&self) {
        self.invalidate_matching(&|_| true);
    }
}

/// Unbounded map, entries live until invalidated.
#[derive(Default, Debug)]
pub struct MemoryCache {
    entries: RwLock<HashMap<Fingerprint, Arc<[RowLabeled]>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|v| v.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &Fingerprint) -> Option<Arc<[RowLabeled]>> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn put(&self, key: Fingerprint, rows: Arc<[RowLabeled]>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, rows);
        }
    }

    fn invalidate(&self, key: &Fingerprint) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }

    fn invalidate_matching(&self, predicate: &dyn Fn(&Fingerprint) -> bool) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|k, _| !predicate(k));
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

/// What the caching executor drops from the cache after a write statement.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Only the entry keyed by the write statement itself.
    #[default]
    Statement,
    /// Every entry whose text mentions the table written by the statement.
    /// Falls back to [`WritePolicy::All`] when the table cannot be determined.
    Table,
    /// The whole cache.
    All,
}

/// Applies a [`WritePolicy`] to a cache after a write statement.
///
/// Clones share a generation counter, bumped on every invalidation. A read
/// that missed the cache stores its rows only if the generation did not move
/// while it ran, otherwise the rows may predate the write.
#[derive(Clone)]
pub struct Invalidator {
    cache: Arc<dyn Cache>,
    policy: WritePolicy,
    generation: Arc<AtomicU64>,
}

impl Invalidator {
    pub fn new(cache: Arc<dyn Cache>, policy: WritePolicy) -> Self {
        Self {
            cache,
            policy,
            generation: Default::default(),
        }
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn policy(&self) -> WritePolicy {
        self.policy
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn invalidate(&self, statement: &Statement) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        match self.policy {
            WritePolicy::Statement => {
                let key = Fingerprint::of(statement);
                self.cache
                    .invalidate_matching(&|entry| entry.same_statement(&key))
            }
            WritePolicy::Table => match written_table(statement.sql()) {
                Some(table) => {
                    log::trace!("Invalidating the cached reads of `{}`", table);
                    self.cache
                        .invalidate_matching(&|key| mentions_table(key.sql(), &table))
                }
                None => self.cache.clear(),
            },
            WritePolicy::All => self.cache.clear(),
        }
    }

    /// Stores the rows unless an invalidation happened since `generation` was read.
    pub fn put_if_current(&self, generation: u64, key: Fingerprint, rows: Arc<[RowLabeled]>) {
        if self.generation() == generation {
            self.cache.put(key, rows);
        } else {
            log::trace!("Discarding rows read before an invalidation");
        }
    }
}
