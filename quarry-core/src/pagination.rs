use crate::{DaoError, Result, util::dao_error};
use std::{fmt::Write, sync::Arc};

/// Vendor specific offset/limit rewriting.
///
/// Rewriting only appends text: the statement must not already carry a limit clause.
pub trait PaginationDialect: Send + Sync {
    fn name(&self) -> &'static str;
    /// Case insensitive match against the product name reported by the connection.
    fn is_target_database(&self, product_name: &str) -> bool;
    fn rewrite(&self, sql: &str, offset: u64, limit: u64) -> String;
}

/// `LIMIT offset,limit`, also spoken by MariaDB.
#[derive(Default, Debug, Clone, Copy)]
pub struct MySqlDialect;

impl PaginationDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }
    fn is_target_database(&self, product_name: &str) -> bool {
        product_name.eq_ignore_ascii_case("mysql") || product_name.eq_ignore_ascii_case("mariadb")
    }
    fn rewrite(&self, sql: &str, offset: u64, limit: u64) -> String {
        let mut out = String::with_capacity(sql.len() + 24);
        out.push_str(sql);
        if offset == 0 {
            let _ = write!(out, " limit {limit}");
        } else {
            let _ = write!(out, " limit {offset},{limit}");
        }
        out
    }
}

/// `LIMIT limit OFFSET offset`.
#[derive(Default, Debug, Clone, Copy)]
pub struct PostgresDialect;

impl PaginationDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }
    fn is_target_database(&self, product_name: &str) -> bool {
        product_name.eq_ignore_ascii_case("postgresql") || product_name.eq_ignore_ascii_case("postgres")
    }
    fn rewrite(&self, sql: &str, offset: u64, limit: u64) -> String {
        limit_offset(sql, offset, limit)
    }
}

#[derive(Default, Debug, Clone, Copy)]
pub struct SqliteDialect;

impl PaginationDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }
    fn is_target_database(&self, product_name: &str) -> bool {
        product_name.eq_ignore_ascii_case("sqlite")
    }
    fn rewrite(&self, sql: &str, offset: u64, limit: u64) -> String {
        limit_offset(sql, offset, limit)
    }
}

/// SQL:2008 row limiting (`OFFSET .. ROWS FETCH NEXT .. ROWS ONLY`), Oracle 12c and SQL Server 2012 onward.
#[derive(Default, Debug, Clone, Copy)]
pub struct FetchFirstDialect;

impl PaginationDialect for FetchFirstDialect {
    fn name(&self) -> &'static str {
        "fetch-first"
    }
    fn is_target_database(&self, product_name: &str) -> bool {
        product_name.eq_ignore_ascii_case("oracle")
            || product_name.eq_ignore_ascii_case("microsoft sql server")
    }
    fn rewrite(&self, sql: &str, offset: u64, limit: u64) -> String {
        format!("{sql} offset {offset} rows fetch next {limit} rows only")
    }
}

fn limit_offset(sql: &str, offset: u64, limit: u64) -> String {
    let mut out = String::with_capacity(sql.len() + 32);
    out.push_str(sql);
    let _ = write!(out, " limit {limit}");
    if offset > 0 {
        let _ = write!(out, " offset {offset}");
    }
    out
}

/// Ordered registry of dialects, the first one matching the product name wins.
#[derive(Clone)]
pub struct Dialects {
    dialects: Vec<Arc<dyn PaginationDialect>>,
}

impl Dialects {
    /// An empty registry, every resolution fails until dialects are registered.
    pub fn empty() -> Self {
        Self {
            dialects: Vec::new(),
        }
    }

    pub fn register(mut self, dialect: impl PaginationDialect + 'static) -> Self {
        self.dialects.push(Arc::new(dialect));
        self
    }

    pub fn resolve(&self, product_name: &str) -> Result<&dyn PaginationDialect> {
        self.dialects
            .iter()
            .find(|v| v.is_target_database(product_name))
            .map(|v| v.as_ref())
            .ok_or_else(|| dao_error(DaoError::UnsupportedDialect(product_name.into())))
    }
}

impl Default for Dialects {
    fn default() -> Self {
        Self::empty()
            .register(MySqlDialect)
            .register(PostgresDialect)
            .register(SqliteDialect)
            .register(FetchFirstDialect)
    }
}
