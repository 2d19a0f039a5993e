use crate::{AsValue, DaoError, Result, Value, count_placeholders, truncate_long, util::dao_error};
use std::{
    fmt::{self, Display},
    sync::Arc,
};

/// Cursor behaviour hinted to the connection.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    ReadOnly,
    Updatable,
}

/// Whether the statement binds parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Raw text, no parameter substitution.
    Simple,
    /// Text with positional `?` placeholders and an ordered list of values.
    Prepared,
}

/// Offset and limit applied by the pagination dialect of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

/// Immutable description of one unit of SQL work.
///
/// Built per call by [`Statement::simple`], [`Statement::prepared`] or
/// [`Statement::new`] and consumed by an [`Executor`](crate::Executor). The
/// placeholder count of a prepared statement is checked against the values at
/// execution time by [`Statement::check_parameters`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    sql: Arc<str>,
    parameters: Arc<[Value]>,
    mode: Mode,
    kind: StatementKind,
    pagination: Option<Pagination>,
}

fn validate_text(sql: &str) -> Result<()> {
    if sql.trim().is_empty() {
        return Err(dao_error(DaoError::InvalidStatement(
            "the statement text is empty".into(),
        )));
    }
    Ok(())
}

impl Statement {
    pub fn simple(sql: impl Into<String>, mode: Mode) -> Result<Self> {
        let sql = sql.into();
        validate_text(&sql)?;
        Ok(Self {
            sql: sql.into(),
            parameters: Arc::new([]),
            mode,
            kind: StatementKind::Simple,
            pagination: None,
        })
    }

    pub fn prepared<I>(sql: impl Into<String>, parameters: I, mode: Mode) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsValue,
    {
        let sql = sql.into();
        validate_text(&sql)?;
        Ok(Self {
            sql: sql.into(),
            parameters: parameters.into_iter().map(AsValue::as_value).collect(),
            mode,
            kind: StatementKind::Prepared,
            pagination: None,
        })
    }

    /// Simple when there are no values, prepared otherwise.
    pub fn new<I>(sql: impl Into<String>, parameters: I, mode: Mode) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsValue,
    {
        let parameters: Vec<Value> = parameters.into_iter().map(AsValue::as_value).collect();
        if parameters.is_empty() {
            Self::simple(sql, mode)
        } else {
            Self::prepared(sql, parameters, mode)
        }
    }

    /// Returns a copy of the statement that the executor paginates with the
    /// dialect of the connection it runs on.
    pub fn paginated(mut self, offset: u64, limit: u64) -> Self {
        self.pagination = Some(Pagination { offset, limit });
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    pub fn is_read_only(&self) -> bool {
        self.mode == Mode::ReadOnly
    }

    /// Fails with [`DaoError::ParameterCount`] unless every placeholder has exactly one value.
    ///
    /// Simple statements always pass, their text is never scanned.
    pub fn check_parameters(&self) -> Result<()> {
        if self.kind == StatementKind::Simple {
            return Ok(());
        }
        let expected = count_placeholders(&self.sql);
        let actual = self.parameters.len();
        if expected != actual {
            let error = dao_error(DaoError::ParameterCount { expected, actual });
            return Err(error.context(format!(
                "While checking the statement:\n{}",
                truncate_long!(self.sql)
            )));
        }
        Ok(())
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncate_long!(self.sql))?;
        if !self.parameters.is_empty() {
            f.write_str(" [")?;
            for (i, v) in self.parameters.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{v}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}
