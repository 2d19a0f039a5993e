use crate::parse::{Expr, Sql};
use quarry_core::{DaoError, Error, Prepared, Result, StatementKind, Value, truncate_long};
use std::fmt::{self, Display};

/// A parsed statement and the values bound to its placeholders so far.
///
/// A simple statement refuses bindings, a placeholder left in its text fails
/// at execution like any unbound one.
#[derive(Debug)]
pub struct MemoryPrepared {
    sql: String,
    statement: Sql,
    kind: StatementKind,
    parameters: Vec<Value>,
}

impl MemoryPrepared {
    pub(crate) fn new(sql: String, statement: Sql, kind: StatementKind) -> Self {
        Self {
            sql,
            statement,
            kind,
            parameters: Vec::new(),
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    /// Substitutes the placeholders in text order, every one must have a value.
    pub(crate) fn into_bound(self) -> Result<Sql> {
        let mut statement = self.statement;
        let slots = statement.placeholders();
        if slots.len() != self.parameters.len() {
            let error = Error::new(DaoError::ParameterCount {
                expected: slots.len(),
                actual: self.parameters.len(),
            })
            .context(format!(
                "While binding the statement:\n{}",
                truncate_long!(self.sql)
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
        for (slot, value) in slots.into_iter().zip(self.parameters) {
            *slot = Expr::Literal(value);
        }
        Ok(statement)
    }
}

impl Prepared for MemoryPrepared {
    fn bind(&mut self, value: Value) -> Result<&mut Self> {
        if self.kind == StatementKind::Simple {
            let error = Error::new(DaoError::InvalidStatement(
                "a simple statement takes no parameters".into(),
            ))
            .context(format!(
                "While binding the statement:\n{}",
                truncate_long!(self.sql)
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
        self.parameters.push(value);
        Ok(self)
    }

    fn clear_bindings(&mut self) -> Result<&mut Self> {
        self.parameters.clear();
        Ok(self)
    }
}

impl Display for MemoryPrepared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
