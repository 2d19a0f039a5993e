use crate::{
    DaoError, Entity, Mode, Record, Result, Statement, Value, separated_by, util::dao_error,
};
use std::{any, fmt::Write};

/// Statement kinds generated from an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOperation {
    Insert,
    Update,
    Delete,
}

/// Produces a statement from an object description.
pub trait SqlParser {
    fn parse(&self) -> Result<Statement>;
}

/// Generates statements from an [`Entity`] and its descriptor.
///
/// - INSERT lists only the fields holding a non null value.
/// - UPDATE sets every field but the identifier, which goes last in the WHERE clause.
/// - DELETE filters on the identifier alone.
pub struct EntitySqlParser<'e, E: Entity> {
    entity: &'e E,
    operation: SqlOperation,
}

impl<'e, E: Entity> EntitySqlParser<'e, E> {
    pub fn new(entity: &'e E, operation: SqlOperation) -> Self {
        Self { entity, operation }
    }

    fn identifier(&self) -> Result<(&'static str, Value)> {
        let missing = || dao_error(DaoError::MissingIdentifier(any::type_name::<E>().into()));
        let field = E::descriptor().identifier().ok_or_else(missing)?;
        let value = field.get(self.entity);
        if value.is_null() {
            return Err(missing());
        }
        Ok((field.column(), value))
    }
}

impl<E: Entity> SqlParser for EntitySqlParser<'_, E> {
    fn parse(&self) -> Result<Statement> {
        let descriptor = E::descriptor();
        let table = descriptor.table();
        match self.operation {
            SqlOperation::Insert => {
                let columns = descriptor
                    .fields()
                    .iter()
                    .map(|f| (f.column(), f.get(self.entity)))
                    .filter(|(_, v)| !v.is_null());
                write_insert(table, columns)
            }
            SqlOperation::Update => {
                let (id_column, id_value) = self.identifier()?;
                let columns = descriptor
                    .fields()
                    .iter()
                    .filter(|f| !descriptor.is_identifier(f))
                    .map(|f| (f.column(), f.get(self.entity)));
                write_update(table, columns, id_column, id_value)
            }
            SqlOperation::Delete => {
                let (id_column, id_value) = self.identifier()?;
                write_delete(table, id_column, id_value)
            }
        }
    }
}

/// Generates statements from a [`Record`] addressed to an explicit table.
///
/// The columns present in the record are the ones written, NULLs included,
/// except for INSERT which skips them like the entity convention does.
pub struct RecordSqlParser<'r> {
    table: &'r str,
    identifier: Option<&'r str>,
    record: &'r Record,
    operation: SqlOperation,
}

impl<'r> RecordSqlParser<'r> {
    pub fn new(
        table: &'r str,
        identifier: Option<&'r str>,
        record: &'r Record,
        operation: SqlOperation,
    ) -> Self {
        Self {
            table,
            identifier,
            record,
            operation,
        }
    }

    fn identifier(&self) -> Result<(String, Value)> {
        let missing = || dao_error(DaoError::MissingIdentifier(format!("record of {}", self.table)));
        let column = self.identifier.ok_or_else(missing)?.to_lowercase();
        match self.record.get(&column) {
            Some(v) if !v.is_null() => Ok((column, v.clone())),
            _ => Err(missing()),
        }
    }
}

impl SqlParser for RecordSqlParser<'_> {
    fn parse(&self) -> Result<Statement> {
        match self.operation {
            SqlOperation::Insert => write_insert(
                self.table,
                self.record
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(c, v)| (c, v.clone())),
            ),
            SqlOperation::Update => {
                let (id_column, id_value) = self.identifier()?;
                write_update(
                    self.table,
                    self.record
                        .iter()
                        .filter(|(c, _)| *c != id_column)
                        .map(|(c, v)| (c, v.clone())),
                    &id_column,
                    id_value,
                )
            }
            SqlOperation::Delete => {
                let (id_column, id_value) = self.identifier()?;
                write_delete(self.table, &id_column, id_value)
            }
        }
    }
}

/// Dispatches to the generation strategy of the object convention in use.
///
/// Entities are erased behind the trait so one parser type serves both conventions.
pub enum RoutingSqlParser<'a> {
    Entity(Box<dyn SqlParser + Send + 'a>),
    Record(RecordSqlParser<'a>),
}

impl<'a> RoutingSqlParser<'a> {
    pub fn entity<E: Entity>(entity: &'a E, operation: SqlOperation) -> Self {
        Self::Entity(Box::new(EntitySqlParser::new(entity, operation)))
    }

    pub fn record(
        table: &'a str,
        identifier: Option<&'a str>,
        record: &'a Record,
        operation: SqlOperation,
    ) -> Self {
        Self::Record(RecordSqlParser::new(table, identifier, record, operation))
    }
}

impl SqlParser for RoutingSqlParser<'_> {
    fn parse(&self) -> Result<Statement> {
        match self {
            Self::Entity(parser) => parser.parse(),
            Self::Record(parser) => parser.parse(),
        }
    }
}

/// `SELECT <columns> FROM <table> WHERE <identifier> = ?` for the entity type.
pub fn select_by_identifier<E: Entity>(id: Value) -> Result<Statement> {
    let descriptor = E::descriptor();
    let Some(identifier) = descriptor.identifier() else {
        return Err(dao_error(DaoError::MissingIdentifier(
            any::type_name::<E>().into(),
        )));
    };
    let mut sql = String::with_capacity(128);
    sql.push_str("SELECT ");
    separated_by(
        &mut sql,
        descriptor.fields(),
        |out, f| out.push_str(f.column()),
        ", ",
    );
    let _ = write!(
        sql,
        " FROM {} WHERE {} = ?",
        descriptor.table(),
        identifier.column()
    );
    Statement::prepared(sql, [id], Mode::ReadOnly)
}

fn write_insert<'c>(
    table: &str,
    columns: impl Iterator<Item = (&'c str, Value)>,
) -> Result<Statement> {
    let (columns, values): (Vec<_>, Vec<_>) = columns.unzip();
    if columns.is_empty() {
        return Err(dao_error(DaoError::InvalidStatement(format!(
            "nothing to insert into `{table}`, every field is null"
        ))));
    }
    let mut sql = String::with_capacity(64 + columns.len() * 16);
    let _ = write!(sql, "INSERT INTO {table} (");
    separated_by(&mut sql, &columns, |out, c| out.push_str(c), ", ");
    sql.push_str(") VALUES (");
    separated_by(&mut sql, &columns, |out, _| out.push('?'), ", ");
    sql.push(')');
    Statement::prepared(sql, values, Mode::Updatable)
}

fn write_update<'c>(
    table: &str,
    columns: impl Iterator<Item = (&'c str, Value)>,
    id_column: &str,
    id_value: Value,
) -> Result<Statement> {
    let (columns, mut values): (Vec<_>, Vec<_>) = columns.unzip();
    if columns.is_empty() {
        return Err(dao_error(DaoError::InvalidStatement(format!(
            "nothing to update in `{table}`, only the identifier is mapped"
        ))));
    }
    let mut sql = String::with_capacity(64 + columns.len() * 16);
    let _ = write!(sql, "UPDATE {table} SET ");
    separated_by(
        &mut sql,
        &columns,
        |out, c| {
            let _ = write!(out, "{c} = ?");
        },
        ", ",
    );
    let _ = write!(sql, " WHERE {id_column} = ?");
    values.push(id_value);
    Statement::prepared(sql, values, Mode::Updatable)
}

fn write_delete(table: &str, id_column: &str, id_value: Value) -> Result<Statement> {
    Statement::prepared(
        format!("DELETE FROM {table} WHERE {id_column} = ?"),
        [id_value],
        Mode::Updatable,
    )
}
