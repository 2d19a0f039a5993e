use crate::{
    execution_error,
    parse::{ColumnDefinition, Condition, Expr, Op, Order, Projection, Sql},
};
use quarry_core::{AsValue, Result, Row, RowNames, RowsAffected, Value};
use rust_decimal::Decimal;
use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    sync::Arc,
};
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

pub(crate) type Tables = HashMap<String, Table>;

/// Declared type of a column, values are converted to it when written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnKind {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    Varchar,
    Blob,
    Date,
    Time,
    Timestamp,
    Uuid,
    Any,
}

impl ColumnKind {
    pub(crate) fn from_type_name(type_name: &str) -> Self {
        let base = type_name
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase();
        match base.as_str() {
            "BOOLEAN" | "BOOL" => Self::Boolean,
            "TINYINT" | "SMALLINT" | "INT" | "INTEGER" | "MEDIUMINT" => Self::Int32,
            "BIGINT" => Self::Int64,
            "REAL" | "FLOAT" => Self::Float32,
            "DOUBLE" => Self::Float64,
            "DECIMAL" | "NUMERIC" => Self::Decimal,
            "VARCHAR" | "CHAR" | "TEXT" | "CLOB" | "STRING" => Self::Varchar,
            "BLOB" | "BYTEA" | "BINARY" | "VARBINARY" => Self::Blob,
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "TIMESTAMP" | "DATETIME" => Self::Timestamp,
            "UUID" => Self::Uuid,
            _ => Self::Any,
        }
    }

    fn coerce(self, value: Value) -> Result<Value> {
        Ok(match self {
            Self::Boolean => Option::<bool>::try_from_value(value)?.as_value(),
            Self::Int32 => Option::<i32>::try_from_value(value)?.as_value(),
            Self::Int64 => Option::<i64>::try_from_value(value)?.as_value(),
            Self::Float32 => Option::<f32>::try_from_value(value)?.as_value(),
            Self::Float64 => Option::<f64>::try_from_value(value)?.as_value(),
            Self::Decimal => Option::<Decimal>::try_from_value(value)?.as_value(),
            Self::Varchar => Option::<String>::try_from_value(value)?.as_value(),
            Self::Blob => Option::<Box<[u8]>>::try_from_value(value)?.as_value(),
            Self::Date => Option::<Date>::try_from_value(value)?.as_value(),
            Self::Time => Option::<Time>::try_from_value(value)?.as_value(),
            Self::Timestamp => Option::<PrimitiveDateTime>::try_from_value(value)?.as_value(),
            Self::Uuid => Option::<Uuid>::try_from_value(value)?.as_value(),
            Self::Any => value,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Column {
    name: String,
    kind: ColumnKind,
    not_null: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Table {
    name: String,
    columns: Vec<Column>,
    labels: RowNames,
    primary_key: Option<usize>,
    rows: Vec<Row>,
}

/// What a statement produced.
pub(crate) enum Outcome {
    Rows { labels: RowNames, rows: Vec<Row> },
    Affected(RowsAffected),
}

impl Outcome {
    fn affected(rows_affected: u64) -> Self {
        Outcome::Affected(RowsAffected {
            rows_affected,
            last_affected_id: None,
        })
    }
}

struct Filter {
    column: usize,
    op: Op,
    value: Value,
}

fn literal(expr: Expr) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value),
        Expr::Placeholder => Err(execution_error("A placeholder was left without a value")),
    }
}

/// Null aware comparison, values of different numeric widths compare by magnitude.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    fn number(value: &Value) -> Option<f64> {
        match value {
            Value::Int32(Some(v)) => Some(*v as f64),
            Value::Int64(Some(v)) => Some(*v as f64),
            Value::Float32(Some(v)) => Some(*v as f64),
            Value::Float64(Some(v)) => Some(*v),
            _ => None,
        }
    }
    match (a, b) {
        (Value::Boolean(Some(a)), Value::Boolean(Some(b))) => a.partial_cmp(b),
        (Value::Int32(Some(a)), Value::Int32(Some(b))) => a.partial_cmp(b),
        (Value::Int64(Some(a)), Value::Int64(Some(b))) => a.partial_cmp(b),
        (Value::Decimal(Some(a)), Value::Decimal(Some(b))) => a.partial_cmp(b),
        (Value::Varchar(Some(a)), Value::Varchar(Some(b))) => a.partial_cmp(b),
        (Value::Blob(Some(a)), Value::Blob(Some(b))) => a.partial_cmp(b),
        (Value::Date(Some(a)), Value::Date(Some(b))) => a.partial_cmp(b),
        (Value::Time(Some(a)), Value::Time(Some(b))) => a.partial_cmp(b),
        (Value::Timestamp(Some(a)), Value::Timestamp(Some(b))) => a.partial_cmp(b),
        (Value::Uuid(Some(a)), Value::Uuid(Some(b))) => a.partial_cmp(b),
        _ => number(a)?.partial_cmp(&number(b)?),
    }
}

impl Filter {
    fn matches(&self, row: &[Value]) -> bool {
        let cell = &row[self.column];
        let ordering = || compare(cell, &self.value);
        match self.op {
            Op::IsNull => cell.is_null(),
            Op::IsNotNull => !cell.is_null(),
            Op::Eq => ordering() == Some(Ordering::Equal),
            Op::Ne => ordering().is_some_and(Ordering::is_ne),
            Op::Lt => ordering() == Some(Ordering::Less),
            Op::Le => ordering().is_some_and(Ordering::is_le),
            Op::Gt => ordering() == Some(Ordering::Greater),
            Op::Ge => ordering().is_some_and(Ordering::is_ge),
        }
    }
}

impl Table {
    fn new(
        name: String,
        definitions: Vec<ColumnDefinition>,
        primary_key: Option<String>,
    ) -> Result<Self> {
        let mut key = None;
        let mut columns = Vec::with_capacity(definitions.len());
        for (i, definition) in definitions.into_iter().enumerate() {
            if columns.iter().any(|c: &Column| c.name == definition.name) {
                return Err(execution_error(format!(
                    "Column `{}` is defined twice in table `{}`",
                    definition.name, name
                )));
            }
            if definition.primary_key {
                if key.is_some() {
                    return Err(execution_error(format!(
                        "Table `{}` declares more than one primary key",
                        name
                    )));
                }
                key = Some(i);
            }
            columns.push(Column {
                kind: ColumnKind::from_type_name(&definition.type_name),
                name: definition.name,
                not_null: definition.not_null,
            });
        }
        if let Some(column) = primary_key {
            let i = columns
                .iter()
                .position(|c| c.name == column)
                .ok_or_else(|| {
                    execution_error(format!(
                        "Primary key column `{}` is not defined in table `{}`",
                        column, name
                    ))
                })?;
            if key.is_some_and(|k| k != i) {
                return Err(execution_error(format!(
                    "Table `{}` declares more than one primary key",
                    name
                )));
            }
            columns[i].not_null = true;
            key = Some(i);
        }
        let labels = columns.iter().map(|c| c.name.clone()).collect();
        Ok(Self {
            name,
            columns,
            labels,
            primary_key: key,
            rows: Vec::new(),
        })
    }

    fn column(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| {
                execution_error(format!(
                    "Unknown column `{}` in table `{}`",
                    name, self.name
                ))
            })
    }

    fn coerce(&self, column: usize, value: Value) -> Result<Value> {
        let column = &self.columns[column];
        column.kind.coerce(value).map_err(|e| {
            let error = e.context(format!(
                "While converting a value for column `{}` of table `{}`",
                column.name, self.name
            ));
            log::error!("{:#}", error);
            error
        })
    }

    fn filters(&self, conditions: Vec<Condition>) -> Result<Vec<Filter>> {
        conditions
            .into_iter()
            .map(|condition| {
                let column = self.column(&condition.column)?;
                let value = self.coerce(column, literal(condition.value)?)?;
                Ok(Filter {
                    column,
                    op: condition.op,
                    value,
                })
            })
            .collect()
    }

    fn check_not_null(&self, row: &[Value]) -> Result<()> {
        for (column, value) in self.columns.iter().zip(row) {
            if column.not_null && value.is_null() {
                return Err(execution_error(format!(
                    "Column `{}` of table `{}` cannot be NULL",
                    column.name, self.name
                )));
            }
        }
        Ok(())
    }

    /// Fails unless every row has a distinct primary key.
    fn check_unique<'r>(&self, rows: impl Iterator<Item = &'r [Value]>) -> Result<()> {
        let Some(key) = self.primary_key else {
            return Ok(());
        };
        let mut seen = HashSet::new();
        for row in rows {
            if !seen.insert(&row[key]) {
                return Err(execution_error(format!(
                    "Duplicate primary key {} in table `{}`",
                    row[key], self.name
                )));
            }
        }
        Ok(())
    }

    fn insert(&mut self, columns: Vec<String>, values: Vec<Vec<Expr>>) -> Result<Outcome> {
        let indexes = columns
            .iter()
            .map(|c| self.column(c))
            .collect::<Result<Vec<_>>>()?;
        let mut inserted = Vec::with_capacity(values.len());
        for exprs in values {
            if exprs.len() != indexes.len() {
                return Err(execution_error(format!(
                    "INSERT into `{}` lists {} columns but {} values",
                    self.name,
                    indexes.len(),
                    exprs.len()
                )));
            }
            let mut row: Vec<Value> = self
                .columns
                .iter()
                .map(|c| c.kind.coerce(Value::Null))
                .collect::<Result<_>>()?;
            for (&i, expr) in indexes.iter().zip(exprs) {
                row[i] = self.coerce(i, literal(expr)?)?;
            }
            self.check_not_null(&row)?;
            inserted.push(Row::from(row));
        }
        self.check_unique(
            self.rows
                .iter()
                .chain(inserted.iter())
                .map(|v| &v[..]),
        )?;
        let last_affected_id = self.primary_key.and_then(|key| {
            inserted
                .last()
                .and_then(|row| i64::try_from_value(row[key].clone()).ok())
        });
        let rows_affected = inserted.len() as u64;
        self.rows.extend(inserted);
        Ok(Outcome::Affected(RowsAffected {
            rows_affected,
            last_affected_id,
        }))
    }

    fn update(
        &mut self,
        assignments: Vec<(String, Expr)>,
        conditions: Vec<Condition>,
    ) -> Result<Outcome> {
        let assignments = assignments
            .into_iter()
            .map(|(column, expr)| {
                let column = self.column(&column)?;
                Ok((column, self.coerce(column, literal(expr)?)?))
            })
            .collect::<Result<Vec<_>>>()?;
        let filters = self.filters(conditions)?;
        let mut rows = self.rows.clone();
        let mut rows_affected = 0;
        for row in rows
            .iter_mut()
            .filter(|row| filters.iter().all(|f| f.matches(row)))
        {
            for (column, value) in &assignments {
                row[*column] = value.clone();
            }
            self.check_not_null(row)?;
            rows_affected += 1;
        }
        self.check_unique(rows.iter().map(|v| &v[..]))?;
        self.rows = rows;
        Ok(Outcome::affected(rows_affected))
    }

    fn delete(&mut self, conditions: Vec<Condition>) -> Result<Outcome> {
        let filters = self.filters(conditions)?;
        let before = self.rows.len();
        self.rows
            .retain(|row| !filters.iter().all(|f| f.matches(row)));
        Ok(Outcome::affected((before - self.rows.len()) as u64))
    }

    fn select(
        &self,
        projection: Projection,
        conditions: Vec<Condition>,
        order: Vec<Order>,
        offset: u64,
        limit: Option<u64>,
    ) -> Result<Outcome> {
        let filters = self.filters(conditions)?;
        let mut rows: Vec<&Row> = self
            .rows
            .iter()
            .filter(|row| filters.iter().all(|f| f.matches(row)))
            .collect();
        if projection == Projection::Count {
            return Ok(Outcome::Rows {
                labels: Arc::new(["count".to_string()]),
                rows: vec![Row::from([Value::Int64(Some(rows.len() as i64))])],
            });
        }
        let order = order
            .into_iter()
            .map(|o| Ok((self.column(&o.column)?, o.descending)))
            .collect::<Result<Vec<_>>>()?;
        rows.sort_by(|a, b| {
            for &(column, descending) in &order {
                let ordering = match (a[column].is_null(), b[column].is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (false, false) => compare(&a[column], &b[column]).unwrap_or(Ordering::Equal),
                };
                let ordering = if descending {
                    ordering.reverse()
                } else {
                    ordering
                };
                if ordering.is_ne() {
                    return ordering;
                }
            }
            Ordering::Equal
        });
        let rows = rows
            .into_iter()
            .skip(offset as usize)
            .take(limit.map_or(usize::MAX, |v| v as usize));
        Ok(match projection {
            Projection::Columns(names) => {
                let indexes = names
                    .iter()
                    .map(|c| self.column(c))
                    .collect::<Result<Vec<_>>>()?;
                Outcome::Rows {
                    labels: names.into(),
                    rows: rows
                        .map(|row| indexes.iter().map(|&i| row[i].clone()).collect())
                        .collect(),
                }
            }
            _ => Outcome::Rows {
                labels: self.labels.clone(),
                rows: rows.cloned().collect(),
            },
        })
    }
}

fn table<'t>(tables: &'t mut Tables, name: &str) -> Result<&'t mut Table> {
    tables
        .get_mut(name)
        .ok_or_else(|| execution_error(format!("Table `{}` does not exist", name)))
}

/// Runs a bound statement against a set of tables.
///
/// A failing statement leaves the tables untouched.
pub(crate) fn execute(tables: &mut Tables, sql: Sql) -> Result<Outcome> {
    match sql {
        Sql::CreateTable {
            name,
            if_not_exists,
            columns,
            primary_key,
        } => {
            if tables.contains_key(&name) {
                if if_not_exists {
                    return Ok(Outcome::affected(0));
                }
                return Err(execution_error(format!("Table `{}` already exists", name)));
            }
            let table = Table::new(name.clone(), columns, primary_key)?;
            tables.insert(name, table);
            Ok(Outcome::affected(0))
        }
        Sql::DropTable { name, if_exists } => {
            if tables.remove(&name).is_none() && !if_exists {
                return Err(execution_error(format!("Table `{}` does not exist", name)));
            }
            Ok(Outcome::affected(0))
        }
        Sql::Insert {
            table: name,
            columns,
            rows,
        } => table(tables, &name)?.insert(columns, rows),
        Sql::Update {
            table: name,
            assignments,
            filter,
        } => table(tables, &name)?.update(assignments, filter),
        Sql::Delete {
            table: name,
            filter,
        } => table(tables, &name)?.delete(filter),
        Sql::Select {
            table: name,
            projection,
            filter,
            order,
            offset,
            limit,
        } => table(tables, &name)?.select(projection, filter, order, offset, limit),
    }
}
