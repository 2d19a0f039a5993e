use crate::{AsValue, Entity, Error, Record, Result, RowLabeled};
use std::{any, marker::PhantomData};

/// Converts one row of a tabular result into a value.
///
/// The row is passed by value, a mapper cannot keep references into the cursor that produced it.
pub trait RowMapper<T>: Send + Sync {
    fn map_row(&self, row: RowLabeled) -> Result<T>;
}

impl<T, F> RowMapper<T> for F
where
    F: Fn(RowLabeled) -> Result<T> + Send + Sync,
{
    fn map_row(&self, row: RowLabeled) -> Result<T> {
        self(row)
    }
}

/// Populates an [`Entity`] from the columns whose name matches one of its fields.
///
/// Matching is case insensitive, unknown columns are ignored and fields
/// without a column keep their default value.
pub struct EntityMapper<E>(PhantomData<fn() -> E>);

impl<E> EntityMapper<E> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for EntityMapper<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> RowMapper<E> for EntityMapper<E> {
    fn map_row(&self, row: RowLabeled) -> Result<E> {
        let descriptor = E::descriptor();
        let mut entity = E::default();
        for (label, value) in row.labels.iter().zip(row.values.into_vec()) {
            let Some(field) = descriptor.field_by_column(label) else {
                continue;
            };
            field.set(&mut entity, value).map_err(|e| {
                let error = e.context(format!(
                    "While setting field `{}` of {} from column `{}`",
                    field.name(),
                    any::type_name::<E>(),
                    label,
                ));
                log::error!("{:#}", error);
                error
            })?;
        }
        Ok(entity)
    }
}

/// Builds a [`Record`] preserving the column order of the result.
#[derive(Default, Debug, Clone, Copy)]
pub struct RecordMapper;

impl RowMapper<Record> for RecordMapper {
    fn map_row(&self, row: RowLabeled) -> Result<Record> {
        Ok(row.into())
    }
}

/// Converts the first column of the row.
pub struct ScalarMapper<T>(PhantomData<fn() -> T>);

impl<T> ScalarMapper<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for ScalarMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: AsValue> RowMapper<T> for ScalarMapper<T> {
    fn map_row(&self, row: RowLabeled) -> Result<T> {
        let Some(value) = row.values.into_vec().into_iter().next() else {
            let error = Error::msg("Cannot map a scalar from a row without columns");
            log::error!("{:#}", error);
            return Err(error);
        };
        T::try_from_value(value)
    }
}
