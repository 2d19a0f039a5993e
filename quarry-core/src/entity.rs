use crate::{Result, Value};
use std::{collections::HashMap, fmt};

/// Reads a field of the entity as a [`Value`].
pub type Getter<E> = fn(&E) -> Value;
/// Writes a [`Value`] into a field of the entity.
pub type Setter<E> = fn(&mut E, Value) -> Result<()>;

/// Mapping between one field of a business object and its column.
pub struct FieldDescriptor<E> {
    name: &'static str,
    column: String,
    getter: Getter<E>,
    setter: Setter<E>,
}

impl<E> FieldDescriptor<E> {
    pub fn new(name: &'static str, column: &str, getter: Getter<E>, setter: Setter<E>) -> Self {
        Self {
            name,
            column: column.to_lowercase(),
            getter,
            setter,
        }
    }
    pub fn name(&self) -> &'static str {
        self.name
    }
    /// Lower cased column name.
    pub fn column(&self) -> &str {
        &self.column
    }
    pub fn get(&self, entity: &E) -> Value {
        (self.getter)(entity)
    }
    pub fn set(&self, entity: &mut E, value: Value) -> Result<()> {
        (self.setter)(entity, value)
    }
}

impl<E> fmt::Debug for FieldDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("column", &self.column)
            .finish()
    }
}

/// Ordered field table of a business object type, built once and shared read only.
pub struct EntityDescriptor<E> {
    table: String,
    fields: Vec<FieldDescriptor<E>>,
    identifier: Option<usize>,
    by_column: HashMap<String, usize>,
}

impl<E> EntityDescriptor<E> {
    pub fn builder(table: &str) -> EntityDescriptorBuilder<E> {
        EntityDescriptorBuilder {
            table: table.into(),
            fields: Vec::new(),
            identifier: None,
        }
    }
    pub fn table(&self) -> &str {
        &self.table
    }
    pub fn fields(&self) -> &[FieldDescriptor<E>] {
        &self.fields
    }
    pub fn identifier(&self) -> Option<&FieldDescriptor<E>> {
        self.identifier.map(|i| &self.fields[i])
    }
    pub fn is_identifier(&self, field: &FieldDescriptor<E>) -> bool {
        self.identifier()
            .is_some_and(|id| std::ptr::eq(id, field))
    }
    /// Case insensitive lookup of the field mapped to `column`.
    pub fn field_by_column(&self, column: &str) -> Option<&FieldDescriptor<E>> {
        if let Some(i) = self.by_column.get(column) {
            return Some(&self.fields[*i]);
        }
        self.by_column
            .get(&column.to_lowercase())
            .map(|i| &self.fields[*i])
    }
}

impl<E> fmt::Debug for EntityDescriptor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("table", &self.table)
            .field("fields", &self.fields)
            .field("identifier", &self.identifier)
            .finish()
    }
}

pub struct EntityDescriptorBuilder<E> {
    table: String,
    fields: Vec<FieldDescriptor<E>>,
    identifier: Option<usize>,
}

impl<E> EntityDescriptorBuilder<E> {
    pub fn field(mut self, field: FieldDescriptor<E>) -> Self {
        self.fields.push(field);
        self
    }
    /// Adds the field that identifies the row in UPDATE and DELETE statements.
    pub fn identifier(mut self, field: FieldDescriptor<E>) -> Self {
        self.identifier = Some(self.fields.len());
        self.fields.push(field);
        self
    }
    pub fn build(self) -> EntityDescriptor<E> {
        let by_column = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.column.clone(), i))
            .collect();
        EntityDescriptor {
            table: self.table,
            fields: self.fields,
            identifier: self.identifier,
            by_column,
        }
    }
}

/// A business object mapped to a table.
///
/// Implementations return a descriptor that is built on first use and kept
/// for the lifetime of the process, usually through the [`entity!`](crate::entity) macro:
/// ```rust
/// use quarry_core::{Entity, entity};
///
/// #[derive(Default, Clone)]
/// struct Person {
///     id: Option<i64>,
///     name: Option<String>,
///     age: Option<i32>,
/// }
/// entity!(Person => "person" {
///     #[id] id,
///     name => "full_name",
///     age,
/// });
///
/// assert_eq!(Person::descriptor().table(), "person");
/// assert_eq!(Person::descriptor().fields()[1].column(), "full_name");
/// ```
pub trait Entity: Default + Send + Sync + 'static {
    fn descriptor() -> &'static EntityDescriptor<Self>;
}

/// Implements [`Entity`] for a struct from an explicit field list.
///
/// Each field is written as `name` or `name => "column"`, the identifier field
/// is marked with `#[id]`. Field types must implement [`AsValue`](crate::AsValue) and `Clone`.
#[macro_export]
macro_rules! entity {
    (@column $field:ident) => {
        stringify!($field)
    };
    (@column $field:ident, $column:literal) => {
        $column
    };
    (@add $builder:ident, $field:ident) => {
        $builder.field($field)
    };
    (@add $builder:ident, $field:ident, id) => {
        $builder.identifier($field)
    };
    ($entity:ty => $table:literal { $($(#[$marker:ident])? $field:ident $(=> $column:literal)?),* $(,)? }) => {
        impl $crate::Entity for $entity {
            fn descriptor() -> &'static $crate::EntityDescriptor<Self> {
                static DESCRIPTOR: ::std::sync::OnceLock<$crate::EntityDescriptor<$entity>> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    let builder = $crate::EntityDescriptor::<$entity>::builder($table);
                    $(
                        let field = $crate::FieldDescriptor::<$entity>::new(
                            stringify!($field),
                            $crate::entity!(@column $field $(, $column)?),
                            |entity: &$entity| {
                                $crate::AsValue::as_value(::std::clone::Clone::clone(&entity.$field))
                            },
                            |entity: &mut $entity, value: $crate::Value| -> $crate::Result<()> {
                                entity.$field = $crate::AsValue::try_from_value(value)?;
                                Ok(())
                            },
                        );
                        let builder = $crate::entity!(@add builder, field $(, $marker)?);
                    )*
                    builder.build()
                })
            }
        }
    };
}
