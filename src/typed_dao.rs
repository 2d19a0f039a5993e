use crate::{Dao, Executor};

/// A set of SQL-bound methods over a [`Dao`], usually declared with [`dao!`](crate::dao!).
pub trait TypedDao<E: Executor>: Sized {
    fn bind(dao: Dao<E>) -> Self;

    fn dao(&self) -> &Dao<E>;

    /// Gives the facade back, a transactional one still has to be committed.
    fn into_dao(self) -> Dao<E>;
}

impl<E: Executor> Dao<E> {
    /// Binds the typed methods of `D` to a copy of this facade.
    pub fn typed<D: TypedDao<E>>(&self) -> D
    where
        E: Clone,
    {
        D::bind(self.clone())
    }
}

/// Declares a struct of async methods, each one running a fixed statement with
/// its arguments as positional values.
///
/// Every method is written as `<kind> name(arg: Type, ...) [-> Type] = "SQL";`,
/// where `kind` is the [`Dao`] call it maps to:
///
/// - `query name(..) -> T` returns `Vec<T>` of entities
/// - `query_one name(..) -> T` returns `Option<T>`
/// - `query_scalar name(..) -> T` returns `Option<T>` of the first column
/// - `query_records name(..)` returns `Vec<Record>`
/// - `query_one_record name(..)` returns `Option<Record>`
/// - `execute name(..)` returns the [`RowsAffected`](crate::RowsAffected)
///
/// Arguments are bound in declaration order and must implement [`AsValue`](crate::AsValue).
///
/// ```ignore
/// quarry::dao! {
///     pub struct PersonDao {
///         query older_than(age: i32) -> Person = "SELECT * FROM person WHERE age > ?";
///         query_scalar count() -> i64 = "SELECT COUNT(*) FROM person";
///         execute rename(name: String, id: i64) = "UPDATE person SET name = ? WHERE id = ?";
///     }
/// }
///
/// let people: PersonDao<_> = dao.typed();
/// let total = people.count().await?;
/// ```
#[macro_export]
macro_rules! dao {
    (@values $($arg:ident),*) => {{
        let values: ::std::vec::Vec<$crate::Value> =
            ::std::vec![$($crate::AsValue::as_value($arg)),*];
        values
    }};
    (@method $(#[$meta:meta])* query $method:ident ($($arg:ident : $ty:ty),*) -> $ret:ty = $sql:literal) => {
        $(#[$meta])*
        pub async fn $method(&self, $($arg: $ty),*) -> $crate::Result<::std::vec::Vec<$ret>> {
            self.dao.query::<$ret>($sql, $crate::dao!(@values $($arg),*)).await
        }
    };
    (@method $(#[$meta:meta])* query_one $method:ident ($($arg:ident : $ty:ty),*) -> $ret:ty = $sql:literal) => {
        $(#[$meta])*
        pub async fn $method(&self, $($arg: $ty),*) -> $crate::Result<::std::option::Option<$ret>> {
            self.dao.query_one::<$ret>($sql, $crate::dao!(@values $($arg),*)).await
        }
    };
    (@method $(#[$meta:meta])* query_scalar $method:ident ($($arg:ident : $ty:ty),*) -> $ret:ty = $sql:literal) => {
        $(#[$meta])*
        pub async fn $method(&self, $($arg: $ty),*) -> $crate::Result<::std::option::Option<$ret>> {
            self.dao.query_scalar::<$ret>($sql, $crate::dao!(@values $($arg),*)).await
        }
    };
    (@method $(#[$meta:meta])* query_records $method:ident ($($arg:ident : $ty:ty),*) = $sql:literal) => {
        $(#[$meta])*
        pub async fn $method(&self, $($arg: $ty),*) -> $crate::Result<::std::vec::Vec<$crate::Record>> {
            self.dao.query_records($sql, $crate::dao!(@values $($arg),*)).await
        }
    };
    (@method $(#[$meta:meta])* query_one_record $method:ident ($($arg:ident : $ty:ty),*) = $sql:literal) => {
        $(#[$meta])*
        pub async fn $method(&self, $($arg: $ty),*) -> $crate::Result<::std::option::Option<$crate::Record>> {
            self.dao.query_one_record($sql, $crate::dao!(@values $($arg),*)).await
        }
    };
    (@method $(#[$meta:meta])* execute $method:ident ($($arg:ident : $ty:ty),*) = $sql:literal) => {
        $(#[$meta])*
        pub async fn $method(&self, $($arg: $ty),*) -> $crate::Result<$crate::RowsAffected> {
            self.dao.execute($sql, $crate::dao!(@values $($arg),*)).await
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$method_meta:meta])*
                $kind:ident $method:ident ($($arg:ident : $ty:ty),* $(,)?) $(-> $ret:ty)? = $sql:literal;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis struct $name<E: $crate::Executor> {
            dao: $crate::Dao<E>,
        }

        impl<E: $crate::Executor + ::std::clone::Clone> ::std::clone::Clone for $name<E> {
            fn clone(&self) -> Self {
                Self {
                    dao: ::std::clone::Clone::clone(&self.dao),
                }
            }
        }

        impl<E: $crate::Executor> $crate::TypedDao<E> for $name<E> {
            fn bind(dao: $crate::Dao<E>) -> Self {
                Self { dao }
            }

            fn dao(&self) -> &$crate::Dao<E> {
                &self.dao
            }

            fn into_dao(self) -> $crate::Dao<E> {
                self.dao
            }
        }

        impl<E: $crate::Executor> $name<E> {
            $(
                $crate::dao!(@method $(#[$method_meta])* $kind $method ($($arg : $ty),*) $(-> $ret)? = $sql);
            )*
        }
    };
}
