#[cfg(test)]
mod tests {
    use quarry::{Dao, DaoError, NO_PARAMS, TypedDao, Value, dao, entity};
    use quarry_memory::MemoryPool;
    use quarry_tests::{init_logs, silent_logs};

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Book {
        id: i64,
        title: String,
        pages: i32,
    }
    entity!(Book => "book" {
        #[id] id,
        title,
        pages,
    });

    dao! {
        /// Queries of the book table.
        pub struct BookDao {
            query longer_than(pages: i32) -> Book =
                "SELECT * FROM book WHERE pages > ? ORDER BY id";
            query_one by_title(title: String) -> Book = "SELECT * FROM book WHERE title = ?";
            query_scalar count() -> i64 = "SELECT COUNT(*) FROM book";
            query_records titles() = "SELECT title FROM book ORDER BY id";
            query_one_record first() = "SELECT * FROM book ORDER BY id";
            execute retitle(title: String, id: i64) = "UPDATE book SET title = ? WHERE id = ?";
            execute add(id: i64, title: &str, pages: i32,) =
                "INSERT INTO book (id, title, pages) VALUES (?, ?, ?)";
            /// Misses its second value on purpose.
            query broken(id: i64) -> Book = "SELECT * FROM book WHERE id = ? AND pages = ?";
        }
    }

    async fn fixture(name: &str) -> Dao<quarry::PlainExecutor<MemoryPool>> {
        let pool = MemoryPool::connect(&format!("memory://{name}")).expect("Could not open");
        let dao = Dao::connect(pool);
        dao.execute(
            "CREATE TABLE book (id BIGINT PRIMARY KEY, title VARCHAR NOT NULL, pages INTEGER)",
            NO_PARAMS,
        )
        .await
        .expect("Failed to create the book table");
        dao.execute(
            "INSERT INTO book (id, title, pages) VALUES (1, 'Dune', 412), (2, 'Solaris', 204)",
            NO_PARAMS,
        )
        .await
        .expect("Failed to insert the books");
        dao
    }

    #[tokio::test]
    async fn declared_methods() {
        init_logs();
        let dao = fixture("typed_methods").await;
        let books: BookDao<_> = dao.typed();

        let long = books.longer_than(300).await.expect("Failed to query the books");
        assert_eq!(long.iter().map(|v| v.id).collect::<Vec<_>>(), [1]);

        let solaris = books
            .by_title("Solaris".into())
            .await
            .expect("Failed to query by title");
        assert_eq!(solaris.map(|v| v.pages), Some(204));
        assert_eq!(books.count().await.expect("Failed to count"), Some(2));

        let affected = books
            .add(3, "Hyperion", 482)
            .await
            .expect("Failed to add a book");
        assert_eq!(affected.rows_affected, 1);
        let affected = books
            .retitle("Dune Messiah".into(), 1)
            .await
            .expect("Failed to retitle a book");
        assert_eq!(affected.rows_affected, 1);

        let titles = books.titles().await.expect("Failed to read the titles");
        assert_eq!(titles.len(), 3);
        assert_eq!(titles[0]["title"], Value::Varchar(Some("Dune Messiah".into())));
        let first = books.first().await.expect("Failed to read the first book");
        assert_eq!(
            first.map(|v| v["title"].clone()),
            Some(Value::Varchar(Some("Dune Messiah".into())))
        );

        let error = silent_logs! {
            books.broken(1).await.expect_err("A missing value must fail")
        };
        assert!(matches!(
            error.downcast_ref::<DaoError>(),
            Some(DaoError::ParameterCount {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[tokio::test]
    async fn bound_to_a_transaction() {
        init_logs();
        let dao = fixture("typed_transaction").await;
        let books = BookDao::bind(dao.begin().await.expect("Failed to begin"));
        books
            .add(3, "Hyperion", 482)
            .await
            .expect("Failed to add a book");
        assert_eq!(books.count().await.expect("Failed to count"), Some(3));
        books
            .into_dao()
            .rollback()
            .await
            .expect("Failed to roll back");

        let books: BookDao<_> = dao.typed();
        assert_eq!(books.count().await.expect("Failed to count"), Some(2));
        let rows = books
            .dao()
            .query_records("SELECT * FROM book", NO_PARAMS)
            .await
            .expect("Failed to read the books");
        assert_eq!(rows.len(), 2);
    }
}
