#[cfg(test)]
mod tests {
    use quarry::{
        Dao, DaoError, Dialects, EntityMapper, Mode, NO_PARAMS, PaginationDialect, PlainExecutor,
        ResultSetParser, Statement, StreamExecutor, entity, stream::TryStreamExt,
    };
    use quarry_memory::MemoryPool;
    use quarry_tests::{init_logs, silent_logs};

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Planet {
        name: String,
        moons: i32,
    }
    entity!(Planet => "planet" {
        #[id] name,
        moons,
    });

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Visit {
        planet: String,
        year: i32,
    }
    entity!(Visit => "visit" { planet, year });

    async fn fixture(url: &str) -> MemoryPool {
        let pool = MemoryPool::connect(url).expect("Could not open");
        let dao = Dao::connect(pool.clone());
        dao.execute(
            "CREATE TABLE planet (name VARCHAR PRIMARY KEY, moons INTEGER NOT NULL)",
            NO_PARAMS,
        )
        .await
        .expect("Failed to create the planet table");
        for (name, moons) in [
            ("Mercury", 0),
            ("Venus", 0),
            ("Earth", 1),
            ("Mars", 2),
            ("Jupiter", 95),
            ("Saturn", 146),
            ("Uranus", 28),
            ("Neptune", 16),
        ] {
            dao.insert(&Planet {
                name: name.into(),
                moons,
            })
            .await
            .expect("Failed to insert a planet");
        }
        pool
    }

    #[tokio::test]
    async fn fetch_one_reads_one_row() {
        init_logs();
        let pool = fixture("memory://dao_fetch_one").await;
        let dao = Dao::connect(pool.clone());
        let before = pool.stats().rows_fetched;
        let first = dao
            .query_one::<Planet>("SELECT * FROM planet ORDER BY moons DESC", NO_PARAMS)
            .await
            .expect("Failed to read the first planet");
        assert_eq!(first.map(|v| v.name), Some("Saturn".into()));
        assert_eq!(pool.stats().rows_fetched - before, 1);

        let before = pool.stats().rows_fetched;
        let moons = dao
            .query_scalar::<i32>("SELECT moons FROM planet WHERE moons > ? ORDER BY moons", [10])
            .await
            .expect("Failed to read the moons");
        assert_eq!(moons, Some(16));
        assert_eq!(pool.stats().rows_fetched - before, 1);

        let nothing = dao
            .query_one_record("SELECT * FROM planet WHERE moons > ?", [1000])
            .await
            .expect("Failed to run an empty query");
        assert_eq!(nothing, None);
        assert_eq!(pool.stats().in_use(), 0);
    }

    #[tokio::test]
    async fn dialect_per_product() {
        init_logs();
        let products = ["mysql", "mariadb", "postgres", "sqlite", "oracle", "Microsoft SQL Server"];
        for (i, product) in products.into_iter().enumerate() {
            let pool = fixture(&format!("memory://dao_dialect_{i}?product={product}")).await;
            let names = Dao::connect(pool)
                .page::<Planet>("SELECT * FROM planet ORDER BY moons, name", NO_PARAMS, 2, 3)
                .await
                .expect("Failed to read a page");
            assert_eq!(
                names.into_iter().map(|v| v.name).collect::<Vec<_>>(),
                ["Earth", "Mars", "Neptune"],
                "Product {product}"
            );
        }
    }

    #[tokio::test]
    async fn unsupported_dialect() {
        init_logs();
        let pool = fixture("memory://dao_informix?product=informix").await;
        let dao = Dao::connect(pool.clone());
        // Unpaged statements do not need a dialect
        let all = dao
            .query::<Planet>("SELECT * FROM planet", NO_PARAMS)
            .await
            .expect("Failed to read the planets");
        assert_eq!(all.len(), 8);

        let error = silent_logs! {
            dao.page::<Planet>("SELECT * FROM planet", NO_PARAMS, 0, 2)
                .await
                .expect_err("Informix has no registered dialect")
        };
        assert_eq!(
            error.downcast_ref::<DaoError>(),
            Some(&DaoError::UnsupportedDialect("informix".into()))
        );
        assert_eq!(pool.stats().in_use(), 0);

        struct Informix;
        impl PaginationDialect for Informix {
            fn name(&self) -> &'static str {
                "informix"
            }
            fn is_target_database(&self, product_name: &str) -> bool {
                product_name.eq_ignore_ascii_case("informix")
            }
            fn rewrite(&self, sql: &str, offset: u64, limit: u64) -> String {
                format!("{sql} LIMIT {limit} OFFSET {offset}")
            }
        }
        let dao = Dao::new(
            PlainExecutor::new(pool.clone()).with_dialects(Dialects::default().register(Informix)),
        );
        let page = dao
            .page::<Planet>("SELECT * FROM planet ORDER BY name", NO_PARAMS, 0, 2)
            .await
            .expect("Failed to read a page with the registered dialect");
        assert_eq!(page.len(), 2);

        // Derived facades keep the registry
        let streamed = dao
            .streamed()
            .page::<Planet>("SELECT * FROM planet ORDER BY name", NO_PARAMS, 6, 10)
            .try_collect::<Vec<_>>()
            .await
            .expect("Failed to stream a page with the registered dialect");
        assert_eq!(streamed.len(), 2);
    }

    #[tokio::test]
    async fn entities_without_identifier() {
        init_logs();
        let pool = fixture("memory://dao_no_identifier").await;
        let dao = Dao::connect(pool.clone());
        dao.execute("CREATE TABLE visit (planet VARCHAR NOT NULL, year INTEGER)", NO_PARAMS)
            .await
            .expect("Failed to create the visit table");
        let visit = Visit {
            planet: "Mars".into(),
            year: 2021,
        };
        dao.insert(&visit).await.expect("Inserting needs no identifier");
        dao.insert(&visit).await.expect("Inserting needs no identifier");

        let before = pool.stats();
        for error in [
            silent_logs! { dao.update(&visit).await.expect_err("Update needs an identifier") },
            silent_logs! { dao.delete(&visit).await.expect_err("Delete needs an identifier") },
            silent_logs! {
                dao.find_by_id::<Visit>("Mars").await.expect_err("Lookup needs an identifier")
            },
        ] {
            assert!(matches!(
                error.downcast_ref::<DaoError>(),
                Some(DaoError::MissingIdentifier(..))
            ));
        }
        // Nothing reached the database
        assert_eq!(pool.stats(), before);

        let visits = dao
            .query::<Visit>("SELECT * FROM visit", NO_PARAMS)
            .await
            .expect("Failed to read the visits");
        assert_eq!(visits, [visit.clone(), visit]);
    }

    #[tokio::test]
    async fn streamed_writes_are_rejected() {
        init_logs();
        let pool = fixture("memory://dao_stream_writes").await;
        let executor = StreamExecutor::new(pool.clone());
        let statement = Statement::simple("DELETE FROM planet", Mode::Updatable)
            .expect("Failed to build the statement");
        let before = pool.stats();
        let error = silent_logs! {
            executor
                .stream(statement, ResultSetParser::new(EntityMapper::<Planet>::new()))
                .try_collect::<Vec<_>>()
                .await
                .expect_err("Only reads can be streamed")
        };
        assert!(matches!(
            error.downcast_ref::<DaoError>(),
            Some(DaoError::InvalidStatement(..))
        ));
        assert_eq!(pool.stats(), before);
    }
}
