#[cfg(test)]
mod tests {
    use quarry::{AsValue, Dao, DaoError, MemoryCache, NO_PARAMS, PlainExecutor, entity};
    use quarry_memory::MemoryPool;
    use quarry_tests::{init_logs, silent_logs};
    use std::sync::Arc;

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Order {
        id: i64,
        customer: String,
        total: f64,
    }
    entity!(Order => "purchase_order" {
        #[id] id,
        customer,
        total,
    });

    async fn fixture(name: &str) -> (MemoryPool, Dao<PlainExecutor<MemoryPool>>) {
        let pool = MemoryPool::connect(&format!("memory://{name}")).expect("Could not open");
        let dao = Dao::connect(pool.clone());
        dao.execute(
            "CREATE TABLE purchase_order (id BIGINT PRIMARY KEY, customer VARCHAR NOT NULL, total DOUBLE)",
            NO_PARAMS,
        )
        .await
        .expect("Failed to create the order table");
        (pool, dao)
    }

    #[tokio::test]
    async fn second_statement_fails() {
        init_logs();
        let (pool, dao) = fixture("tx_second_fails").await;
        let transaction = dao.begin().await.expect("Could not begin");
        transaction
            .insert(&Order {
                id: 1,
                customer: "ACME".into(),
                total: 10.0,
            })
            .await
            .expect("Failed to insert the first order");
        let error = silent_logs! {
            transaction
                .execute(
                    "INSERT INTO purchase_order (id, customer) VALUES (?, ?)",
                    [2_i64.as_value(), Option::<String>::None.as_value()],
                )
                .await
                .expect_err("A null customer violates the constraint")
        };
        assert!(matches!(
            error.downcast_ref::<DaoError>(),
            Some(DaoError::Execution(..))
        ));
        let error = silent_logs! {
            transaction
                .insert(&Order {
                    id: 3,
                    customer: "Initech".into(),
                    total: 5.0,
                })
                .await
                .expect_err("The transaction is over")
        };
        assert!(matches!(
            error.downcast_ref::<DaoError>(),
            Some(DaoError::TransactionState(..))
        ));
        drop(transaction);

        let orders = dao
            .query::<Order>("SELECT * FROM purchase_order", NO_PARAMS)
            .await
            .expect("Failed to read the orders");
        assert!(orders.is_empty());
        assert_eq!(pool.stats().in_use(), 0);
    }

    #[tokio::test]
    async fn single_connection() {
        init_logs();
        let (pool, dao) = fixture("tx_single_connection").await;
        let start = pool.stats();
        let transaction = dao.begin().await.expect("Could not begin");
        for id in 1..=5 {
            transaction
                .insert(&Order {
                    id,
                    customer: format!("customer {id}"),
                    total: id as f64,
                })
                .await
                .expect("Failed to insert an order");
        }
        let inside = transaction
            .query_scalar::<i64>("SELECT COUNT(*) FROM purchase_order", NO_PARAMS)
            .await
            .expect("Failed to count inside the transaction");
        assert_eq!(inside, Some(5));
        let outside = dao
            .query_scalar::<i64>("SELECT COUNT(*) FROM purchase_order", NO_PARAMS)
            .await
            .expect("Failed to count outside the transaction");
        assert_eq!(outside, Some(0));
        transaction.commit().await.expect("Failed to commit");

        let stats = pool.stats();
        // One for the transaction, one for the outside count
        assert_eq!(stats.acquired - start.acquired, 2);
        assert_eq!(stats.in_use(), 0);
        let committed = dao
            .query_one::<Order>("SELECT * FROM purchase_order WHERE id = ?", [5])
            .await
            .expect("Failed to read the last order");
        assert_eq!(committed.map(|v| v.customer), Some("customer 5".into()));
    }

    #[tokio::test]
    async fn nested_and_sequential() {
        init_logs();
        let (pool, dao) = fixture("tx_nested").await;
        let transaction = dao.begin().await.expect("Could not begin");
        let nested = silent_logs! { transaction.begin().await };
        let Err(error) = nested else {
            panic!("Nested transactions must fail");
        };
        assert!(matches!(
            error.downcast_ref::<DaoError>(),
            Some(DaoError::TransactionState(..))
        ));
        // The failed begin leaves the scope usable
        transaction
            .execute(
                "INSERT INTO purchase_order (id, customer) VALUES (1, 'first')",
                NO_PARAMS,
            )
            .await
            .expect("Failed to insert");
        transaction.rollback().await.expect("Failed to roll back");

        // Facades derived from the same root share the scope
        let cached = dao.cached(Arc::new(MemoryCache::new()));
        let transaction = cached.begin().await.expect("Could not begin");
        let concurrent = silent_logs! { dao.begin().await };
        assert!(concurrent.is_err());
        transaction.commit().await.expect("Failed to commit");
        let transaction = dao.begin().await.expect("A finished scope frees the slot");
        transaction.rollback().await.expect("Failed to roll back");

        // Independent roots do not
        let other = Dao::connect(pool);
        let first = dao.begin().await.expect("Could not begin");
        let second = other.begin().await.expect("Could not begin on another root");
        first.rollback().await.expect("Failed to roll back");
        second.rollback().await.expect("Failed to roll back");
    }
}
