#[cfg(test)]
mod tests {
    use quarry::{Connection, Dao, DaoError, NO_PARAMS, Pool, Value, future};
    use quarry_memory::MemoryPool;
    use quarry_tests::{init_logs, silent_logs};
    use std::time::Duration;
    use tokio::time::sleep;

    async fn fixture(url: &str) -> MemoryPool {
        let pool = MemoryPool::connect(url).expect("Could not open");
        Dao::connect(pool.clone())
            .execute("CREATE TABLE metric (name VARCHAR PRIMARY KEY, value DOUBLE)", NO_PARAMS)
            .await
            .expect("Failed to create the metric table");
        pool
    }

    #[tokio::test]
    async fn completes_with_result() {
        init_logs();
        let pool = fixture("memory://async_result").await;
        let dao = Dao::connect(pool.clone()).asynchronous(2);
        let inserts = ["cpu", "memory", "disk", "network"]
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                dao.execute(
                    "INSERT INTO metric (name, value) VALUES (?, ?)",
                    [Value::from(name.to_string()), Value::from(i as f64)],
                )
            })
            .collect::<Vec<_>>();
        let total: u64 = future::try_join_all(inserts)
            .await
            .expect("Failed to insert the metrics")
            .iter()
            .map(|v| v.rows_affected)
            .sum();
        assert_eq!(total, 4);

        let value = dao
            .query_scalar::<f64>("SELECT value FROM metric WHERE name = ?", ["disk"])
            .await
            .expect("Failed to read the metric");
        assert_eq!(value, Some(2.0));
        assert_eq!(dao.executor().idle_workers(), 2);
        assert_eq!(pool.stats().in_use(), 0);
    }

    #[tokio::test]
    async fn completes_with_error() {
        init_logs();
        let pool = fixture("memory://async_error").await;
        let dao = Dao::connect(pool).asynchronous(1);
        let pending = dao.query_records("SELECT * FROM metric WHERE name = ? AND value > ?", ["x"]);
        let error = silent_logs! { pending.await.expect_err("Missing parameter") };
        assert!(matches!(
            error.downcast_ref::<DaoError>(),
            Some(DaoError::ParameterCount {
                expected: 2,
                actual: 1
            })
        ));
        let pending = dao.query_records("SELECT * FROM unknown_metric", NO_PARAMS);
        let error = silent_logs! { pending.await.expect_err("Unknown table") };
        assert!(matches!(
            error.downcast_ref::<DaoError>(),
            Some(DaoError::Execution(..))
        ));
        // Build failures are delivered the same way
        let pending = dao.query_records("  ", NO_PARAMS);
        assert!(pending.is_finished());
        let error = silent_logs! { pending.await.expect_err("Empty statement") };
        assert!(matches!(
            error.downcast_ref::<DaoError>(),
            Some(DaoError::InvalidStatement(..))
        ));
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        init_logs();
        let pool = fixture("memory://async_cancel?pool_size=1").await;
        let dao = Dao::connect(pool.clone()).asynchronous(4);

        // Hold the only connection, the submission waits for it
        let held = pool.acquire().await.expect("Failed to acquire");
        assert_eq!(held.product_name(), "memory");
        let before = pool.stats();
        let pending = dao.execute(
            "INSERT INTO metric (name, value) VALUES ('never', 0)",
            NO_PARAMS,
        );
        sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());
        pending.cancel();
        let error = pending.await.expect_err("The execution was cancelled");
        assert_eq!(error.downcast_ref::<DaoError>(), Some(&DaoError::Cancelled));
        drop(held);

        let count = Dao::connect(pool.clone())
            .query_scalar::<i64>("SELECT COUNT(*) FROM metric", NO_PARAMS)
            .await
            .expect("Failed to count the metrics");
        assert_eq!(count, Some(0));
        assert_eq!(pool.stats().acquired - before.acquired, 1);
    }

    #[tokio::test]
    async fn bounded_workers() {
        init_logs();
        let pool = fixture("memory://async_bounded?pool_size=1").await;
        let dao = Dao::connect(pool.clone()).asynchronous(3);
        let held = pool.acquire().await.expect("Failed to acquire");
        let pending = (0..5)
            .map(|_| dao.query_records("SELECT * FROM metric", NO_PARAMS))
            .collect::<Vec<_>>();
        sleep(Duration::from_millis(20)).await;
        assert_eq!(dao.executor().idle_workers(), 0);
        drop(held);
        for rows in future::try_join_all(pending)
            .await
            .expect("Failed to read the metrics")
        {
            assert!(rows.is_empty());
        }
        assert_eq!(dao.executor().idle_workers(), 3);
    }

    #[test]
    fn without_runtime() {
        let pool = MemoryPool::connect("memory://async_no_runtime").expect("Could not open");
        let pending = silent_logs! {
            Dao::connect(pool).asynchronous(1).query_records("SELECT * FROM metric", NO_PARAMS)
        };
        assert!(pending.is_finished());
        let runtime = tokio::runtime::Runtime::new().expect("Failed to start a runtime");
        assert!(runtime.block_on(pending).is_err());
    }
}
