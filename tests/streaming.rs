#[cfg(test)]
mod tests {
    use quarry::{
        Dao, NO_PARAMS, Record, Value,
        stream::{StreamExt, TryStreamExt},
    };
    use quarry_memory::MemoryPool;
    use quarry_tests::{init_logs, silent_logs};

    async fn fixture(name: &str, rows: i64) -> MemoryPool {
        let pool = MemoryPool::connect(&format!("memory://{name}")).expect("Could not open");
        let dao = Dao::connect(pool.clone());
        dao.execute("CREATE TABLE sample (id BIGINT PRIMARY KEY, value DOUBLE)", NO_PARAMS)
            .await
            .expect("Failed to create the sample table");
        for id in 0..rows {
            dao.execute(
                "INSERT INTO sample (id, value) VALUES (?, ?)",
                [Value::from(id), Value::from(id as f64 * 0.5)],
            )
            .await
            .expect("Failed to insert a sample");
        }
        pool
    }

    #[tokio::test]
    async fn lazy_and_released_once() {
        init_logs();
        let pool = fixture("stream_released_once", 100).await;
        let streamed = Dao::connect(pool.clone()).streamed();
        let start = pool.stats();

        let mut stream = streamed.query_records("SELECT * FROM sample ORDER BY id", NO_PARAMS);
        // Nothing happens before the first pull
        assert_eq!(pool.stats(), start);

        let first: Record = stream
            .try_next()
            .await
            .expect("Failed to pull")
            .expect("Expected a row");
        assert_eq!(first["id"], Value::Int64(Some(0)));
        let stats = pool.stats();
        assert_eq!(stats.in_use(), 1);
        assert_eq!(stats.rows_fetched - start.rows_fetched, 1);

        let mut count = 1;
        while let Some(row) = stream.next().await {
            row.expect("Failed to pull");
            count += 1;
        }
        assert_eq!(count, 100);
        let stats = pool.stats();
        assert_eq!(stats.acquired - start.acquired, 1);
        assert_eq!(stats.released - start.released, 1);
        assert_eq!(stats.statements - start.statements, 1);

        // Exhausted, never re-executed
        assert!(stream.next().await.is_none());
        assert_eq!(pool.stats(), stats);
    }

    #[tokio::test]
    async fn closed_early() {
        init_logs();
        let pool = fixture("stream_closed_early", 30).await;
        let streamed = Dao::connect(pool.clone()).streamed();
        let start = pool.stats();

        let mut stream = streamed.query_records("SELECT * FROM sample", NO_PARAMS);
        let taken = stream
            .by_ref()
            .take(5)
            .try_collect::<Vec<_>>()
            .await
            .expect("Failed to pull five rows");
        assert_eq!(taken.len(), 5);
        assert_eq!(pool.stats().in_use(), 1);
        stream.close();
        let stats = pool.stats();
        assert_eq!(stats.in_use(), 0);
        assert_eq!(stats.rows_fetched - start.rows_fetched, 5);
        assert!(stream.next().await.is_none());

        // Dropping is the same as closing
        let mut stream = streamed.query_records("SELECT * FROM sample", NO_PARAMS);
        stream.next().await;
        assert_eq!(pool.stats().in_use(), 1);
        drop(stream);
        assert_eq!(pool.stats().in_use(), 0);
        assert_eq!(pool.stats().released - start.released, 2);
    }

    #[tokio::test]
    async fn released_on_error() {
        init_logs();
        let pool = fixture("stream_released_on_error", 3).await;
        let streamed = Dao::connect(pool.clone()).streamed();
        let start = pool.stats();

        let mut stream =
            streamed.query_records("SELECT * FROM sample WHERE missing_column = 1", NO_PARAMS);
        let result = silent_logs! { stream.next().await };
        assert!(matches!(result, Some(Err(..))));
        let stats = pool.stats();
        assert_eq!(stats.acquired - start.acquired, 1);
        assert_eq!(stats.in_use(), 0);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn read_only_cursor() {
        init_logs();
        let pool = fixture("stream_read_only", 2).await;
        let streamed = Dao::connect(pool.clone()).streamed();
        let result = silent_logs! {
            streamed
                .query_records("DELETE FROM sample", NO_PARAMS)
                .try_collect::<Vec<_>>()
                .await
        };
        assert!(result.is_err());
        assert_eq!(pool.stats().in_use(), 0);
        let remaining = Dao::connect(pool)
            .query_scalar::<i64>("SELECT COUNT(*) FROM sample", NO_PARAMS)
            .await
            .expect("Failed to count the samples");
        assert_eq!(remaining, Some(2));
    }
}
