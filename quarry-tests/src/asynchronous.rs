use quarry::{AsValue, Dao, DaoError, NO_PARAMS, PlainExecutor, Pool, entity, future};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Default, Debug, Clone, PartialEq)]
struct Job {
    id: i64,
    queue: String,
    attempts: i32,
}
entity!(Job => "job" {
    #[id] id,
    queue,
    attempts,
});

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn asynchronous<P: Pool>(dao: &Dao<PlainExecutor<P>>) {
    let _lock = MUTEX.lock().await;

    // Setup
    dao.execute("DROP TABLE IF EXISTS job", NO_PARAMS)
        .await
        .expect("Failed to drop the job table");
    dao.execute(
        "CREATE TABLE job (id BIGINT PRIMARY KEY, queue VARCHAR NOT NULL, attempts INTEGER NOT NULL)",
        NO_PARAMS,
    )
    .await
    .expect("Failed to create the job table");

    let background = dao.asynchronous(4);
    let inserts = (1..=20)
        .map(|id| {
            background.insert(&Job {
                id,
                queue: if id <= 5 { "urgent" } else { "batch" }.into(),
                attempts: 0,
            })
        })
        .collect::<Vec<_>>();
    for result in future::join_all(inserts).await {
        let affected = result.expect("Failed to insert a job");
        assert_eq!(affected.rows_affected, 1);
    }

    let urgent =
        background.query::<Job>("SELECT * FROM job WHERE queue = ? ORDER BY id", ["urgent"]);
    let count = background.query_scalar::<i64>("SELECT COUNT(*) FROM job", NO_PARAMS);
    let (urgent, count) = future::join(urgent, count).await;
    assert_eq!(
        urgent
            .expect("Failed to query the urgent jobs")
            .iter()
            .map(|v| v.id)
            .collect::<Vec<_>>(),
        [1, 2, 3, 4, 5]
    );
    assert_eq!(count.expect("Failed to count the jobs"), Some(20));

    let affected = background
        .execute(
            "UPDATE job SET attempts = ? WHERE queue = ?",
            [1_i32.as_value(), "batch".as_value()],
        )
        .await
        .expect("Failed to update the batch jobs");
    assert_eq!(affected.rows_affected, 15);

    let first = background
        .query_one::<Job>("SELECT * FROM job WHERE attempts > ? ORDER BY id", [0])
        .await
        .expect("Failed to query the first retried job");
    assert_eq!(first.map(|v| v.id), Some(6));

    // Errors are delivered through the pending result
    let error = background
        .query_records("SELECT * FROM job WHERE id = ? AND id = ?", [1])
        .await
        .expect_err("A missing parameter must fail");
    assert!(matches!(
        error.downcast_ref::<DaoError>(),
        Some(DaoError::ParameterCount { .. })
    ));
    let deleted = background
        .delete(&Job {
            id: 3,
            queue: "urgent".into(),
            attempts: 0,
        })
        .await;
    assert_eq!(deleted.expect("Failed to delete a job").rows_affected, 1);
}
