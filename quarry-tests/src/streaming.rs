use quarry::{
    DaoError, Dao, NO_PARAMS, PlainExecutor, Pool, RowLabeled, Value, entity,
    stream::{StreamExt, TryStreamExt},
};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Default, Debug, Clone, PartialEq)]
struct LogLine {
    id: i64,
    message: String,
}
entity!(LogLine => "log_line" {
    #[id] id,
    message,
});

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn streaming<P: Pool>(dao: &Dao<PlainExecutor<P>>) {
    let _lock = MUTEX.lock().await;

    // Setup
    dao.execute("DROP TABLE IF EXISTS log_line", NO_PARAMS)
        .await
        .expect("Failed to drop the log_line table");
    dao.execute(
        "CREATE TABLE log_line (id BIGINT PRIMARY KEY, message TEXT NOT NULL)",
        NO_PARAMS,
    )
    .await
    .expect("Failed to create the log_line table");
    for id in 1..=50 {
        dao.insert(&LogLine {
            id,
            message: format!("line {id}"),
        })
        .await
        .expect("Failed to insert a log line");
    }

    let streamed = dao.streamed();

    let lines = streamed
        .query::<LogLine>("SELECT * FROM log_line WHERE id > ? ORDER BY id", [40])
        .try_collect::<Vec<_>>()
        .await
        .expect("Failed to stream the log lines");
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0].message, "line 41");

    // Rows are pulled one at a time
    let mut stream = streamed.query::<LogLine>("SELECT * FROM log_line ORDER BY id", NO_PARAMS);
    let first = stream
        .try_next()
        .await
        .expect("Failed to pull the first line")
        .expect("Expected at least one line");
    assert_eq!(first.id, 1);
    let next = stream
        .by_ref()
        .take(3)
        .map_ok(|v| v.id)
        .try_collect::<Vec<_>>()
        .await
        .expect("Failed to pull three more lines");
    assert_eq!(next, [2, 3, 4]);
    stream.close();
    assert!(stream.next().await.is_none());

    // Exhausted streams stay exhausted
    let mut stream = streamed.query_records("SELECT * FROM log_line WHERE id = ?", [7]);
    assert!(stream.next().await.is_some());
    assert!(stream.next().await.is_none());
    assert!(stream.next().await.is_none());

    let ids = streamed
        .query_with(
            "SELECT id FROM log_line ORDER BY id DESC",
            NO_PARAMS,
            |row: RowLabeled| -> quarry::Result<Value> { Ok(row.values()[0].clone()) },
        )
        .take(2)
        .try_collect::<Vec<_>>()
        .await
        .expect("Failed to stream the ids");
    assert_eq!(ids, [Value::Int64(Some(50)), Value::Int64(Some(49))]);

    let page = streamed
        .page::<LogLine>("SELECT * FROM log_line ORDER BY id", NO_PARAMS, 45, 100)
        .try_collect::<Vec<_>>()
        .await
        .expect("Failed to stream the last page");
    assert_eq!(page.len(), 5);

    // Failures surface on the first pull
    let mut stream = streamed.query::<LogLine>("SELECT * FROM log_line WHERE id = ? AND id = ?", [1]);
    let error = stream
        .next()
        .await
        .expect("Expected the failure as first item")
        .expect_err("A missing parameter must fail");
    assert!(matches!(
        error.downcast_ref::<DaoError>(),
        Some(DaoError::ParameterCount { .. })
    ));
    assert!(stream.next().await.is_none());

    let error = streamed
        .query_records("SELECT * FROM missing_log_table", NO_PARAMS)
        .try_collect::<Vec<_>>()
        .await
        .expect_err("Streaming an unknown table must fail");
    assert!(matches!(
        error.downcast_ref::<DaoError>(),
        Some(DaoError::Execution(..))
    ));
}
