use quarry::{Dao, NO_PARAMS, PlainExecutor, Pool, entity};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Default, Debug, Clone, PartialEq)]
struct Reading {
    sequence: i64,
    sensor: String,
    celsius: f64,
}
entity!(Reading => "reading" {
    #[id] sequence,
    sensor,
    celsius,
});

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn limits<P: Pool>(dao: &Dao<PlainExecutor<P>>) {
    let _lock = MUTEX.lock().await;

    // Setup
    dao.execute("DROP TABLE IF EXISTS reading", NO_PARAMS)
        .await
        .expect("Failed to drop the reading table");
    dao.execute(
        "CREATE TABLE reading (sequence BIGINT, sensor VARCHAR NOT NULL, celsius DOUBLE, PRIMARY KEY (sequence))",
        NO_PARAMS,
    )
    .await
    .expect("Failed to create the reading table");
    for sequence in 0..25 {
        dao.insert(&Reading {
            sequence,
            sensor: if sequence % 2 == 0 { "even" } else { "odd" }.into(),
            celsius: 18.0 + sequence as f64 / 4.0,
        })
        .await
        .expect("Failed to insert a reading");
    }

    let page = dao
        .page::<Reading>("SELECT * FROM reading ORDER BY sequence", NO_PARAMS, 10, 5)
        .await
        .expect("Failed to read the third page");
    assert_eq!(
        page.iter().map(|v| v.sequence).collect::<Vec<_>>(),
        [10, 11, 12, 13, 14]
    );

    let page = dao
        .page::<Reading>(
            "SELECT * FROM reading WHERE sensor = ? ORDER BY sequence DESC",
            ["odd"],
            0,
            3,
        )
        .await
        .expect("Failed to read the first page of odd readings");
    assert_eq!(
        page.iter().map(|v| v.sequence).collect::<Vec<_>>(),
        [23, 21, 19]
    );

    // Past the end
    let page = dao
        .page_records("SELECT * FROM reading ORDER BY sequence", NO_PARAMS, 20, 10)
        .await
        .expect("Failed to read the last page");
    assert_eq!(page.len(), 5);
    let page = dao
        .page_records("SELECT * FROM reading ORDER BY sequence", NO_PARAMS, 100, 10)
        .await
        .expect("Failed to read a page past the end");
    assert!(page.is_empty());
}
