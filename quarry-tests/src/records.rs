use quarry::{Dao, NO_PARAMS, PlainExecutor, Pool, Record, Value};
use std::sync::LazyLock;
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

fn shipment(code: &str, weight: f64, carrier: Option<&str>) -> Record {
    let mut record = Record::new();
    record.insert("code", Value::Varchar(Some(code.into())));
    record.insert("weight", Value::Float64(Some(weight)));
    record.insert("carrier", Value::Varchar(carrier.map(Into::into)));
    record
}

pub async fn records<P: Pool>(dao: &Dao<PlainExecutor<P>>) {
    let _lock = MUTEX.lock().await;

    // Setup
    dao.execute("DROP TABLE IF EXISTS shipment", NO_PARAMS)
        .await
        .expect("Failed to drop the shipment table");
    dao.execute(
        "CREATE TABLE shipment (code VARCHAR(16) PRIMARY KEY, weight DOUBLE NOT NULL, carrier VARCHAR)",
        NO_PARAMS,
    )
    .await
    .expect("Failed to create the shipment table");

    for record in [
        shipment("A-100", 12.5, Some("North")),
        shipment("A-101", 3.25, None),
        shipment("B-200", 40.0, Some("South")),
    ] {
        dao.insert_record("shipment", &record)
            .await
            .expect("Failed to insert a shipment");
    }

    let all = dao
        .query_records("SELECT * FROM shipment ORDER BY code", NO_PARAMS)
        .await
        .expect("Failed to query the shipments");
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].columns(), ["code", "weight", "carrier"]);
    assert_eq!(all[1]["carrier"], Value::Varchar(None));
    assert!(all[1]["carrier"].is_null());
    // Unknown columns read as null
    assert!(all[1]["destination"].is_null());

    let heavy = dao
        .query_one_record(
            "SELECT code, weight FROM shipment WHERE weight > ? ORDER BY weight DESC",
            [10.0],
        )
        .await
        .expect("Failed to query the heaviest shipment")
        .expect("Expected one shipment heavier than 10");
    assert_eq!(heavy["code"], Value::Varchar(Some("B-200".into())));
    assert_eq!(heavy.len(), 2);

    let mut updated = shipment("A-101", 3.5, Some("East"));
    let affected = dao
        .update_record("shipment", "code", &updated)
        .await
        .expect("Failed to update a shipment");
    assert_eq!(affected.rows_affected, 1);
    let reloaded = dao
        .query_one_record("SELECT * FROM shipment WHERE code = ?", ["A-101"])
        .await
        .expect("Failed to reload the shipment")
        .expect("Expected the updated shipment");
    assert_eq!(reloaded, updated);

    updated.insert("code", Value::Varchar(Some("Z-999".into())));
    let affected = dao
        .delete_record("shipment", "code", &updated)
        .await
        .expect("Failed to delete a missing shipment");
    assert_eq!(affected.rows_affected, 0);
    let affected = dao
        .delete_record("shipment", "code", &shipment("A-100", 0.0, None))
        .await
        .expect("Failed to delete a shipment");
    assert_eq!(affected.rows_affected, 1);

    let remaining = dao
        .query_scalar::<i64>("SELECT COUNT(*) FROM shipment", NO_PARAMS)
        .await
        .expect("Failed to count the shipments");
    assert_eq!(remaining, Some(2));
}
