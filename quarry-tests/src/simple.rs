use quarry::{AsValue, Dao, NO_PARAMS, PlainExecutor, Pool, Result, RowLabeled, entity};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Default, Debug, Clone, PartialEq)]
pub struct Operator {
    pub id: i64,
    pub name: String,
    pub level: Option<i32>,
}
entity!(Operator => "operator" {
    #[id] id,
    name => "operator_name",
    level,
});

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn simple<P: Pool>(dao: &Dao<PlainExecutor<P>>) {
    let _lock = MUTEX.lock().await;

    // Setup
    dao.execute("DROP TABLE IF EXISTS operator", NO_PARAMS)
        .await
        .expect("Failed to drop the operator table");
    dao.execute(
        "CREATE TABLE operator (id BIGINT PRIMARY KEY, operator_name VARCHAR NOT NULL, level INTEGER)",
        NO_PARAMS,
    )
    .await
    .expect("Failed to create the operator table");

    let operators = [
        Operator {
            id: 1,
            name: "Ada".into(),
            level: Some(3),
        },
        Operator {
            id: 2,
            name: "Grace".into(),
            level: None,
        },
        Operator {
            id: 3,
            name: "Edsger".into(),
            level: Some(1),
        },
    ];
    for operator in &operators {
        let affected = dao
            .insert(operator)
            .await
            .expect("Failed to insert an operator");
        assert_eq!(affected.rows_affected, 1);
    }

    let loaded = dao
        .query::<Operator>("SELECT * FROM operator ORDER BY id", NO_PARAMS)
        .await
        .expect("Failed to query the operators");
    assert_eq!(loaded, operators);

    let count = dao
        .query_scalar::<i64>("SELECT COUNT(*) FROM operator", NO_PARAMS)
        .await
        .expect("Failed to count the operators");
    assert_eq!(count, Some(3));

    let found = dao
        .find_by_id::<Operator>(2)
        .await
        .expect("Failed to find the operator by id");
    assert_eq!(found.as_ref(), Some(&operators[1]));
    let missing = dao
        .find_by_id::<Operator>(99)
        .await
        .expect("Failed to look for a missing operator");
    assert_eq!(missing, None);

    let first = dao
        .query_one::<Operator>(
            "SELECT * FROM operator WHERE level IS NOT NULL ORDER BY level DESC",
            NO_PARAMS,
        )
        .await
        .expect("Failed to query one operator");
    assert_eq!(first.map(|v| v.name), Some("Ada".to_string()));

    // Update every non identifier field
    let mut grace = operators[1].clone();
    grace.level = Some(5);
    grace.name = "Grace Hopper".into();
    let affected = dao.update(&grace).await.expect("Failed to update Grace");
    assert_eq!(affected.rows_affected, 1);
    let reloaded = dao
        .query_one::<Operator>("SELECT * FROM operator WHERE id = ?", [2])
        .await
        .expect("Failed to reload Grace");
    assert_eq!(reloaded, Some(grace));

    let affected = dao
        .delete(&operators[2])
        .await
        .expect("Failed to delete Edsger");
    assert_eq!(affected.rows_affected, 1);
    let affected = dao
        .delete(&operators[2])
        .await
        .expect("Failed to delete Edsger a second time");
    assert_eq!(affected.rows_affected, 0);

    let names = dao
        .query_with(
            "SELECT operator_name FROM operator WHERE level > ? ORDER BY operator_name",
            [2],
            |row: RowLabeled| -> Result<String> { String::try_from_value(row.values()[0].clone()) },
        )
        .await
        .expect("Failed to query the names");
    assert_eq!(names, ["Ada", "Grace Hopper"]);

    let affected = dao
        .execute("UPDATE operator SET level = ? WHERE level IS NULL", [0])
        .await
        .expect("Failed to run a bulk update");
    assert_eq!(affected.rows_affected, 0);
}
