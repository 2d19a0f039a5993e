use quarry::{AsValue, DaoError, Dao, NO_PARAMS, PlainExecutor, Pool, entity};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Default, Debug, Clone, PartialEq)]
struct Account {
    id: i64,
    owner: String,
    balance: i64,
}
entity!(Account => "account" {
    #[id] id,
    owner,
    balance,
});

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

async fn balances<P: Pool>(dao: &Dao<PlainExecutor<P>>) -> Vec<i64> {
    dao.query::<Account>("SELECT * FROM account ORDER BY id", NO_PARAMS)
        .await
        .expect("Failed to read the accounts")
        .into_iter()
        .map(|v| v.balance)
        .collect()
}

pub async fn transaction<P: Pool>(dao: &Dao<PlainExecutor<P>>) {
    let _lock = MUTEX.lock().await;

    // Setup
    dao.execute("DROP TABLE IF EXISTS account", NO_PARAMS)
        .await
        .expect("Failed to drop the account table");
    dao.execute(
        "CREATE TABLE account (id BIGINT PRIMARY KEY, owner VARCHAR NOT NULL, balance BIGINT NOT NULL)",
        NO_PARAMS,
    )
    .await
    .expect("Failed to create the account table");

    let transaction = dao.begin().await.expect("Could not begin a transaction");
    for (id, owner) in [(1, "alice"), (2, "bob")] {
        transaction
            .insert(&Account {
                id,
                owner: owner.into(),
                balance: 100,
            })
            .await
            .expect("Failed to insert an account");
    }
    let seen = transaction
        .query_scalar::<i64>("SELECT COUNT(*) FROM account", NO_PARAMS)
        .await
        .expect("Failed to count the accounts inside the transaction");
    assert_eq!(seen, Some(2));
    transaction
        .commit()
        .await
        .expect("Failed to commit the transaction");
    assert_eq!(balances(dao).await, [100, 100]);

    // Explicit rollback
    let transaction = dao.begin().await.expect("Could not begin a transaction");
    transaction
        .execute("UPDATE account SET balance = ? WHERE id = ?", [0, 1])
        .await
        .expect("Failed to empty the account");
    transaction
        .rollback()
        .await
        .expect("Failed to roll back the transaction");
    assert_eq!(balances(dao).await, [100, 100]);

    // Only one scope at a time
    let transaction = dao.begin().await.expect("Could not begin a transaction");
    let error = match dao.begin().await {
        Ok(..) => panic!("A second transaction must not begin"),
        Err(e) => e,
    };
    assert!(matches!(
        error.downcast_ref::<DaoError>(),
        Some(DaoError::TransactionState(..))
    ));
    let error = match transaction.begin().await {
        Ok(..) => panic!("Transactions cannot be nested"),
        Err(e) => e,
    };
    assert!(matches!(
        error.downcast_ref::<DaoError>(),
        Some(DaoError::TransactionState(..))
    ));
    drop(transaction);

    // A failing statement rolls back the whole scope
    let transaction = dao.begin().await.expect("Could not begin a transaction");
    transaction
        .execute("INSERT INTO account (id, owner, balance) VALUES (?, ?, ?)", [
            1_i64.as_value(),
            "alice".as_value(),
            0_i64.as_value(),
        ])
        .await
        .expect_err("Duplicate primary key");
    let error = transaction
        .execute("UPDATE account SET balance = ? WHERE id = ?", [50, 2])
        .await
        .expect_err("The transaction is already rolled back");
    assert!(matches!(
        error.downcast_ref::<DaoError>(),
        Some(DaoError::TransactionState(..))
    ));
    let error = transaction
        .commit()
        .await
        .expect_err("A rolled back transaction cannot commit");
    assert!(matches!(
        error.downcast_ref::<DaoError>(),
        Some(DaoError::TransactionState(..))
    ));

    let transaction = dao.begin().await.expect("Could not begin a transaction");
    transaction
        .execute("UPDATE account SET balance = ? WHERE id = ?", [70, 1])
        .await
        .expect("Failed to debit alice");
    transaction
        .insert(&Account {
            id: 2,
            owner: "bob again".into(),
            balance: 0,
        })
        .await
        .expect_err("Duplicate primary key");
    transaction
        .execute("UPDATE account SET balance = ? WHERE id = ?", [130, 2])
        .await
        .expect_err("The scope is over");
    drop(transaction);
    assert_eq!(balances(dao).await, [100, 100]);

    // Dropped without commit
    {
        let transaction = dao.begin().await.expect("Could not begin a transaction");
        transaction
            .delete(&Account {
                id: 1,
                ..Default::default()
            })
            .await
            .expect("Failed to delete alice");
    }
    assert_eq!(balances(dao).await, [100, 100]);
}
