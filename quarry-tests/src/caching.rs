use quarry::{AsValue, Cache, Dao, MemoryCache, NO_PARAMS, PlainExecutor, Pool, WritePolicy, entity};
use std::sync::{Arc, LazyLock};
use tokio::sync::Mutex;

#[derive(Default, Debug, Clone, PartialEq)]
struct Currency {
    code: String,
    rate: f64,
}
entity!(Currency => "currency" {
    #[id] code,
    rate,
});

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn caching<P: Pool>(dao: &Dao<PlainExecutor<P>>) {
    let _lock = MUTEX.lock().await;

    // Setup
    dao.execute("DROP TABLE IF EXISTS currency", NO_PARAMS)
        .await
        .expect("Failed to drop the currency table");
    dao.execute(
        "CREATE TABLE currency (code CHAR(3) PRIMARY KEY, rate DOUBLE NOT NULL)",
        NO_PARAMS,
    )
    .await
    .expect("Failed to create the currency table");
    for (code, rate) in [("EUR", 1.0), ("USD", 1.08), ("JPY", 161.2)] {
        dao.insert(&Currency {
            code: code.into(),
            rate,
        })
        .await
        .expect("Failed to insert a currency");
    }

    let cache = Arc::new(MemoryCache::new());
    let cached = dao.cached_with(cache.clone(), WritePolicy::Table);
    let query = "SELECT * FROM currency WHERE rate > ? ORDER BY code";

    let first = cached
        .query::<Currency>(query, [1.05])
        .await
        .expect("Failed to query the currencies");
    assert_eq!(first.len(), 2);
    assert_eq!(cache.len(), 1);

    // Served from the cache, the change made behind its back is not visible
    dao.execute(
        "UPDATE currency SET rate = ? WHERE code = ?",
        [0.5_f64.as_value(), "USD".as_value()],
    )
        .await
        .expect("Failed to update the rate behind the cache");
    let second = cached
        .query::<Currency>(query, [1.05])
        .await
        .expect("Failed to query the cached currencies");
    assert_eq!(second, first);

    // Fetch one over a cached result
    let one = cached
        .query_one::<Currency>(query, [1.05])
        .await
        .expect("Failed to query one cached currency");
    assert_eq!(one.as_ref(), first.first());

    // Different parameters are a different entry
    let other = cached
        .query::<Currency>(query, [100.0])
        .await
        .expect("Failed to query with other parameters");
    assert_eq!(other.len(), 1);
    assert_eq!(cache.len(), 2);

    // A write through the cached facade drops the reads of its table
    cached
        .update(&Currency {
            code: "JPY".into(),
            rate: 160.9,
        })
        .await
        .expect("Failed to update through the cache");
    assert!(cache.is_empty());
    let third = cached
        .query::<Currency>(query, [1.05])
        .await
        .expect("Failed to query the currencies again");
    assert_eq!(
        third,
        [Currency {
            code: "JPY".into(),
            rate: 160.9
        }]
    );

    // The uncached facade always reaches the database
    let fresh = dao
        .query_scalar::<f64>("SELECT rate FROM currency WHERE code = ?", ["USD"])
        .await
        .expect("Failed to read the USD rate");
    assert_eq!(fresh, Some(0.5));

    cache.clear();
    assert!(cache.is_empty());
}
