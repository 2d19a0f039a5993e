#[cfg(test)]
mod tests {
    use quarry_core::{
        Affected, AsValue, EntityMapper, FetchMany, FetchOne, QueryResult, Record, RecordMapper, Result,
        ResultSetParser, RowLabeled, RowMapper, RowsAffected, ScalarMapper, StatementHandler,
        Value, entity,
        stream::{self, StreamExt},
    };
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Person {
        id: i64,
        name: Option<String>,
        age: Option<i32>,
    }
    entity!(Person => "person" {
        #[id] id,
        name => "full_name",
        age,
    });

    fn row(id: i64, name: &str) -> RowLabeled {
        RowLabeled::new(
            ["ID".to_string(), "Full_Name".into(), "nickname".into()].into(),
            [
                Value::Int64(Some(id)),
                Value::Varchar(Some(name.into())),
                Value::Varchar(Some("x".into())),
            ]
            .into(),
        )
    }

    fn results(n: i64) -> Vec<Result<QueryResult>> {
        (1..=n).map(|i| Ok(row(i, &format!("p{i}")).into())).collect()
    }

    #[test]
    fn entity_mapper() {
        let person = EntityMapper::<Person>::new().map_row(row(1, "Ada")).unwrap();
        assert_eq!(
            person,
            Person {
                id: 1,
                name: Some("Ada".into()),
                age: None,
            }
        );

        let bad = RowLabeled::new(
            ["id".to_string()].into(),
            [Value::Varchar(Some("one".into()))].into(),
        );
        assert!(EntityMapper::<Person>::new().map_row(bad).is_err());
    }

    #[test]
    fn record_mapper() {
        let record: Record = RecordMapper.map_row(row(2, "Bob")).unwrap();
        assert_eq!(record.columns(), &["id", "full_name", "nickname"]);
        assert_eq!(record["FULL_NAME"], Value::Varchar(Some("Bob".into())));
        assert!(record["missing"].is_null());
    }

    #[test]
    fn scalar_mapper() {
        let id: i64 = ScalarMapper::new().map_row(row(5, "Eve")).unwrap();
        assert_eq!(id, 5);
        let empty = RowLabeled::new(Vec::<String>::new().into(), Vec::<Value>::new().into());
        assert!(ScalarMapper::<i64>::new().map_row(empty).is_err());
    }

    #[tokio::test]
    async fn row_cap() {
        let parser = ResultSetParser::with_max_rows(RecordMapper, 2);
        let rows = parser.parse_many(stream::iter(results(5))).await.unwrap();
        assert_eq!(rows.len(), 2);

        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let source = stream::iter(results(10)).inspect(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let first = FetchOne::new(EntityMapper::<Person>::new())
            .handle(source.boxed())
            .await
            .unwrap();
        assert_eq!(first.map(|v| v.id), Some(1));
        assert_eq!(pulled.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn handlers() {
        let many = FetchMany::new(ResultSetParser::new(|row: RowLabeled| -> Result<i64> {
            AsValue::try_from_value(row.values[0].clone())
        }))
        .handle(stream::iter(results(3)).boxed())
        .await
        .unwrap();
        assert_eq!(many, [1, 2, 3]);

        let affected = Affected
            .handle(
                stream::iter([
                    Ok(QueryResult::Affected(RowsAffected {
                        rows_affected: 2,
                        last_affected_id: None,
                    })),
                    Ok(QueryResult::Affected(RowsAffected {
                        rows_affected: 1,
                        last_affected_id: Some(9),
                    })),
                ])
                .boxed(),
            )
            .await
            .unwrap();
        assert_eq!(affected.rows_affected, 3);
        assert_eq!(affected.last_affected_id, Some(9));

        let none = FetchOne::new(RecordMapper)
            .handle(stream::iter(results(0)).boxed())
            .await
            .unwrap();
        assert!(none.is_none());
    }
}
