use quarry::{DaoError, Dao, Mode, NO_PARAMS, PlainExecutor, Pool, Statement, entity};

#[derive(Default, Debug)]
struct Note {
    text: String,
}
entity!(Note => "note" { text });

#[derive(Default, Debug)]
struct Tag {
    id: Option<i64>,
    label: String,
}
entity!(Tag => "tag" {
    #[id] id,
    label,
});

pub async fn errors<P: Pool>(dao: &Dao<PlainExecutor<P>>) {
    let error = dao
        .query_records("SELECT * FROM tag WHERE id = ? AND label = ?", [1])
        .await
        .expect_err("Two placeholders with one value must fail");
    assert_eq!(
        error.downcast_ref::<DaoError>(),
        Some(&DaoError::ParameterCount {
            expected: 2,
            actual: 1
        })
    );

    let error = dao
        .execute("DELETE FROM note", [1, 2])
        .await
        .expect_err("Parameters without placeholders must fail");
    assert!(matches!(
        error.downcast_ref::<DaoError>(),
        Some(DaoError::ParameterCount { expected: 0, .. })
    ));

    let error = dao
        .update(&Note { text: "hi".into() })
        .await
        .expect_err("Updating an entity without identifier must fail");
    assert_eq!(
        error.downcast_ref::<DaoError>(),
        Some(&DaoError::MissingIdentifier(std::any::type_name::<Note>().into()))
    );
    let error = dao
        .delete(&Tag {
            id: None,
            label: "orphan".into(),
        })
        .await
        .expect_err("Deleting an entity with a null identifier must fail");
    assert!(matches!(
        error.downcast_ref::<DaoError>(),
        Some(DaoError::MissingIdentifier(..))
    ));

    let error = Statement::simple("   ", Mode::ReadOnly)
        .expect_err("An empty statement must be rejected");
    assert!(matches!(
        error.downcast_ref::<DaoError>(),
        Some(DaoError::InvalidStatement(..))
    ));

    // Reported by the database
    let error = dao
        .query_records("SELECT * FROM table_that_does_not_exist", NO_PARAMS)
        .await
        .expect_err("Selecting from an unknown table must fail");
    assert!(matches!(
        error.downcast_ref::<DaoError>(),
        Some(DaoError::Execution(..))
    ));
}
