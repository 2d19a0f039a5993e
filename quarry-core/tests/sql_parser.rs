#[cfg(test)]
mod tests {
    use quarry_core::{
        DaoError, Entity, Mode, Record, RoutingSqlParser, SqlOperation, SqlParser, Value, entity,
        select_by_identifier,
    };

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Person {
        id: Option<i64>,
        name: Option<String>,
        age: Option<i32>,
    }
    entity!(Person => "person" {
        #[id] id,
        name,
        age,
    });

    #[derive(Default, Debug, Clone)]
    struct Event {
        kind: String,
        payload: Option<String>,
    }
    entity!(Event => "event_log" {
        kind => "event_kind",
        payload,
    });

    fn james() -> Person {
        Person {
            id: Some(7),
            name: Some("James".into()),
            age: None,
        }
    }

    #[test]
    fn descriptor() {
        let descriptor = Person::descriptor();
        assert_eq!(descriptor.table(), "person");
        assert_eq!(descriptor.identifier().unwrap().column(), "id");
        assert!(std::ptr::eq(descriptor, Person::descriptor()));
        assert_eq!(
            Event::descriptor()
                .field_by_column("EVENT_KIND")
                .unwrap()
                .name(),
            "kind"
        );
    }

    #[test]
    fn insert_skips_nulls() {
        let statement = RoutingSqlParser::entity(&james(), SqlOperation::Insert)
            .parse()
            .unwrap();
        assert_eq!(statement.sql(), "INSERT INTO person (id, name) VALUES (?, ?)");
        assert_eq!(
            statement.parameters(),
            &[Value::Int64(Some(7)), Value::Varchar(Some("James".into()))]
        );
        assert_eq!(statement.mode(), Mode::Updatable);
        assert!(statement.check_parameters().is_ok());
    }

    #[test]
    fn insert_nothing() {
        let error = RoutingSqlParser::entity(&Person::default(), SqlOperation::Insert)
            .parse()
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<DaoError>(),
            Some(DaoError::InvalidStatement(..))
        ));
    }

    #[test]
    fn update_identifier_last() {
        let statement = RoutingSqlParser::entity(&james(), SqlOperation::Update)
            .parse()
            .unwrap();
        assert_eq!(
            statement.sql(),
            "UPDATE person SET name = ?, age = ? WHERE id = ?"
        );
        assert_eq!(
            statement.parameters(),
            &[
                Value::Varchar(Some("James".into())),
                Value::Int32(None),
                Value::Int64(Some(7)),
            ]
        );
    }

    #[test]
    fn delete() {
        let statement = RoutingSqlParser::entity(&james(), SqlOperation::Delete)
            .parse()
            .unwrap();
        assert_eq!(statement.sql(), "DELETE FROM person WHERE id = ?");
        assert_eq!(statement.parameters(), &[Value::Int64(Some(7))]);
    }

    #[test]
    fn missing_identifier() {
        let event = Event {
            kind: "login".into(),
            payload: None,
        };
        let statement = RoutingSqlParser::entity(&event, SqlOperation::Insert)
            .parse()
            .unwrap();
        assert_eq!(statement.sql(), "INSERT INTO event_log (event_kind) VALUES (?)");

        for operation in [SqlOperation::Update, SqlOperation::Delete] {
            let error = RoutingSqlParser::entity(&event, operation)
                .parse()
                .unwrap_err();
            assert!(matches!(
                error.downcast_ref::<DaoError>(),
                Some(DaoError::MissingIdentifier(..))
            ));
        }

        let person = Person {
            id: None,
            ..james()
        };
        let error = RoutingSqlParser::entity(&person, SqlOperation::Update)
            .parse()
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<DaoError>(),
            Some(DaoError::MissingIdentifier(..))
        ));
    }

    #[test]
    fn records() {
        let mut record = Record::new();
        record.insert("ID", Value::Int64(Some(3)));
        record.insert("Title", Value::Varchar(Some("Dune".into())));
        record.insert("year", Value::Int32(None));

        let statement = RoutingSqlParser::record("book", Some("id"), &record, SqlOperation::Insert)
            .parse()
            .unwrap();
        assert_eq!(statement.sql(), "INSERT INTO book (id, title) VALUES (?, ?)");

        let statement = RoutingSqlParser::record("book", Some("ID"), &record, SqlOperation::Update)
            .parse()
            .unwrap();
        assert_eq!(
            statement.sql(),
            "UPDATE book SET title = ?, year = ? WHERE id = ?"
        );
        assert_eq!(statement.parameters().last(), Some(&Value::Int64(Some(3))));

        let error = RoutingSqlParser::record("book", None, &record, SqlOperation::Delete)
            .parse()
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<DaoError>(),
            Some(DaoError::MissingIdentifier(..))
        ));
    }

    #[test]
    fn select_by_id() {
        let statement = select_by_identifier::<Person>(7i64.into()).unwrap();
        assert_eq!(
            statement.sql(),
            "SELECT id, name, age FROM person WHERE id = ?"
        );
        assert!(statement.is_read_only());
        assert!(select_by_identifier::<Event>(Value::Null).is_err());
    }
}
