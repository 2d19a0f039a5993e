#[cfg(test)]
mod tests {
    use indoc::indoc;
    use quarry_core::{
        DaoError, Mode, Pagination, Statement, StatementKind, Value, count_placeholders,
        mentions_table, truncate_long, written_table,
    };

    #[test]
    fn construction() {
        let statement =
            Statement::prepared("SELECT * FROM person WHERE id = ?", [7i64], Mode::ReadOnly)
                .unwrap();
        assert_eq!(statement.kind(), StatementKind::Prepared);
        assert_eq!(statement.parameters(), &[Value::Int64(Some(7))]);
        assert!(statement.is_read_only());
        assert_eq!(statement.pagination(), None);

        let statement = Statement::simple("DROP TABLE person", Mode::Updatable).unwrap();
        assert_eq!(statement.kind(), StatementKind::Simple);
        assert!(statement.parameters().is_empty());
        assert!(!statement.is_read_only());

        let statement = statement.paginated(20, 10);
        assert_eq!(
            statement.pagination(),
            Some(Pagination {
                offset: 20,
                limit: 10
            })
        );
    }

    #[test]
    fn empty_text() {
        for sql in ["", "   ", "\n\t"] {
            let error = Statement::simple(sql, Mode::ReadOnly).unwrap_err();
            assert!(matches!(
                error.downcast_ref::<DaoError>(),
                Some(DaoError::InvalidStatement(..))
            ));
        }
        assert!(Statement::prepared("", [1], Mode::ReadOnly).is_err());
    }

    #[test]
    fn parameter_count() {
        let statement = Statement::prepared(
            "SELECT * FROM person WHERE id = ? AND name = ?",
            [1],
            Mode::ReadOnly,
        )
        .unwrap();
        let error = statement.check_parameters().unwrap_err();
        assert_eq!(
            error.downcast_ref::<DaoError>(),
            Some(&DaoError::ParameterCount {
                expected: 2,
                actual: 1
            })
        );

        let statement = Statement::prepared(
            "SELECT * FROM person WHERE id = ?",
            [Value::Int64(Some(1)), Value::Null],
            Mode::ReadOnly,
        )
        .unwrap();
        assert!(statement.check_parameters().is_err());

        let statement = Statement::prepared(
            "UPDATE person SET name = ? WHERE id = ?",
            [Value::Varchar(Some("A".into())), Value::Int64(Some(1))],
            Mode::Updatable,
        )
        .unwrap();
        assert!(statement.check_parameters().is_ok());
    }

    #[test]
    fn kind_follows_the_values() {
        let statement = Statement::new("SELECT 1", [0; 0], Mode::ReadOnly).unwrap();
        assert_eq!(statement.kind(), StatementKind::Simple);
        let statement =
            Statement::new("SELECT * FROM person WHERE id = ?", [1], Mode::ReadOnly).unwrap();
        assert_eq!(statement.kind(), StatementKind::Prepared);
        assert_eq!(statement.parameters(), &[Value::Int32(Some(1))]);
        assert!(Statement::new(" ", [0; 0], Mode::ReadOnly).is_err());
    }

    #[test]
    fn simple_text_is_not_scanned() {
        let statement = Statement::simple(
            "SELECT * FROM person WHERE name = ? OR nick = ?",
            Mode::ReadOnly,
        )
        .unwrap();
        assert!(statement.check_parameters().is_ok());
        let statement =
            Statement::new("SELECT 'who?' FROM person", [0; 0], Mode::ReadOnly).unwrap();
        assert_eq!(statement.kind(), StatementKind::Simple);
        assert!(statement.check_parameters().is_ok());
    }

    #[test]
    fn placeholders() {
        assert_eq!(count_placeholders("SELECT 1"), 0);
        assert_eq!(count_placeholders("SELECT ?, ?"), 2);
        assert_eq!(count_placeholders("SELECT '?' , ?"), 1);
        assert_eq!(count_placeholders("SELECT 'it''s ?', ?"), 1);
        assert_eq!(count_placeholders(r#"SELECT "a?b" FROM t WHERE c = ?"#), 1);
        assert_eq!(
            count_placeholders(indoc! {"
                SELECT * -- what?
                FROM t /* really? */
                WHERE a = ? AND b = ?
            "}),
            2
        );
    }

    #[test]
    fn tables() {
        assert_eq!(
            written_table("INSERT INTO Person (id) VALUES (?)").as_deref(),
            Some("person")
        );
        assert_eq!(
            written_table("insert into person(id) values (?)").as_deref(),
            Some("person")
        );
        assert_eq!(
            written_table("UPDATE `person` SET a = ?").as_deref(),
            Some("person")
        );
        assert_eq!(
            written_table("DELETE FROM person WHERE id = ?").as_deref(),
            Some("person")
        );
        assert_eq!(written_table("SELECT * FROM person"), None);

        assert!(mentions_table("SELECT * FROM PERSON WHERE id = ?", "person"));
        assert!(!mentions_table("SELECT * FROM person_archive", "person"));
    }

    #[test]
    fn display() {
        let statement = Statement::prepared(
            "SELECT * FROM person WHERE name = ? AND age = ?",
            [Value::Varchar(Some("James".into())), Value::Int32(None)],
            Mode::ReadOnly,
        )
        .unwrap();
        assert_eq!(
            statement.to_string(),
            "SELECT * FROM person WHERE name = ? AND age = ? ['James', NULL]"
        );
        let long = "x".repeat(1000);
        assert_eq!(truncate_long!(long).chars().count(), 500);
    }
}
