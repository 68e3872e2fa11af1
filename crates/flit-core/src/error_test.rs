use super::*;

fn guard_error(message: &str) -> FlitError {
    FlitError::Guard {
        message: message.to_string(),
    }
}

#[test]
fn test_kinds() {
    let apply = FlitError::Apply {
        name: "001-first.sql".to_string(),
        source: DbError::ExecutionError("boom".to_string()),
    };
    assert_eq!(apply.kind(), ErrorKind::Apply);

    let read = FlitError::Read {
        name: "001-first.sql".to_string(),
        message: "permission denied".to_string(),
    };
    assert_eq!(read.kind(), ErrorKind::Discovery);

    let duplicate = FlitError::DuplicateRecord {
        name: "001-first.sql".to_string(),
        fingerprint: "abc".to_string(),
    };
    assert_eq!(duplicate.kind(), ErrorKind::State);

    assert_eq!(
        FlitError::Connection(DbError::Cancelled).kind(),
        ErrorKind::Connection
    );
}

#[test]
fn test_apply_message_names_migration() {
    let err = FlitError::Apply {
        name: "003-broken.sql".to_string(),
        source: DbError::ExecutionError("syntax error".to_string()),
    };
    let msg = err.to_string();
    assert!(msg.contains("apply 003-broken.sql"), "{msg}");
    assert!(msg.contains("syntax error"), "{msg}");
}

#[test]
fn test_join_keeps_both_errors() {
    let joined = FlitError::join(Err(guard_error("body")), Err(guard_error("unlock")))
        .unwrap_err();

    let messages: Vec<String> = joined.errors().map(|e| e.to_string()).collect();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("body"));
    assert!(messages[1].contains("unlock"));
    assert_eq!(joined.to_string(), messages.join("\n"));
}

#[test]
fn test_join_single_error_is_not_wrapped() {
    let err = FlitError::join(Ok(()), Err(guard_error("unlock"))).unwrap_err();
    assert!(matches!(err, FlitError::Guard { .. }));

    let err = FlitError::join(Err(guard_error("body")), Ok(())).unwrap_err();
    assert!(matches!(err, FlitError::Guard { .. }));

    assert!(FlitError::join(Ok(()), Ok(())).is_ok());
}

#[test]
fn test_joined_kind_follows_first_error() {
    let joined = FlitError::Joined(vec![
        FlitError::Apply {
            name: "001-first.sql".to_string(),
            source: DbError::Cancelled,
        },
        guard_error("unlock"),
    ]);
    assert_eq!(joined.kind(), ErrorKind::Apply);
}

#[test]
fn test_migrate_error_display_is_inner_error() {
    let err = MigrateError::new(vec!["001-first.sql".to_string()], guard_error("busy"));
    assert_eq!(err.to_string(), err.error.to_string());
    assert_eq!(err.kind(), ErrorKind::Guard);
    assert_eq!(err.applied, vec!["001-first.sql"]);
}
