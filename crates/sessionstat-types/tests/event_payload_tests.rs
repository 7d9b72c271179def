use sessionstat_types::*;

#[test]
fn test_rejects_non_numeric_timestamp() {
    let err = SessionEvent::from_json(br#"{"user_id":"a","session_id":"s","timestamp":"soon"}"#)
        .unwrap_err();
    assert!(matches!(err, Error::Json(_)));
    assert!(err.to_string().starts_with("Malformed event payload"));
}

#[test]
fn test_rejects_missing_fields() {
    let result = SessionEvent::from_json(br#"{"user_id":"a","timestamp":"1"}"#);
    assert!(result.is_err());
}

#[test]
fn test_rejects_invalid_json() {
    assert!(SessionEvent::from_json(b"not json").is_err());
}

#[test]
fn test_error_exposes_source() {
    use std::error::Error as _;

    let err = SessionEvent::from_json(b"{").unwrap_err();
    assert!(err.source().is_some());
}
