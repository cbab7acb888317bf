use anyquery_error::{ErrorCode, ErrorContext, QueryError};
use serde_json::Value;

#[test]
fn test_json_serialization() {
    let error = QueryError::new(ErrorCode::TransportFailed, "Request failed")
        .with_context(ErrorContext::Transport {
            endpoint: "GET http://example.com/articles".to_string(),
            status: Some(500),
            body: "oops".to_string(),
        })
        .with_hint("Check the remote service");

    let json = error.to_json();
    let v: Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(v["code"], "AQ-1002");
    assert_eq!(v["message"], "Request failed");
    assert_eq!(v["hint"], "Check the remote service");
    assert_eq!(v["context"]["type"], "transport");
    assert_eq!(v["context"]["status"], 500);
}

#[test]
fn test_json_deserialization_roundtrip() {
    let error = QueryError::resolution("[\"user\", \"email\"]", "{}", "not a record");
    let back: QueryError = serde_json::from_str(&error.to_json()).expect("valid json");
    assert_eq!(back.code, ErrorCode::ResolutionFailed);
    assert_eq!(back.message, error.message);
}

#[test]
fn test_error_code_parsing() {
    let code: ErrorCode = "AQ-2003".to_string().try_into().unwrap();
    assert_eq!(code, ErrorCode::UnsupportedStrategy);
}
