//! Display format and classification of `AppError`.

use assessment_runtime::AppError;

#[test]
fn every_variant_has_its_own_prefix() {
    let cases = [
        (AppError::Config("x".into()), "config: x"),
        (AppError::Db("x".into()), "db: x"),
        (AppError::Serialization("x".into()), "serialization: x"),
        (AppError::QuotaExceeded("x".into()), "quota exceeded: x"),
        (AppError::Bootstrap("x".into()), "bootstrap: x"),
        (AppError::NotReady("x".into()), "not ready: x"),
        (AppError::Busy("x".into()), "busy: x"),
        (AppError::SessionCompleted("x".into()), "session completed: x"),
        (AppError::InvalidAnswer("x".into()), "invalid answer: x"),
        (AppError::NotFound("x".into()), "not found: x"),
        (AppError::Export("x".into()), "export: x"),
        (AppError::Io("x".into()), "io: x"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn quota_exceeded_is_distinguishable() {
    assert!(AppError::QuotaExceeded("full".into()).is_quota_exceeded());
    assert!(!AppError::Db("full".into()).is_quota_exceeded());
}

#[test]
fn json_errors_map_to_serialization() {
    let err: AppError = serde_json::from_str::<serde_json::Value>("{not json")
        .expect_err("invalid json")
        .into();
    assert!(matches!(err, AppError::Serialization(_)));
}

#[test]
fn io_errors_map_to_io() {
    let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert_eq!(err.to_string(), "io: gone");
}
