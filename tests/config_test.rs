use email_ingest::*;

#[test]
fn test_default_config() {
    let config = ProcessorConfig::default();

    assert_eq!(config.concurrency, 5);
    assert_eq!(config.storage.target, StorageTarget::Local);
    assert_eq!(config.extraction, ContentExtractionOptions::all());
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_json_keeps_defaults() {
    let config = ProcessorConfig::from_json(r#"{"storage": {"target": "cloud"}}"#).unwrap();

    assert_eq!(config.storage.target, StorageTarget::Cloud);
    assert_eq!(
        config.storage.base_url,
        "https://storage.example.com/attachments"
    );
    assert_eq!(config.concurrency, 5);
}

#[test]
fn test_full_json() {
    let json = r#"{
        "storage": {"target": "local", "base_url": "http://localhost:9000/mail"},
        "concurrency": 2,
        "extraction": {"include_quoted_content": true}
    }"#;

    let config = ProcessorConfig::from_json(json).unwrap();

    assert_eq!(config.concurrency, 2);
    assert_eq!(config.storage.base_url, "http://localhost:9000/mail");
    assert!(config.extraction.include_quoted_content);
    assert!(!config.extraction.include_signature);
}

#[test]
fn test_zero_concurrency_is_rejected() {
    let err = ProcessorConfig::from_json(r#"{"concurrency": 0}"#).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_malformed_json_is_rejected() {
    let err = ProcessorConfig::from_json("{not json").unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}
