use email_ingest::*;

// --- MessageId ---

#[test]
fn test_message_id_new() {
    let id = MessageId::new("<test@example.com>");
    assert_eq!(id.as_str(), "<test@example.com>");
}

#[test]
fn test_message_id_stripped() {
    let id = MessageId::new("<abc@example.com>");
    assert_eq!(id.stripped(), "abc@example.com");
    assert_eq!(id.to_string(), "<abc@example.com>");
}

#[test]
fn test_message_id_equality() {
    let a = MessageId::new("same@id");
    let b = MessageId::new("same@id");
    assert_eq!(a, b);
}

// --- EmailAddress ---

#[test]
fn test_email_address_parse_with_name() {
    let addr = EmailAddress::parse("John Doe <john@example.com>").unwrap();
    assert_eq!(addr.address, "john@example.com");
    assert_eq!(addr.name.as_deref(), Some("John Doe"));
}

#[test]
fn test_email_address_parse_plain() {
    let addr = EmailAddress::parse("alice@company.org").unwrap();
    assert_eq!(addr.address, "alice@company.org");
    assert!(addr.name.is_none());
}

#[test]
fn test_email_address_parse_angle_no_name() {
    let addr = EmailAddress::parse("<bob@test.io>").unwrap();
    assert_eq!(addr.address, "bob@test.io");
    assert!(addr.name.is_none());
}

#[test]
fn test_email_address_parse_quoted_name() {
    let addr = EmailAddress::parse("\"Jane Smith\" <jane@mail.com>").unwrap();
    assert_eq!(addr.name.as_deref(), Some("Jane Smith"));
    assert_eq!(addr.address, "jane@mail.com");
}

#[test]
fn test_email_address_parse_invalid() {
    assert!(EmailAddress::parse("not an address").is_none());
    assert!(EmailAddress::parse("").is_none());
}

#[test]
fn test_email_address_display() {
    let addr = EmailAddress::parse("John Doe <john@example.com>").unwrap();
    assert_eq!(addr.to_string(), "John Doe <john@example.com>");

    let plain = EmailAddress::parse("john@example.com").unwrap();
    assert_eq!(plain.to_string(), "john@example.com");
}

// --- MessageHeaders ---

#[test]
fn test_headers_get_is_case_insensitive() {
    let headers = MessageHeaders {
        all: vec![("x-custom".to_string(), "value".to_string())],
        ..MessageHeaders::default()
    };
    assert_eq!(headers.get("X-Custom"), Some("value"));
    assert_eq!(headers.get("missing"), None);
}

// --- Serialization ---

#[test]
fn test_thread_result_serializes_camel_case() {
    let result = ThreadIdentificationResult {
        thread_id: "ref-a@x".to_string(),
        related_message_ids: vec!["<a@x>".to_string()],
        confidence: 0.9,
        method: ThreadMethod::ReferenceHeaders,
    };

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["threadId"], "ref-a@x");
    assert_eq!(json["relatedMessageIds"][0], "<a@x>");
    assert_eq!(json["method"], "reference_headers");
}

#[test]
fn test_attachment_content_is_not_serialized() {
    let attachment = Attachment {
        filename: "a.txt".to_string(),
        content_type: "text/plain".to_string(),
        content_disposition: "attachment".to_string(),
        content_id: None,
        size: 2,
        content: b"hi".to_vec(),
    };

    let json = serde_json::to_value(&attachment).unwrap();
    assert!(json.get("content").is_none());
    assert_eq!(json["filename"], "a.txt");
}

#[test]
fn test_storage_target_default() {
    assert_eq!(StorageTarget::default(), StorageTarget::Local);
}
