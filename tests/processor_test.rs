use email_ingest::*;
use std::result::Result;

fn reply(id: u32, subject: &str) -> Vec<u8> {
    format!(
        "From: Jane Roe <jane@example.com>\r\n\
         To: john@example.com\r\n\
         Cc: Team <team@example.com>\r\n\
         Subject: {subject}\r\n\
         Date: Thu, 01 Jan 2025 12:0{id}:00 +0000\r\n\
         Message-ID: <reply-{id}@example.com>\r\n\
         References: <root@example.com>\r\n\
         \r\n\
         Answer number {id}.\r\n\
         \r\n\
         On Thu, Jan 1, 2025 at 11:00 AM John <john@example.com> wrote:\r\n\
         > Original question\r\n"
    )
    .into_bytes()
}

const WITH_ATTACHMENT: &[u8] = b"From: sender@example.com\r\n\
To: john@example.com\r\n\
Subject: Invoice\r\n\
Message-ID: <invoice@example.com>\r\n\
Importance: high\r\n\
Content-Type: multipart/mixed; boundary=\"b\"\r\n\
\r\n\
--b\r\n\
Content-Type: text/plain\r\n\
\r\n\
Invoice attached.\r\n\
--b\r\n\
Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=\"invoice.pdf\"\r\n\
\r\n\
pdf\r\n\
--b--\r\n";

/// Store that rejects one external id and accepts everything else
struct PickyStore {
    inner: InMemoryEmailStore,
    reject: &'static str,
}

impl EmailStore for PickyStore {
    fn upsert_email(&self, record: EmailRecord) -> Result<StoredEmail, StoreError> {
        if record.external_id == self.reject {
            return Err(StoreError::Rejected(format!("{} is blocked", record.external_id)));
        }
        self.inner.upsert_email(record)
    }
}

struct FixedSource(Vec<Vec<u8>>);

impl MailSource for FixedSource {
    fn fetch_raw_messages(&self) -> Result<Vec<Vec<u8>>, ProcessError> {
        Ok(self.0.clone())
    }
}

struct BrokenSource;

impl MailSource for BrokenSource {
    fn fetch_raw_messages(&self) -> Result<Vec<Vec<u8>>, ProcessError> {
        Err(ProcessError::Source("token expired".into()))
    }
}

#[test]
fn test_process_email_stores_record() {
    let store = InMemoryEmailStore::new();
    let processor = EmailProcessor::new(&store, ProcessorConfig::default());

    let result = processor.process_email(&reply(1, "Re: Plans"), "user-1", "gmail");

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.external_id, "<reply-1@example.com>");
    assert!(!result.email_id.is_empty());

    let record = store
        .get("user-1", "gmail", "<reply-1@example.com>")
        .unwrap()
        .unwrap();
    assert_eq!(record.subject, "Re: Plans");
    assert_eq!(record.from_email, "jane@example.com");
    assert_eq!(record.from_name, "Jane Roe");
    assert_eq!(record.to_emails, ["john@example.com"]);
    assert_eq!(record.cc_emails, ["team@example.com"]);
    assert_eq!(record.thread_id, "ref-root@example.com");
    assert_eq!(record.body, "Answer number 1.");
    assert_eq!(record.importance, "normal");
    assert_eq!(record.sent_at.timestamp(), 1_735_732_860);

    assert_eq!(record.metadata["threadInfo"]["method"], "reference_headers");
    assert_eq!(record.metadata["contentInfo"]["replyStyle"], "top");
    assert_eq!(record.metadata["contentInfo"]["hasQuotedContent"], true);
    assert_eq!(record.metadata["headers"]["subject"], "Re: Plans");
}

#[test]
fn test_replies_share_thread() {
    let store = InMemoryEmailStore::new();
    let processor = EmailProcessor::new(&store, ProcessorConfig::default());

    processor.process_email(&reply(1, "Re: Plans"), "user-1", "gmail");
    processor.process_email(&reply(2, "Re: Re: Plans"), "user-1", "gmail");

    let thread = store.thread("user-1", "ref-root@example.com").unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0].external_id, "<reply-1@example.com>");
    assert_eq!(thread[1].external_id, "<reply-2@example.com>");
}

#[test]
fn test_reprocessing_updates_in_place() {
    let store = InMemoryEmailStore::new();
    let processor = EmailProcessor::new(&store, ProcessorConfig::default());

    let first = processor.process_email(&reply(1, "Re: Plans"), "user-1", "gmail");
    let second = processor.process_email(&reply(1, "Re: Plans (edited)"), "user-1", "gmail");

    assert_eq!(first.email_id, second.email_id);
    assert_eq!(store.len().unwrap(), 1);
    let record = store
        .get("user-1", "gmail", "<reply-1@example.com>")
        .unwrap()
        .unwrap();
    assert_eq!(record.subject, "Re: Plans (edited)");
}

#[test]
fn test_attachments_are_externalized() {
    let store = InMemoryEmailStore::new();
    let processor = EmailProcessor::new(&store, ProcessorConfig::default());

    let result = processor.process_email(WITH_ATTACHMENT, "user-1", "outlook");
    assert!(result.success);

    let record = store
        .get("user-1", "outlook", "<invoice@example.com>")
        .unwrap()
        .unwrap();
    assert_eq!(record.importance, "high");
    assert_eq!(record.attachments.len(), 1);
    assert_eq!(record.attachments[0].filename, "invoice.pdf");
    assert_eq!(
        record.attachments[0].url,
        "https://storage.example.com/attachments/invoice@example.com/invoice.pdf"
    );
}

#[test]
fn test_store_failure_is_reported() {
    let store = PickyStore {
        inner: InMemoryEmailStore::new(),
        reject: "<invoice@example.com>",
    };
    let processor = EmailProcessor::new(store, ProcessorConfig::default());

    let result = processor.process_email(WITH_ATTACHMENT, "user-1", "gmail");

    assert!(!result.success);
    assert!(result.email_id.is_empty());
    assert!(
        result
            .error
            .unwrap()
            .starts_with("Failed to process email: Record rejected")
    );

    let err = processor
        .try_process_email(WITH_ATTACHMENT, "user-1", "gmail")
        .unwrap_err();
    assert!(matches!(err, ProcessError::Store(StoreError::Rejected(_))));
}

#[test]
fn test_batch_keeps_order_and_reports_failures() {
    let store = PickyStore {
        inner: InMemoryEmailStore::new(),
        reject: "<reply-2@example.com>",
    };
    let config = ProcessorConfig {
        concurrency: 2,
        ..ProcessorConfig::default()
    };
    let processor = EmailProcessor::new(store, config);

    let raws: Vec<Vec<u8>> = (1..=4).map(|i| reply(i, "Re: Plans")).collect();
    let results = processor.batch_process_emails(&raws, "user-1", "gmail");

    assert_eq!(results.len(), 4);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[2].success);
    assert_eq!(results[3].external_id, "<reply-4@example.com>");
    assert_eq!(processor.store().inner.len().unwrap(), 3);
}

#[test]
fn test_sync_from_source() {
    let store = InMemoryEmailStore::new();
    let processor = EmailProcessor::new(&store, ProcessorConfig::default());
    let source = FixedSource(vec![reply(1, "Re: Plans"), WITH_ATTACHMENT.to_vec()]);

    let results = processor.sync_from_source(&source, "user-1", "gmail").unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(store.len().unwrap(), 2);
}

#[test]
fn test_sync_from_broken_source() {
    let store = InMemoryEmailStore::new();
    let processor = EmailProcessor::new(&store, ProcessorConfig::default());

    let err = processor
        .sync_from_source(&BrokenSource, "user-1", "gmail")
        .unwrap_err();

    assert!(matches!(err, ProcessError::Source(_)));
    assert!(store.is_empty().unwrap());
}

#[test]
fn test_missing_message_id_gets_stable_external_id() {
    let raw = b"From: sender@example.com\r\n\
                Subject: No id\r\n\
                Date: Thu, 01 Jan 2025 12:00:00 +0000\r\n\
                \r\n\
                Body";
    let store = InMemoryEmailStore::new();
    let processor = EmailProcessor::new(&store, ProcessorConfig::default());

    let first = processor.process_email(raw, "user-1", "gmail");
    let second = processor.process_email(raw, "user-1", "gmail");

    assert!(first.external_id.starts_with("unknown-"));
    assert_eq!(first.external_id, second.external_id);
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn test_reprocessing_keeps_sent_at_without_date_header() {
    let raw = b"From: sender@example.com\r\n\
                Subject: Undated\r\n\
                Message-ID: <undated@example.com>\r\n\
                \r\n\
                Body";
    let store = InMemoryEmailStore::new();
    let processor = EmailProcessor::new(&store, ProcessorConfig::default());

    processor.process_email(raw, "user-1", "gmail");
    let first = store
        .get("user-1", "gmail", "<undated@example.com>")
        .unwrap()
        .unwrap();

    std::thread::sleep(std::time::Duration::from_millis(5));
    processor.process_email(raw, "user-1", "gmail");
    let second = store
        .get("user-1", "gmail", "<undated@example.com>")
        .unwrap()
        .unwrap();

    assert_eq!(first.sent_at, second.sent_at);
    assert_eq!(first.received_at, second.received_at);
}

#[test]
fn test_corrupt_attachment_still_stores_message() {
    let raw = b"From: sender@example.com\r\n\
                Subject: Broken\r\n\
                Message-ID: <broken@example.com>\r\n\
                Content-Type: multipart/mixed; boundary=\"b\"\r\n\
                \r\n\
                --b\r\n\
                Content-Type: text/plain\r\n\
                \r\n\
                hello\r\n\
                --b\r\n\
                Content-Type: application/pdf\r\n\
                Content-Transfer-Encoding: base64\r\n\
                Content-Disposition: attachment; filename=\"report.pdf\"\r\n\
                \r\n\
                !!!not*base64@@@\r\n\
                --b--\r\n";
    let store = InMemoryEmailStore::new();
    let processor = EmailProcessor::new(&store, ProcessorConfig::default());

    let result = processor.process_email(raw, "user-1", "gmail");

    assert!(result.success, "{:?}", result.error);
    let record = store
        .get("user-1", "gmail", "<broken@example.com>")
        .unwrap()
        .unwrap();
    assert_eq!(record.body.trim(), "hello");
    assert_eq!(record.attachments[0].filename, "report.pdf");
}
