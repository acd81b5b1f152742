//! Persistence boundary for processed messages

use crate::error::StoreError;
use crate::types::AttachmentMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// One processed message ready to be persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    pub user_id: String,
    pub provider_id: String,

    /// Message-ID of the message, or a stable placeholder
    pub external_id: String,

    pub subject: String,
    pub from_email: String,
    pub from_name: String,
    pub to_emails: Vec<String>,
    pub cc_emails: Vec<String>,
    pub bcc_emails: Vec<String>,
    pub sent_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub body: String,
    pub html_body: Option<String>,
    pub thread_id: String,
    pub importance: String,
    pub attachments: Vec<AttachmentMetadata>,
    pub metadata: serde_json::Value,
}

/// Identity of a persisted record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEmail {
    pub id: Uuid,
    pub external_id: String,
}

/// Storage for processed messages, keyed by (user, provider, external id)
pub trait EmailStore: Send + Sync {
    /// Insert the record, or update the existing one with the same key
    fn upsert_email(&self, record: EmailRecord) -> Result<StoredEmail, StoreError>;
}

impl<T: EmailStore + ?Sized> EmailStore for &T {
    fn upsert_email(&self, record: EmailRecord) -> Result<StoredEmail, StoreError> {
        (**self).upsert_email(record)
    }
}

type RecordKey = (String, String, String);

/// In-memory [`EmailStore`], mainly for tests
#[derive(Debug, Default)]
pub struct InMemoryEmailStore {
    records: RwLock<HashMap<RecordKey, (Uuid, EmailRecord)>>,
}

impl InMemoryEmailStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        user_id: &str,
        provider_id: &str,
        external_id: &str,
    ) -> Result<Option<EmailRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let key = (
            user_id.to_string(),
            provider_id.to_string(),
            external_id.to_string(),
        );
        Ok(records.get(&key).map(|(_, record)| record.clone()))
    }

    /// Records of one user in a thread, oldest first
    pub fn thread(&self, user_id: &str, thread_id: &str) -> Result<Vec<EmailRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut found: Vec<EmailRecord> = records
            .values()
            .filter(|(_, r)| r.user_id == user_id && r.thread_id == thread_id)
            .map(|(_, r)| r.clone())
            .collect();
        found.sort_by_key(|r| r.sent_at);
        Ok(found)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        self.records
            .read()
            .map(|records| records.len())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl EmailStore for InMemoryEmailStore {
    fn upsert_email(&self, mut record: EmailRecord) -> Result<StoredEmail, StoreError> {
        if record.external_id.is_empty() {
            return Err(StoreError::Rejected("empty external id".into()));
        }

        let mut records = self
            .records
            .write()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let key = (
            record.user_id.clone(),
            record.provider_id.clone(),
            record.external_id.clone(),
        );

        let id = match records.get(&key) {
            Some((id, existing)) => {
                record.sent_at = existing.sent_at;
                record.received_at = existing.received_at;
                *id
            }
            None => Uuid::new_v4(),
        };

        let external_id = record.external_id.clone();
        records.insert(key, (id, record));

        Ok(StoredEmail { id, external_id })
    }
}
