//! Ingestion pipeline: parse, thread, extract, externalize, store

use crate::attachments::prepare_attachments_for_storage;
use crate::config::ProcessorConfig;
use crate::content::{ContentExtractionResult, extract_meaningful_content};
use crate::error::ProcessError;
use crate::parser::parse_mime_structure;
use crate::store::{EmailRecord, EmailStore};
use crate::thread::{identify_thread, placeholder_message_id};
use crate::types::{
    AttachmentMetadata, EmailAddress, MessageHeaders, ParsedEmailDocument,
    ThreadIdentificationResult,
};
use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

/// Outcome of processing one raw message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EmailProcessingResult {
    /// Id of the stored record, empty on failure
    pub email_id: String,
    pub success: bool,
    pub external_id: String,
    pub error: Option<String>,
}

impl EmailProcessingResult {
    fn failed(error: &ProcessError) -> Self {
        Self {
            email_id: String::new(),
            success: false,
            external_id: String::new(),
            error: Some(format!("Failed to process email: {error}")),
        }
    }
}

/// Source of raw messages, e.g. a Gmail or Outlook mailbox client
pub trait MailSource {
    fn fetch_raw_messages(&self) -> Result<Vec<Vec<u8>>, ProcessError>;
}

/// Runs raw messages through the pipeline into an [`EmailStore`]
pub struct EmailProcessor<S> {
    store: S,
    config: ProcessorConfig,
}

impl<S: EmailStore> EmailProcessor<S> {
    pub const fn new(store: S, config: ProcessorConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub const fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Process one message; failures are reported in the result
    pub fn process_email(
        &self,
        raw: &[u8],
        user_id: &str,
        provider_id: &str,
    ) -> EmailProcessingResult {
        match self.try_process_email(raw, user_id, provider_id) {
            Ok(result) => result,
            Err(e) => {
                warn!("Email processing failed: {e}");
                EmailProcessingResult::failed(&e)
            }
        }
    }

    /// Process one message, propagating the first error
    pub fn try_process_email(
        &self,
        raw: &[u8],
        user_id: &str,
        provider_id: &str,
    ) -> Result<EmailProcessingResult, ProcessError> {
        let document = parse_mime_structure(raw)?;
        let thread = identify_thread(&document.headers);

        let content = extract_meaningful_content(
            &document.text_content,
            document.html_content.as_deref(),
            self.config.extraction,
        );

        let external_id = document
            .headers
            .message_id
            .as_ref()
            .map_or_else(|| placeholder_message_id(&document.headers), |id| id.0.clone());

        let ParsedEmailDocument {
            headers,
            attachments,
            ..
        } = document;

        let attachments =
            prepare_attachments_for_storage(attachments, &external_id, &self.config.storage);

        let record = build_record(RecordParts {
            user_id,
            provider_id,
            external_id,
            headers: &headers,
            content: &content,
            thread: &thread,
            attachments,
        });

        debug!(
            "Storing {} in thread {} ({})",
            record.external_id, record.thread_id, thread.method
        );
        let stored = self.store.upsert_email(record)?;

        Ok(EmailProcessingResult {
            email_id: stored.id.to_string(),
            success: true,
            external_id: stored.external_id,
            error: None,
        })
    }

    /// Process many messages in parallel, `config.concurrency` at a time.
    ///
    /// Results are in input order, one per message.
    pub fn batch_process_emails<R>(
        &self,
        raws: &[R],
        user_id: &str,
        provider_id: &str,
    ) -> Vec<EmailProcessingResult>
    where
        R: AsRef<[u8]> + Sync,
    {
        let process = |raw: &R| self.process_email(raw.as_ref(), user_id, provider_id);

        let results: Vec<EmailProcessingResult> = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency.max(1))
            .build()
        {
            Ok(pool) => pool.install(|| raws.par_iter().map(process).collect()),
            Err(e) => {
                warn!("Failed to start worker pool, processing sequentially: {e}");
                raws.iter().map(process).collect()
            }
        };

        let failed = results.iter().filter(|r| !r.success).count();
        info!(
            "Processed batch of {} message(s), {failed} failed",
            results.len()
        );
        results
    }

    /// Fetch everything a source offers and process it as one batch
    pub fn sync_from_source(
        &self,
        source: &dyn MailSource,
        user_id: &str,
        provider_id: &str,
    ) -> Result<Vec<EmailProcessingResult>, ProcessError> {
        let raws = source.fetch_raw_messages()?;
        info!("Fetched {} raw message(s) for {user_id}", raws.len());
        Ok(self.batch_process_emails(&raws, user_id, provider_id))
    }
}

struct RecordParts<'a> {
    user_id: &'a str,
    provider_id: &'a str,
    external_id: String,
    headers: &'a MessageHeaders,
    content: &'a ContentExtractionResult,
    thread: &'a ThreadIdentificationResult,
    attachments: Vec<AttachmentMetadata>,
}

fn build_record(parts: RecordParts<'_>) -> EmailRecord {
    let RecordParts {
        user_id,
        provider_id,
        external_id,
        headers,
        content,
        thread,
        attachments,
    } = parts;

    let now = Utc::now();
    let addresses = |list: &[EmailAddress]| -> Vec<String> {
        list.iter().map(|a| a.address.clone()).collect()
    };

    let header_map: serde_json::Map<String, serde_json::Value> = headers
        .all
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect();

    let metadata = json!({
        "headers": header_map,
        "threadInfo": {
            "confidence": thread.confidence,
            "method": thread.method,
            "relatedMessageIds": thread.related_message_ids,
        },
        "contentInfo": {
            "replyStyle": content.reply_style,
            "hasQuotedContent": content.quoted_content.is_some(),
            "hasSignature": content.signature.is_some(),
            "hasDisclaimer": content.disclaimer.is_some(),
        },
        "extractedParts": {
            "quotedContent": content.quoted_content,
            "signature": content.signature,
            "disclaimer": content.disclaimer,
        },
    });

    EmailRecord {
        user_id: user_id.to_string(),
        provider_id: provider_id.to_string(),
        external_id,
        subject: headers.subject.clone().unwrap_or_default(),
        from_email: headers
            .from
            .as_ref()
            .map(|a| a.address.clone())
            .unwrap_or_default(),
        from_name: headers
            .from
            .as_ref()
            .and_then(|a| a.name.clone())
            .unwrap_or_default(),
        to_emails: addresses(&headers.to),
        cc_emails: addresses(&headers.cc),
        bcc_emails: addresses(&headers.bcc),
        sent_at: headers.date.unwrap_or(now),
        received_at: now,
        body: content.text_content.clone(),
        html_body: content.html_content.clone(),
        thread_id: thread.thread_id.clone(),
        importance: headers
            .importance
            .clone()
            .unwrap_or_else(|| "normal".to_string()),
        attachments,
        metadata,
    }
}
