//! Conversation thread identification
//!
//! Methods are tried from most to least reliable and the first one that is
//! confident enough wins:
//!
//! 1. provider thread id header (`X-GM-THRID`)
//! 2. `References` / `In-Reply-To` chain
//! 3. normalized subject
//! 4. the message's own id
//!
//! Thread ids only depend on header values so re-ingesting a message always
//! lands it in the same thread.

use crate::types::{MessageHeaders, MessageId, ThreadIdentificationResult, ThreadMethod};
use regex::Regex;
use tracing::debug;

/// Reference results above this confidence are accepted
const REFERENCE_THRESHOLD: f32 = 0.7;

/// Subject results above this confidence are accepted
const SUBJECT_THRESHOLD: f32 = 0.5;

static REPLY_PREFIX_REGEX: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"(?i)^(re|fwd|fw|aw|antw|vs|sv)(\[\d+\])?:\s*").unwrap()
});

static LIST_TAG_REGEX: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"\[[A-Za-z0-9_\s-]+\]\s*").unwrap());

/// Assign a thread to a message. Never fails.
#[must_use]
pub fn identify_thread(headers: &MessageHeaders) -> ThreadIdentificationResult {
    if let Some(thread_id) = headers.provider_thread_id.as_deref() {
        debug!("Thread from provider thread id {thread_id}");
        return ThreadIdentificationResult {
            thread_id: format!("gmail-{thread_id}"),
            related_message_ids: own_id(headers),
            confidence: 1.0,
            method: ThreadMethod::GmailThreadId,
        };
    }

    let by_references = identify_by_references(headers);
    if by_references.confidence > REFERENCE_THRESHOLD {
        debug!("Thread from reference headers: {}", by_references.thread_id);
        return by_references;
    }

    let by_subject = identify_by_subject(headers);
    if by_subject.confidence > SUBJECT_THRESHOLD {
        debug!("Thread from subject: {}", by_subject.thread_id);
        return by_subject;
    }

    let message_id = headers
        .message_id
        .as_ref()
        .map_or_else(|| placeholder_message_id(headers), |id| id.0.clone());

    debug!("No thread signal, falling back to message id {message_id}");
    ThreadIdentificationResult {
        thread_id: format!("msg-{}", normalize_message_id(&message_id)),
        related_message_ids: own_id(headers),
        confidence: 1.0,
        method: ThreadMethod::MessageIdFallback,
    }
}

/// Group by the union of `References` and `In-Reply-To`.
///
/// The first referenced id is the oldest ancestor and names the thread.
#[must_use]
pub fn identify_by_references(headers: &MessageHeaders) -> ThreadIdentificationResult {
    let mut chain: Vec<String> = Vec::new();
    for id in headers.references.iter().chain(&headers.in_reply_to) {
        if !chain.iter().any(|seen| seen == id.as_str()) {
            chain.push(id.0.clone());
        }
    }

    let Some(oldest) = chain.first() else {
        return ThreadIdentificationResult {
            thread_id: format!("msg-{}", normalize_message_id(own_id_str(headers))),
            related_message_ids: own_id(headers),
            confidence: 0.5,
            method: ThreadMethod::SingleMessage,
        };
    };

    let thread_id = format!("ref-{}", normalize_message_id(oldest));
    chain.extend(own_id(headers));

    ThreadIdentificationResult {
        thread_id,
        related_message_ids: chain,
        confidence: 0.9,
        method: ThreadMethod::ReferenceHeaders,
    }
}

/// Group by subject with reply prefixes and list tags removed
#[must_use]
pub fn identify_by_subject(headers: &MessageHeaders) -> ThreadIdentificationResult {
    let cleaned = clean_subject(headers.subject.as_deref().unwrap_or_default());

    if cleaned.is_empty() {
        return ThreadIdentificationResult {
            thread_id: format!("msg-{}", normalize_message_id(own_id_str(headers))),
            related_message_ids: own_id(headers),
            confidence: 0.3,
            method: ThreadMethod::Fallback,
        };
    }

    ThreadIdentificationResult {
        thread_id: format!("subj-{}", hash_string(&cleaned)),
        related_message_ids: own_id(headers),
        confidence: 0.6,
        method: ThreadMethod::SubjectMatch,
    }
}

/// Strip one leading `Re:`/`Fwd:`-style prefix and every `[list-tag]`
#[must_use]
pub fn clean_subject(subject: &str) -> String {
    if subject.is_empty() {
        return String::new();
    }

    let without_prefix = REPLY_PREFIX_REGEX.replace(subject, "");
    let without_tags = LIST_TAG_REGEX.replace_all(&without_prefix, "");
    without_tags.trim().to_string()
}

/// Strip angle brackets; ids longer than 32 characters are replaced by their hash
#[must_use]
pub fn normalize_message_id(message_id: &str) -> String {
    let cleaned = MessageId::new(message_id).stripped();

    if cleaned.encode_utf16().count() > 32 {
        return hash_string(&cleaned);
    }

    cleaned
}

/// 31-multiplier rolling hash over UTF-16 code units with signed 32-bit
/// wraparound, rendered as the lowercase hex of its absolute value.
///
/// Stored thread ids depend on this exact output.
#[must_use]
pub fn hash_string(s: &str) -> String {
    let hash = s.encode_utf16().fold(0_i32, |hash, unit| {
        hash.wrapping_mul(31).wrapping_add(i32::from(unit))
    });
    format!("{:x}", hash.unsigned_abs())
}

/// Stable stand-in for a missing `Message-ID`, derived from the other headers
#[must_use]
pub fn placeholder_message_id(headers: &MessageHeaders) -> String {
    let joined = headers
        .all
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("unknown-{}", hash_string(&joined))
}

fn own_id_str(headers: &MessageHeaders) -> &str {
    headers.message_id.as_ref().map_or("", MessageId::as_str)
}

fn own_id(headers: &MessageHeaders) -> Vec<String> {
    headers
        .message_id
        .iter()
        .map(|id| id.0.clone())
        .collect()
}
