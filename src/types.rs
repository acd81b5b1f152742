//! Core types for parsed messages and thread assignments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message ID as it appears in a header, angle brackets included
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id with every `<` and `>` removed
    #[must_use]
    pub fn stripped(&self) -> String {
        strip_angle_brackets(&self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) fn strip_angle_brackets(s: &str) -> String {
    s.chars().filter(|c| *c != '<' && *c != '>').collect()
}

/// Email address with optional display name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,

    /// Email address (e.g., "john@example.com")
    pub address: String,
}

impl EmailAddress {
    /// Parse a single address in `Name <local@domain>` or bare form
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        if let Some(start) = s.find('<')
            && let Some(end) = s.rfind('>')
            && start < end
        {
            let name_part = s[..start].trim().trim_matches('"');
            let address = s[start + 1..end].trim().to_string();

            if address.contains('@') {
                return Some(Self {
                    name: (!name_part.is_empty()).then(|| name_part.to_string()),
                    address,
                });
            }
        }

        s.contains('@').then(|| Self {
            name: None,
            address: s.to_string(),
        })
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", name, self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

/// Typed view over the headers of one message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageHeaders {
    /// All headers as (lowercased key, decoded value), in message order
    pub all: Vec<(String, String)>,

    pub message_id: Option<MessageId>,

    pub subject: Option<String>,

    pub from: Option<EmailAddress>,

    pub to: Vec<EmailAddress>,

    pub cc: Vec<EmailAddress>,

    pub bcc: Vec<EmailAddress>,

    /// Parsed `Date` header; `None` when absent or unparseable
    pub date: Option<DateTime<Utc>>,

    /// Message IDs listed in `In-Reply-To`
    pub in_reply_to: Vec<MessageId>,

    /// Message IDs listed in `References`, oldest first
    pub references: Vec<MessageId>,

    /// Provider-native thread id (`X-GM-THRID` / `X-Gmail-Thread-Id`)
    pub provider_thread_id: Option<String>,

    pub importance: Option<String>,
}

impl MessageHeaders {
    /// First value for a header, by case-insensitive name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.all
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Structured result of parsing one raw message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedEmailDocument {
    pub headers: MessageHeaders,

    /// Plain text body; empty when the message has none
    pub text_content: String,

    /// HTML body with `cid:` references resolved
    pub html_content: Option<String>,

    pub attachments: Vec<Attachment>,

    pub inline_images: Vec<InlineImage>,

    /// Both bodies exist and differ
    pub has_multiple_alternatives: bool,
}

/// A non-inline MIME part
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    /// Declared filename, or `attachment-N` when the part has none
    pub filename: String,
    pub content_type: String,
    pub content_disposition: String,
    pub content_id: Option<String>,
    pub size: usize,
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// An inline image referenced from HTML through `cid:`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InlineImage {
    pub content_id: String,
    pub content_type: String,
    pub size: usize,
    #[serde(skip)]
    pub content: Vec<u8>,
}

impl InlineImage {
    /// Self-contained `data:` URI for this image
    #[must_use]
    pub fn data_uri(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.content);
        format!("data:{};base64,{encoded}", self.content_type)
    }
}

/// Where externalized attachments are written
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageTarget {
    #[default]
    Local,
    Cloud,
}

/// Attachment description handed to the storage writer, content stripped
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMetadata {
    pub filename: String,
    pub content_type: String,
    pub content_disposition: String,
    pub content_id: Option<String>,
    pub size: usize,
    pub url: String,
    pub storage: StorageTarget,
}

/// Method that produced a thread assignment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ThreadMethod {
    GmailThreadId,
    ReferenceHeaders,
    SubjectMatch,
    SingleMessage,
    MessageIdFallback,
    Fallback,
}

impl ThreadMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GmailThreadId => "gmail_thread_id",
            Self::ReferenceHeaders => "reference_headers",
            Self::SubjectMatch => "subject_match",
            Self::SingleMessage => "single_message",
            Self::MessageIdFallback => "message_id_fallback",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ThreadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thread assignment for one message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ThreadIdentificationResult {
    pub thread_id: String,

    /// Message IDs believed to share the thread
    pub related_message_ids: Vec<String>,

    /// Certainty of the grouping, 0.0 to 1.0
    pub confidence: f32,

    pub method: ThreadMethod,
}
