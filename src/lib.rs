// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(clippy::significant_drop_tightening)]

//! Email Ingestion
//!
//! Turns raw RFC 5322 messages into structured records ready to be stored.
//!
//! # Features
//!
//! - MIME structure parsing into text, HTML, attachments and inline images
//! - `cid:` references in HTML resolved to embedded `data:` URIs
//! - Deterministic conversation threading from message headers
//! - Separation of new content from quoted replies and signatures
//! - Batch processing into a pluggable store
//!
//! # Example
//!
//! ```rust
//! use email_ingest::{identify_thread, parse_mime_structure};
//!
//! let raw = b"From: sender@example.com\r\nSubject: Re: Q1 Budget\r\n\r\nBody";
//! let document = parse_mime_structure(raw).unwrap();
//! let thread = identify_thread(&document.headers);
//!
//! println!("Text: {}", document.text_content);
//! println!("Thread: {} ({})", thread.thread_id, thread.method);
//! ```

mod attachments;
mod config;
mod content;
mod error;
mod parser;
mod processor;
mod store;
mod thread;
mod types;

pub use attachments::{prepare_attachments_for_storage, resolve_inline_images};
pub use config::{ProcessorConfig, StorageConfig};
pub use content::{
    ContentExtractionOptions, ContentExtractionResult, ReplyStyle, extract_meaningful_content,
};
pub use error::{ConfigError, ParseError, ProcessError, Result, StoreError};
pub use parser::{parse_headers, parse_mime_structure};
pub use processor::{EmailProcessingResult, EmailProcessor, MailSource};
pub use store::{EmailRecord, EmailStore, InMemoryEmailStore, StoredEmail};
pub use thread::{
    clean_subject, hash_string, identify_by_references, identify_by_subject, identify_thread,
    normalize_message_id, placeholder_message_id,
};
pub use types::*;
