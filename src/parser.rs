//! MIME structure parsing

use crate::attachments::resolve_inline_images;
use crate::error::Result;
use crate::types::{
    Attachment, EmailAddress, InlineImage, MessageHeaders, MessageId, ParsedEmailDocument,
    strip_angle_brackets,
};
use chrono::{DateTime, Utc};
use mailparse::body::Body;
use mailparse::{DispositionType, MailHeader, MailHeaderMap, ParsedMail};
use regex::Regex;
use tracing::{debug, warn};

static MESSAGE_ID_REGEX: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"<[^<>]*>").unwrap());

/// Leaf part of a message after classification
#[derive(Debug)]
enum MimePart {
    Text(String),
    Html(String),
    Attachment(AttachmentPart),
    InlineImage(InlineImage),
}

/// Attachment before its placeholder filename is assigned
#[derive(Debug)]
struct AttachmentPart {
    filename: Option<String>,
    content_type: String,
    content_disposition: Option<String>,
    content_id: Option<String>,
    content: Vec<u8>,
}

/// Parse a raw RFC 5322 message into its bodies, attachments and inline images
pub fn parse_mime_structure(raw: &[u8]) -> Result<ParsedEmailDocument> {
    let parsed = mailparse::parse_mail(raw)?;
    let headers = extract_headers(&parsed.headers);

    let mut parts = Vec::new();
    collect_parts(&parsed, &mut parts);

    let mut text_content: Option<String> = None;
    let mut html_content: Option<String> = None;
    let mut attachments: Vec<Attachment> = Vec::new();
    let mut inline_images: Vec<InlineImage> = Vec::new();

    for part in parts {
        match part {
            MimePart::Text(body) => {
                if text_content.is_none() {
                    text_content = Some(body);
                } else {
                    debug!("Ignoring additional text/plain body");
                }
            }
            MimePart::Html(body) => {
                if html_content.is_none() {
                    html_content = Some(body);
                } else {
                    debug!("Ignoring additional text/html body");
                }
            }
            MimePart::InlineImage(image) => inline_images.push(image),
            MimePart::Attachment(part) => {
                let filename = part
                    .filename
                    .unwrap_or_else(|| format!("attachment-{}", attachments.len() + 1));
                attachments.push(Attachment {
                    filename,
                    content_type: part.content_type,
                    content_disposition: part
                        .content_disposition
                        .unwrap_or_else(|| "attachment".to_string()),
                    content_id: part.content_id,
                    size: part.content.len(),
                    content: part.content,
                });
            }
        }
    }

    let text_content = text_content.unwrap_or_default();

    let has_multiple_alternatives = html_content
        .as_ref()
        .is_some_and(|html| !text_content.is_empty() && *html != text_content);

    let html_content = match html_content {
        Some(html) if !inline_images.is_empty() => {
            Some(resolve_inline_images(&html, &inline_images))
        }
        other => other,
    };

    debug!(
        "Parsed MIME structure: {} attachment(s), {} inline image(s), html={}",
        attachments.len(),
        inline_images.len(),
        html_content.is_some()
    );

    Ok(ParsedEmailDocument {
        headers,
        text_content,
        html_content,
        attachments,
        inline_images,
        has_multiple_alternatives,
    })
}

/// Parse only the header block of a raw message
pub fn parse_headers(raw: &[u8]) -> Result<MessageHeaders> {
    let (headers, _) = mailparse::parse_headers(raw)?;
    Ok(extract_headers(&headers))
}

fn collect_parts(part: &ParsedMail, out: &mut Vec<MimePart>) {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            collect_parts(sub, out);
        }
        return;
    }

    if part.ctype.mimetype.to_lowercase().starts_with("multipart/") {
        debug!("Skipping multipart container without children");
        return;
    }

    out.push(classify_leaf(part));
}

fn classify_leaf(part: &ParsedMail) -> MimePart {
    let content_type = part.ctype.mimetype.to_lowercase();
    let disposition = disposition_of(part);
    let filename = filename_of(part);
    let content_id = part
        .headers
        .get_first_value("Content-ID")
        .map(|v| strip_angle_brackets(v.trim()))
        .filter(|v| !v.is_empty());

    let is_attachment_disposition = disposition.as_deref() == Some("attachment");

    if filename.is_none() && !is_attachment_disposition {
        if content_type == "text/plain" {
            return MimePart::Text(decode_text(part));
        }
        if content_type == "text/html" {
            return MimePart::Html(decode_text(part));
        }
    }

    let content = decode_bytes(part);

    if disposition.as_deref() == Some("inline")
        && content_type.starts_with("image/")
        && let Some(cid) = content_id.as_ref()
    {
        debug!("Classified inline image cid:{cid} ({content_type})");
        return MimePart::InlineImage(InlineImage {
            content_id: cid.clone(),
            content_type,
            size: content.len(),
            content,
        });
    }

    debug!(
        "Classified attachment {:?} ({content_type})",
        filename.as_deref().unwrap_or("<unnamed>")
    );
    MimePart::Attachment(AttachmentPart {
        filename,
        content_type,
        content_disposition: disposition,
        content_id,
        content,
    })
}

/// Decoded body text, or the still-encoded body when the transfer encoding is broken
fn decode_text(part: &ParsedMail) -> String {
    part.get_body().unwrap_or_else(|e| {
        warn!("Keeping undecodable {} body as is: {e}", part.ctype.mimetype);
        String::from_utf8_lossy(&encoded_body(part)).into_owned()
    })
}

/// Decoded body bytes, or the still-encoded bytes when the transfer encoding is broken
fn decode_bytes(part: &ParsedMail) -> Vec<u8> {
    part.get_body_raw().unwrap_or_else(|e| {
        warn!("Keeping undecodable {} body as is: {e}", part.ctype.mimetype);
        encoded_body(part)
    })
}

fn encoded_body(part: &ParsedMail) -> Vec<u8> {
    match part.get_body_encoded() {
        Body::Base64(body) | Body::QuotedPrintable(body) => body.get_raw().to_vec(),
        Body::SevenBit(body) | Body::EightBit(body) => body.get_raw().to_vec(),
        Body::Binary(body) => body.get_raw().to_vec(),
    }
}

/// Disposition keyword, only when the part declares a `Content-Disposition` header
fn disposition_of(part: &ParsedMail) -> Option<String> {
    part.headers.get_first_value("Content-Disposition")?;

    Some(match part.get_content_disposition().disposition {
        DispositionType::Inline => "inline".to_string(),
        DispositionType::Attachment => "attachment".to_string(),
        DispositionType::FormData => "form-data".to_string(),
        DispositionType::Extension(other) => other.to_lowercase(),
    })
}

fn filename_of(part: &ParsedMail) -> Option<String> {
    let disposition = part.get_content_disposition();
    disposition
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

fn extract_headers(headers: &[MailHeader]) -> MessageHeaders {
    let all: Vec<(String, String)> = headers
        .iter()
        .map(|h| (h.get_key().to_lowercase(), h.get_value()))
        .collect();

    let first = |name: &str| -> Option<String> {
        all.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let message_id = first("message-id").map(MessageId::new);
    let subject = first("subject");
    let from = first("from").and_then(|v| parse_address_list(&v).into_iter().next());
    let to = first("to").map(|v| parse_address_list(&v)).unwrap_or_default();
    let cc = first("cc").map(|v| parse_address_list(&v)).unwrap_or_default();
    let bcc = first("bcc").map(|v| parse_address_list(&v)).unwrap_or_default();
    let date = first("date").and_then(|v| parse_date(&v));
    let in_reply_to = first("in-reply-to")
        .map(|v| parse_message_ids(&v))
        .unwrap_or_default();
    let references = first("references")
        .map(|v| parse_message_ids(&v))
        .unwrap_or_default();
    let provider_thread_id = first("x-gm-thrid").or_else(|| first("x-gmail-thread-id"));
    let importance = first("importance");

    MessageHeaders {
        all,
        message_id,
        subject,
        from,
        to,
        cc,
        bcc,
        date,
        in_reply_to,
        references,
        provider_thread_id,
        importance,
    }
}

/// Message-id tokens in order of appearance
fn parse_message_ids(value: &str) -> Vec<MessageId> {
    let bracketed: Vec<MessageId> = MESSAGE_ID_REGEX
        .find_iter(value)
        .map(|m| MessageId::new(m.as_str()))
        .collect();

    if !bracketed.is_empty() {
        return bracketed;
    }

    // Unbracketed ids still need an addr-spec; free text like "Your message of ..." is not one
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| s.contains('@'))
        .map(MessageId::new)
        .collect()
}

fn parse_address_list(value: &str) -> Vec<EmailAddress> {
    match mailparse::addrparse(value) {
        Ok(list) => list
            .iter()
            .flat_map(|addr| match addr {
                mailparse::MailAddr::Single(info) => vec![EmailAddress {
                    name: info.display_name.clone(),
                    address: info.addr.clone(),
                }],
                mailparse::MailAddr::Group(group) => group
                    .addrs
                    .iter()
                    .map(|info| EmailAddress {
                        name: info.display_name.clone(),
                        address: info.addr.clone(),
                    })
                    .collect(),
            })
            .collect(),
        Err(e) => {
            debug!("Falling back to lenient address parsing: {e}");
            value
                .split(',')
                .filter_map(|addr| EmailAddress::parse(addr.trim()))
                .collect()
        }
    }
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            mailparse::dateparse(value)
                .ok()
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
        })
}
