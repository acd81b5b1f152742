//! Separation of new content from quoted replies, signatures and disclaimers

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which extra parts to keep in a [`ContentExtractionResult`]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContentExtractionOptions {
    pub include_quoted_content: bool,
    pub include_signature: bool,
    pub include_disclaimer: bool,
}

impl ContentExtractionOptions {
    /// Keep everything
    #[must_use]
    pub const fn all() -> Self {
        Self {
            include_quoted_content: true,
            include_signature: true,
            include_disclaimer: true,
        }
    }
}

/// Where the author wrote relative to the quoted message
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStyle {
    Top,
    Bottom,
    Inline,
    #[default]
    Unknown,
}

/// New content of a message with the separated parts
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentExtractionResult {
    pub text_content: String,
    pub html_content: Option<String>,
    pub quoted_content: Option<String>,
    pub quoted_html_content: Option<String>,
    pub signature: Option<String>,
    pub disclaimer: Option<String>,
    pub reply_style: ReplyStyle,
}

static SIGNATURE_MARKERS: std::sync::LazyLock<Vec<Regex>> = std::sync::LazyLock::new(|| {
    [
        r"(?m)^--\s*$",
        r"(?m)^-+\s*$",
        r"(?m)^_+\s*$",
        r"(?im)^(?:regards|sincerely|cheers|best|thanks|thank you)[,.]?\s+[-a-z0-9\s.]+$",
        r"(?im)^sent from my (?:iphone|ipad|android|mobile device|phone)$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static DISCLAIMER_MARKERS: std::sync::LazyLock<Vec<Regex>> = std::sync::LazyLock::new(|| {
    [
        r"(?i)CONFIDENTIALITY NOTICE[:\s]",
        r"(?i)DISCLAIMER[:\s]",
        r"(?i)LEGAL NOTICE[:\s]",
        r"(?i)This (?:e-?mail|message) (?:and any attachments )?(?:is|are) confidential",
        r"(?i)This message contains confidential information",
        r"(?i)Privileged\s*/\s*Confidential Information",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static QUOTE_MARKERS: std::sync::LazyLock<Vec<Regex>> = std::sync::LazyLock::new(|| {
    [
        r"(?m)^>+\s.+$",
        r"(?m)^On .+ wrote:$",
        r"(?m)^-{3,}Original Message-{3,}$",
        r"(?m)^From:.*Sent:.*To:.*Subject:.*$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static HEADER_LINE_REGEX: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"(?im)^(From|Sent|To|Subject|Date|Cc):").unwrap());

static HTML_QUOTE_PATTERNS: std::sync::LazyLock<Vec<Regex>> = std::sync::LazyLock::new(|| {
    [
        r"(?i)<blockquote[^>]*>([\s\S]*?)</blockquote>",
        r#"(?i)<div class=['"]gmail_quote['"][^>]*>([\s\S]*?)</div>"#,
        r#"(?i)<div class=['"]ms-outlook-quote['"][^>]*>([\s\S]*?)</div>"#,
        r#"(?i)<div class=['"]yahoo_quoted['"][^>]*>([\s\S]*?)</div>"#,
        r#"(?i)<div style=['"]border:none;border-top:solid #[a-zA-Z0-9]{6} 1.0pt[^>]*>([\s\S]*?)(</div>){1,2}"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static HTML_SIGNATURE_PATTERNS: std::sync::LazyLock<Vec<Regex>> =
    std::sync::LazyLock::new(|| {
        [
            r#"(?i)<div class=['"]signature['"][^>]*>([\s\S]*?)</div>"#,
            r#"(?i)<div id=['"]signature['"][^>]*>([\s\S]*?)</div>"#,
            r"(?i)--<br>[\s\S]*$",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    });

static HTML_DISCLAIMER_PATTERNS: std::sync::LazyLock<Vec<Regex>> =
    std::sync::LazyLock::new(|| {
        [
            r#"(?i)<div class=['"]disclaimer['"][^>]*>([\s\S]*?)</div>"#,
            r#"(?i)<div id=['"]disclaimer['"][^>]*>([\s\S]*?)</div>"#,
            r#"(?i)<div class=['"]confidentiality['"][^>]*>([\s\S]*?)</div>"#,
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
    });

struct TextParts {
    new_content: String,
    quoted_content: String,
    signature: Option<String>,
    disclaimer: Option<String>,
    reply_style: ReplyStyle,
}

#[derive(Default)]
struct HtmlParts {
    new_content: Option<String>,
    quoted_content: Option<String>,
    signature: Option<String>,
    disclaimer: Option<String>,
}

/// Split a message body into what the sender actually wrote and the
/// quoted, signature and disclaimer parts around it
#[must_use]
pub fn extract_meaningful_content(
    text: &str,
    html: Option<&str>,
    options: ContentExtractionOptions,
) -> ContentExtractionResult {
    let text_parts = extract_from_text(text);
    let html_parts = html.map(extract_from_html).unwrap_or_default();

    let mut result = ContentExtractionResult {
        text_content: text_parts.new_content,
        html_content: html_parts.new_content,
        reply_style: text_parts.reply_style,
        ..ContentExtractionResult::default()
    };

    if options.include_quoted_content {
        result.quoted_content =
            (!text_parts.quoted_content.is_empty()).then_some(text_parts.quoted_content);
        result.quoted_html_content = html_parts.quoted_content;
    }

    if options.include_signature {
        result.signature = text_parts.signature.or(html_parts.signature);
    }

    if options.include_disclaimer {
        result.disclaimer = text_parts.disclaimer.or(html_parts.disclaimer);
    }

    result
}

fn extract_from_text(text: &str) -> TextParts {
    if text.is_empty() {
        return TextParts {
            new_content: String::new(),
            quoted_content: String::new(),
            signature: None,
            disclaimer: None,
            reply_style: ReplyStyle::Unknown,
        };
    }

    let text = text.replace("\r\n", "\n");
    let (without_signature, signature) = split_signature(&text);
    let (without_disclaimer, disclaimer) = split_disclaimer(&without_signature);
    let (new_content, quoted_content, reply_style) = separate_quoted(&without_disclaimer);

    TextParts {
        new_content,
        quoted_content,
        signature,
        disclaimer,
        reply_style,
    }
}

/// Everything from the first signature marker on, unless the marker opens the text
fn split_signature(text: &str) -> (String, Option<String>) {
    for marker in SIGNATURE_MARKERS.iter() {
        if let Some(m) = marker.find(text)
            && m.start() > 0
        {
            return (
                text[..m.start()].trim().to_string(),
                Some(text[m.start()..].trim().to_string()),
            );
        }
    }

    (text.to_string(), None)
}

fn split_disclaimer(text: &str) -> (String, Option<String>) {
    for marker in DISCLAIMER_MARKERS.iter() {
        if let Some(m) = marker.find(text) {
            return (
                text[..m.start()].trim().to_string(),
                Some(text[m.start()..].trim().to_string()),
            );
        }
    }

    (text.to_string(), None)
}

fn separate_quoted(text: &str) -> (String, String, ReplyStyle) {
    if text.is_empty() {
        return (String::new(), String::new(), ReplyStyle::Unknown);
    }

    let first_quote = QUOTE_MARKERS
        .iter()
        .filter_map(|marker| marker.find(text).map(|m| m.start()))
        .min();

    if let Some(index) = first_quote {
        return (
            text[..index].trim().to_string(),
            text[index..].trim().to_string(),
            ReplyStyle::Top,
        );
    }

    if is_likely_bottom_posted(text) {
        let (original, new_content) = split_bottom_posted(text);
        return (new_content, original, ReplyStyle::Bottom);
    }

    (text.to_string(), String::new(), ReplyStyle::Unknown)
}

fn is_likely_bottom_posted(text: &str) -> bool {
    let header_lines = HEADER_LINE_REGEX.find_iter(text).count();
    let head = text.split('\n').take(10).collect::<Vec<_>>().join("\n");

    header_lines >= 3 && head.contains("From:") && head.contains("To:")
}

/// Returns (original, new) split at the widest blank gap below line 10,
/// or at the line midpoint when no convincing gap exists
fn split_bottom_posted(text: &str) -> (String, String) {
    let lines: Vec<&str> = text.split('\n').collect();

    let mut gap_index: Option<usize> = None;
    let mut max_gap = 0;
    let mut current_gap = 0;

    for (i, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            current_gap += 1;
        } else {
            if current_gap > max_gap && i > 10 {
                max_gap = current_gap;
                gap_index = Some(i - current_gap);
            }
            current_gap = 0;
        }
    }

    if max_gap > 2
        && let Some(gap) = gap_index.filter(|g| *g > 0)
    {
        let original = lines[..gap].join("\n").trim().to_string();
        let new_content = lines[gap + max_gap..].join("\n").trim().to_string();
        if new_content.chars().count() > 20 {
            return (original, new_content);
        }
    }

    let midpoint = lines.len() / 2;
    (
        lines[..midpoint].join("\n").trim().to_string(),
        lines[midpoint..].join("\n").trim().to_string(),
    )
}

fn extract_from_html(html: &str) -> HtmlParts {
    if html.is_empty() {
        return HtmlParts::default();
    }

    let mut new_content = html.to_string();
    let mut quoted: Vec<String> = Vec::new();

    for pattern in HTML_QUOTE_PATTERNS.iter() {
        let matches: Vec<&str> = pattern.find_iter(html).map(|m| m.as_str()).collect();
        if !matches.is_empty() {
            quoted.extend(matches.into_iter().map(str::to_string));
            new_content = pattern.replace_all(&new_content, "").into_owned();
        }
    }

    let signature = take_first_block(&HTML_SIGNATURE_PATTERNS, &mut new_content);
    let disclaimer = take_first_block(&HTML_DISCLAIMER_PATTERNS, &mut new_content);

    let quoted_content = quoted.join("\n");

    HtmlParts {
        new_content: (!new_content.trim().is_empty()).then_some(new_content),
        quoted_content: (!quoted_content.trim().is_empty()).then_some(quoted_content),
        signature,
        disclaimer,
    }
}

/// Remove the blocks of the first pattern that matches, returning its first match
fn take_first_block(patterns: &[Regex], content: &mut String) -> Option<String> {
    for pattern in patterns {
        if let Some(m) = pattern.find(content.as_str()) {
            let block = m.as_str().to_string();
            *content = pattern.replace_all(content.as_str(), "").into_owned();
            return Some(block);
        }
    }
    None
}
