//! Inline image resolution and attachment externalization

use crate::config::StorageConfig;
use crate::types::{Attachment, AttachmentMetadata, InlineImage, strip_angle_brackets};
use regex::{NoExpand, RegexBuilder};
use tracing::{debug, warn};

/// Replace every `cid:<content-id>` reference with the image's `data:` URI.
///
/// Matching is case-insensitive on the literal reference. References with no
/// matching image are left as they are.
#[must_use]
pub fn resolve_inline_images(html: &str, images: &[InlineImage]) -> String {
    let mut resolved = html.to_string();

    for image in images {
        let pattern = format!("cid:{}", regex::escape(&image.content_id));
        let cid_regex = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(re) => re,
            Err(e) => {
                warn!("Skipping inline image cid:{}: {e}", image.content_id);
                continue;
            }
        };

        if !cid_regex.is_match(&resolved) {
            continue;
        }

        let data_uri = image.data_uri();
        resolved = cid_regex
            .replace_all(&resolved, NoExpand(&data_uri))
            .into_owned();
        debug!("Resolved cid:{} into data URI", image.content_id);
    }

    resolved
}

/// Hand attachments over to storage: drop their content and attach a retrieval URL.
///
/// One metadata entry per attachment, in the original order.
#[must_use]
pub fn prepare_attachments_for_storage(
    attachments: Vec<Attachment>,
    message_id: &str,
    storage: &StorageConfig,
) -> Vec<AttachmentMetadata> {
    let message_key = strip_angle_brackets(message_id);
    let base = storage.base_url.trim_end_matches('/');

    attachments
        .into_iter()
        .map(|attachment| AttachmentMetadata {
            url: format!("{base}/{message_key}/{}", attachment.filename),
            filename: attachment.filename,
            content_type: attachment.content_type,
            content_disposition: attachment.content_disposition,
            content_id: attachment.content_id,
            size: attachment.size,
            storage: storage.target,
        })
        .collect()
}
