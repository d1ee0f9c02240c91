//! Turn a fetched story and its page into an [`UploadRecord`].

use crate::models::{RawStory, UploadRecord};
use crate::scrapers::{extract_description, extract_preview_image};

/// Build the upload record for `story`.
///
/// `page` is the linked page body, or `None` when the story has no `url` or
/// the page could not be used. Missing inputs simply leave the matching
/// output field unset; this never fails.
pub fn format_story(source: &str, story: &RawStory, page: Option<&str>) -> UploadRecord {
    let mut record = UploadRecord {
        source: source.to_string(),
        title: story.title.clone(),
        url: story.url.clone(),
        og_image_url: None,
        description: None,
    };

    if let Some(body) = page {
        record.og_image_url = extract_preview_image(body);
        let description = extract_description(body);
        if !description.is_empty() {
            record.description = Some(description);
        }
    }

    record
}
