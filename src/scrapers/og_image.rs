//! Open Graph preview image extraction.

use once_cell::sync::Lazy;
use regex::Regex;

/// `property="og:image" content="..."` where the value may contain doubled
/// quotes but no lone ones.
static OG_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"property="og:image" content="(?:[^"]|"")*""#).unwrap());

const CONTENT_ATTR: &str = "content=";

/// Return the `content` of the first `og:image` property in `html`.
///
/// Every double quote is removed from the value, including the doubled ones
/// the pattern lets through. Only the `property` then `content` attribute
/// order is recognized.
pub fn extract_preview_image(html: &str) -> Option<String> {
    let tag = OG_IMAGE.find(html)?.as_str();
    let value = tag
        .find(CONTENT_ATTR)
        .map(|idx| &tag[idx + CONTENT_ATTR.len()..])?;
    Some(value.replace('"', ""))
}
