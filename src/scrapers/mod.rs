//! Best-effort preview scraping over raw page markup.
//!
//! Both extractors are plain regex scans; there is no HTML parser behind
//! them. Malformed or truncated markup is fine, and a page that yields
//! nothing is a normal outcome, not an error.
//!
//! | Field | Module | Pattern |
//! |-------|--------|---------|
//! | `og_image_url` | [`og_image`] | `property="og:image" content="..."` |
//! | `description` | [`description`] | up to five ASCII-only `<p>` blocks |

pub mod description;
pub mod og_image;

pub use description::extract_description;
pub use og_image::extract_preview_image;
