//! Data models for feed items and the records we upload.
//!
//! - [`RawStory`]: a feed item as returned by the item endpoint
//! - [`UploadRecord`]: the enriched record sent to the ingestion endpoint
//! - [`UploadAck`]: the response body that marks an upload as accepted
//!
//! Raw stories and upload records only live for a single cycle.

use crate::error::{MinerError, Result};
use serde::{Deserialize, Serialize};

/// Identifier of a feed entry. Unique within one top-stories snapshot.
pub type StoryId = u64;

/// A feed item as returned by the item endpoint.
///
/// Only `title` and `url` matter to the pipeline; the rest is kept for
/// logging. Fields the feed adds later are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStory {
    pub id: Option<StoryId>,
    pub title: Option<String>,
    /// Linked page. Missing for text posts such as "Ask HN".
    pub url: Option<String>,
    pub by: Option<String>,
    pub score: Option<i64>,
    pub time: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// The record uploaded for each story.
///
/// Absent fields are omitted from the JSON rather than sent as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Source tag from configuration. Always set.
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl UploadRecord {
    /// Whether the record carries everything the ingestion endpoint needs.
    pub fn is_uploadable(&self) -> bool {
        !self.source.is_empty() && self.title.is_some() && self.url.is_some()
    }
}

/// Body returned by the ingestion endpoint when it accepts a batch.
///
/// Only the presence of `message` matters; its value may be any JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadAck {
    pub message: serde_json::Value,
}

impl UploadAck {
    /// The message as display text: strings unquoted, anything else as JSON.
    pub fn message_text(&self) -> String {
        match &self.message {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Ids in the top-stories list arrive as numbers or as numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListedId {
    Number(StoryId),
    Text(String),
}

/// Parse a top-stories body into ids, keeping feed order.
pub fn parse_story_ids(body: &str) -> Result<Vec<StoryId>> {
    let listed: Vec<ListedId> =
        serde_json::from_str(body).map_err(|e| MinerError::decode("top stories list", e))?;
    listed
        .into_iter()
        .map(|id| match id {
            ListedId::Number(n) => Ok(n),
            ListedId::Text(s) => s.trim().parse::<StoryId>().map_err(|_| {
                let e = <serde_json::Error as serde::de::Error>::custom(format!(
                    "non-numeric id {s:?}"
                ));
                MinerError::decode("top stories list", e)
            }),
        })
        .collect()
}

/// Parse an item body into a [`RawStory`].
pub fn parse_story(id: StoryId, body: &str) -> Result<RawStory> {
    serde_json::from_str(body).map_err(|e| MinerError::decode(format!("item {id}"), e))
}
