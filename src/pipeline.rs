//! One polling cycle: fetch, enrich, dedupe, upload.
//!
//! A cycle walks these stages in order:
//!
//! 1. **Fetch list**: GET the top-stories ids
//! 2. **Filter**: drop ids already in the [`Ledger`], cap at the batch size
//! 3. **Fetch items**: GET every candidate's item record, all at once
//! 4. **Fetch pages**: GET each story's linked page, all at once
//! 5. **Format**: build an [`UploadRecord`] per story
//! 6. **Upload**: POST the complete records as one JSON array
//! 7. **Persist**: add the candidate ids to the ledger
//!
//! Failing to fetch the list is the only error that reaches the
//! [`RetryGovernor`]. Any later failure aborts the remaining stages but still
//! persists the candidates, so a story that broke once is never retried.

use crate::config::Config;
use crate::error::{MinerError, Result};
use crate::format::format_story;
use crate::http::{HttpClient, HttpResponse};
use crate::ledger::Ledger;
use crate::models::{parse_story, parse_story_ids, RawStory, StoryId, UploadAck, UploadRecord};
use crate::retry::{RetryGovernor, RetryVerdict};
use crate::utils::truncate_for_log;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, error, info, instrument, warn};

/// Stages after the list fetch that can abort a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Filter,
    FetchItems,
    FetchPages,
    Upload,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Filter => "filter",
            Stage::FetchItems => "fetch_items",
            Stage::FetchPages => "fetch_pages",
            Stage::Upload => "upload",
        };
        f.write_str(name)
    }
}

/// How the upload step ended.
#[derive(Debug)]
pub enum UploadStatus {
    /// The endpoint acknowledged the batch with a `message`.
    Accepted { message: String },
    /// The POST went through but the response had no `message`.
    Rejected { body: String },
    /// Nothing was formatted this cycle, so nothing was sent.
    Skipped,
    /// A stage failed before or during the upload.
    Aborted { stage: Stage, error: MinerError },
}

/// Summary of a cycle that got past the list fetch.
#[derive(Debug)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    /// Ids selected by the filter stage, in feed order.
    pub candidates: Vec<StoryId>,
    pub formatted: usize,
    /// Records in the POSTed batch.
    pub posted: usize,
    pub upload: UploadStatus,
    /// Ledger size after persisting, or `None` if the write failed.
    pub ledger_size: Option<usize>,
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// The list fetch failed; the next tick will try again.
    ListUnavailable { remaining: u32 },
    /// The list fetch failed and the retry budget is spent.
    Exhausted,
    Finished(CycleReport),
}

struct Processed {
    formatted: usize,
    posted: usize,
    upload: UploadStatus,
}

type StageResult<T> = std::result::Result<T, (Stage, MinerError)>;

fn at(stage: Stage) -> impl Fn(MinerError) -> (Stage, MinerError) {
    move |e| (stage, e)
}

/// Owns everything a cycle touches: the client, the ledger and the retry
/// budget. Cycles take `&mut self`, so two can never run at once.
#[derive(Debug)]
pub struct Pipeline<C> {
    client: C,
    config: Config,
    ledger: Ledger,
    governor: RetryGovernor,
}

impl<C: HttpClient> Pipeline<C> {
    pub fn new(client: C, config: Config) -> Self {
        let ledger = Ledger::new(config.ledger_path());
        let governor = RetryGovernor::new(config.request.retries);
        Self {
            client,
            config,
            ledger,
            governor,
        }
    }

    #[cfg(test)]
    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn governor(&self) -> &RetryGovernor {
        &self.governor
    }

    /// Run a single cycle to completion.
    ///
    /// Fetches the top-stories list, then filters, fetches, formats and
    /// uploads the new stories, and finally records every candidate in the
    /// ledger.
    ///
    /// # Returns
    ///
    /// * [`CycleOutcome::ListUnavailable`] - the list fetch failed, retries remain
    /// * [`CycleOutcome::Exhausted`] - the list fetch failed and the budget is spent
    /// * [`CycleOutcome::Finished`] - the list was fetched; the report says how
    ///   far the later stages got
    ///
    /// Failures after the list fetch never surface as errors. They end up in
    /// [`CycleReport::upload`] as [`UploadStatus::Aborted`].
    #[instrument(level = "info", skip_all)]
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let started_at = Utc::now();

        let body = match self.fetch_list().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Could not fetch top stories");
                return match self.governor.record_failure() {
                    RetryVerdict::Retry { remaining } => CycleOutcome::ListUnavailable { remaining },
                    RetryVerdict::Exhausted => CycleOutcome::Exhausted,
                };
            }
        };
        self.governor.reset();

        let mut candidates = Vec::new();
        let processed = match self.process(&body, &mut candidates).await {
            Ok(processed) => processed,
            Err((stage, error)) => {
                error!(%stage, error = %error, "Cycle aborted");
                Processed {
                    formatted: 0,
                    posted: 0,
                    upload: UploadStatus::Aborted { stage, error },
                }
            }
        };

        let ledger_size = match self.ledger.append(&candidates).await {
            Ok(total) => Some(total),
            Err(e) => {
                error!(error = %e, "Failed to persist ledger");
                None
            }
        };

        CycleOutcome::Finished(CycleReport {
            started_at,
            candidates,
            formatted: processed.formatted,
            posted: processed.posted,
            upload: processed.upload,
            ledger_size,
        })
    }

    async fn fetch_list(&self) -> Result<String> {
        let url = self.config.top_stories_url()?;
        let resp = self.client.get(url.as_str()).await?;
        self.expect_success(url.as_str(), resp)
    }

    /// Everything between the list fetch and persisting the ledger.
    ///
    /// `candidates` is filled in as soon as the filter stage decides on them,
    /// so the caller can persist them even when a later stage fails.
    async fn process(
        &self,
        list_body: &str,
        candidates: &mut Vec<StoryId>,
    ) -> StageResult<Processed> {
        let listed = parse_story_ids(list_body).map_err(at(Stage::Filter))?;
        let seen = self.ledger.load().await.map_err(at(Stage::Filter))?;
        *candidates = select_candidates(&listed, &seen, self.config.request.batch_size);
        info!(
            listed = listed.len(),
            seen = seen.len(),
            candidates = candidates.len(),
            "Selected candidate stories"
        );

        let stories = self
            .fetch_items(candidates.as_slice())
            .await
            .map_err(at(Stage::FetchItems))?;
        let pages = self
            .fetch_pages(&stories)
            .await
            .map_err(at(Stage::FetchPages))?;

        let records: Vec<UploadRecord> = stories
            .iter()
            .zip(&pages)
            .map(|(story, page)| format_story(&self.config.source.name, story, page.as_deref()))
            .collect();
        let formatted = records.len();

        if records.is_empty() {
            debug!("No new stories this cycle; skipping upload");
            return Ok(Processed {
                formatted,
                posted: 0,
                upload: UploadStatus::Skipped,
            });
        }

        // The emptiness check above is on the formatted batch; an all-incomplete
        // batch still goes out as an empty array.
        let batch: Vec<UploadRecord> = records.into_iter().filter(|r| r.is_uploadable()).collect();
        let upload = self.upload(&batch).await.map_err(at(Stage::Upload))?;

        Ok(Processed {
            formatted,
            posted: batch.len(),
            upload,
        })
    }

    async fn fetch_items(&self, ids: &[StoryId]) -> Result<Vec<RawStory>> {
        try_join_all(ids.iter().map(|&id| self.fetch_story(id))).await
    }

    async fn fetch_story(&self, id: StoryId) -> Result<RawStory> {
        let url = self.config.item_url(id)?;
        let resp = self.client.get(url.as_str()).await?;
        let body = self.expect_success(url.as_str(), resp)?;
        let story = parse_story(id, &body)?;
        debug!(
            id,
            kind = ?story.kind,
            by = ?story.by,
            score = ?story.score,
            time = ?story.time,
            has_url = story.url.is_some(),
            "Fetched item"
        );
        Ok(story)
    }

    async fn fetch_pages(&self, stories: &[RawStory]) -> Result<Vec<Option<String>>> {
        try_join_all(stories.iter().map(|story| self.fetch_page(story))).await
    }

    /// Linked page body, or `None` when there is no link. Error pages are
    /// returned too; their markup is scraped like any other.
    async fn fetch_page(&self, story: &RawStory) -> Result<Option<String>> {
        let Some(url) = story.url.as_deref() else {
            debug!(id = ?story.id, "Story has no url; not fetching a page");
            return Ok(None);
        };
        let resp = self.client.get(url).await?;
        if !self.config.is_success(resp.status) {
            debug!(%url, status = resp.status, "Page answered with an error status; scraping it anyway");
        }
        Ok(Some(resp.body))
    }

    #[instrument(level = "info", skip_all, fields(records = batch.len()))]
    async fn upload(&self, batch: &[UploadRecord]) -> Result<UploadStatus> {
        let url = self.config.upload_url()?;
        let resp = self.client.post_json(url.as_str(), batch).await?;
        let body = self.expect_success(url.as_str(), resp)?;

        match serde_json::from_str::<UploadAck>(&body) {
            Ok(ack) => {
                let message = ack.message_text();
                info!(%message, "Upload accepted");
                Ok(UploadStatus::Accepted { message })
            }
            Err(e) => {
                warn!(
                    error = %e,
                    response_preview = %truncate_for_log(&body, 300),
                    "Upload response has no message; treating as rejected"
                );
                Ok(UploadStatus::Rejected { body })
            }
        }
    }

    fn expect_success(&self, url: &str, resp: HttpResponse) -> Result<String> {
        if self.config.is_success(resp.status) {
            Ok(resp.body)
        } else {
            Err(MinerError::BadStatus {
                url: url.to_string(),
                status: resp.status,
            })
        }
    }
}

/// Ids from `listed` not yet in `seen`, in feed order, at most `limit` of them.
pub fn select_candidates(
    listed: &[StoryId],
    seen: &HashSet<StoryId>,
    limit: usize,
) -> Vec<StoryId> {
    listed
        .iter()
        .copied()
        .filter(|id| !seen.contains(id))
        .unique()
        .take(limit)
        .collect()
}
