//! Fixed-period driver for the [`Pipeline`].
//!
//! The first cycle runs immediately, then one per period. A cycle is awaited
//! to completion before the next tick is taken, and ticks missed while a slow
//! cycle was running are delayed rather than fired in a burst.
//!
//! Once the retry budget is spent the scheduler halts for good; only a
//! process restart brings it back.

use crate::http::HttpClient;
use crate::pipeline::{CycleOutcome, Pipeline, UploadStatus};
use crate::utils::truncate_for_log;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Why [`Scheduler::run_until`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The top-stories list kept failing until the retry budget ran out.
    Exhausted,
    /// A shutdown was requested between cycles.
    Shutdown,
}

#[derive(Debug)]
pub struct Scheduler<C> {
    pipeline: Pipeline<C>,
    period: Duration,
    halted: bool,
}

impl<C: HttpClient> Scheduler<C> {
    pub fn new(pipeline: Pipeline<C>, period: Duration) -> Self {
        Self {
            pipeline,
            period,
            halted: false,
        }
    }

    pub fn pipeline(&self) -> &Pipeline<C> {
        &self.pipeline
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Run one cycle unless the scheduler has halted.
    ///
    /// Returns `None` without touching the pipeline once halted.
    pub async fn tick(&mut self) -> Option<CycleOutcome> {
        if self.halted {
            debug!("Scheduler halted; ignoring tick");
            return None;
        }

        let t0 = Instant::now();
        let outcome = self.pipeline.run_cycle().await;
        log_outcome(&outcome, t0.elapsed());

        if matches!(outcome, CycleOutcome::Exhausted) {
            self.halted = true;
        }
        Some(outcome)
    }

    /// Tick every period until the retry budget runs out or `shutdown`
    /// resolves. Shutdown is only observed between cycles.
    pub async fn run_until<F>(&mut self, shutdown: F) -> StopReason
    where
        F: Future<Output = ()>,
    {
        info!(period_secs = self.period.as_secs(), "Scheduler started");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            if self.halted {
                return StopReason::Exhausted;
            }
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested; stopping scheduler");
                    return StopReason::Shutdown;
                }
                _ = ticker.tick() => {}
            }
            self.tick().await;
        }
    }

    /// [`run_until`](Self::run_until) Ctrl+C.
    pub async fn run(&mut self) -> StopReason {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Could not listen for Ctrl+C; running until halted");
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}

fn log_outcome(outcome: &CycleOutcome, elapsed: Duration) {
    let elapsed_ms = elapsed.as_millis() as u64;
    match outcome {
        CycleOutcome::ListUnavailable { remaining } => {
            warn!(remaining, elapsed_ms, "Cycle skipped; top stories unavailable");
        }
        CycleOutcome::Exhausted => {
            error!(elapsed_ms, "Retry budget exhausted; halting scheduler");
        }
        CycleOutcome::Finished(report) => {
            let (upload, detail) = match &report.upload {
                UploadStatus::Accepted { message } => ("accepted", message.clone()),
                UploadStatus::Rejected { body } => ("rejected", truncate_for_log(body, 120)),
                UploadStatus::Skipped => ("skipped", String::new()),
                UploadStatus::Aborted { stage, error } => ("aborted", format!("{stage}: {error}")),
            };
            info!(
                started_at = %report.started_at.to_rfc3339(),
                candidates = report.candidates.len(),
                formatted = report.formatted,
                posted = report.posted,
                upload,
                %detail,
                ledger_size = ?report.ledger_size,
                elapsed_ms,
                "Cycle complete"
            );
        }
    }
}
