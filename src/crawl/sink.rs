// src/crawl/sink.rs
// =============================================================================
// The ResultSink drains the outcome channel and decides when the crawl is done.
//
// It keeps two countdowns:
// - errors left: every Failure decrements it, at zero we stop
// - results left: every Success decrements it, at zero we stop
//
// It also stops when the crawl is cancelled or when every crawl task has
// finished (all Senders dropped, so the channel is closed).
//
// Every outcome is logged here, and only here: crawl tasks never handle
// their own errors, they just report them.
// =============================================================================

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::CrawlOutcome;
use crate::config::CrawlConfig;

/// Why the crawl finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DoneReason {
    ErrorBudgetExhausted,
    ResultBudgetExhausted,
    Cancelled,
    FrontierExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    pub reason: DoneReason,
    pub successes: usize,
    pub failures: usize,
}

pub struct ResultSink {
    errors_left: usize,
    results_left: usize,
    cancel: CancellationToken,
}

impl ResultSink {
    pub fn new(config: &CrawlConfig, cancel: CancellationToken) -> Self {
        Self {
            errors_left: config.error_budget,
            results_left: config.result_budget,
            cancel,
        }
    }

    /// Consumes outcomes until a termination condition is met
    pub async fn drain(mut self, mut outcomes: mpsc::Receiver<CrawlOutcome>) -> CrawlReport {
        let mut successes = 0;
        let mut failures = 0;

        let reason = loop {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    warn!("crawl cancelled");
                    break DoneReason::Cancelled;
                }
                outcome = outcomes.recv() => outcome,
            };

            match outcome {
                None => {
                    info!("no more pages to crawl");
                    break DoneReason::FrontierExhausted;
                }
                Some(CrawlOutcome::Failure(err)) => {
                    failures += 1;
                    error!(url = %err.url, "{err}");
                    self.errors_left = self.errors_left.saturating_sub(1);
                    if self.errors_left == 0 {
                        warn!("max errors exceeded");
                        break DoneReason::ErrorBudgetExhausted;
                    }
                }
                Some(CrawlOutcome::Success { url, title }) => {
                    successes += 1;
                    info!("{url} -> {title}");
                    self.results_left = self.results_left.saturating_sub(1);
                    if self.results_left == 0 {
                        warn!("got max results");
                        break DoneReason::ResultBudgetExhausted;
                    }
                }
            }
        };

        CrawlReport {
            reason,
            successes,
            failures,
        }
    }
}
