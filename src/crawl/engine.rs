// src/crawl/engine.rs
// =============================================================================
// The crawl engine: fetches pages and fans out to the links it finds.
//
// How one crawl step works (CrawlEngine::step):
// 1. Wait the per-task delay (cut short if the crawl is cancelled)
// 2. Give up if the crawl was cancelled - new work only, in-flight fetches
//    are never interrupted
// 3. Give up if the task is at or beyond the depth ceiling
// 4. Claim the URL in the visited set; give up if someone else already did
// 5. Fetch the page under the per-fetch timeout
// 6. Send Success/Failure to the outcome channel
// 7. Return one child task per link not yet visited (depth + 1)
//
// Who runs the children is up to the scheduler:
// - Unbounded (workers = 0): every child gets its own tokio task
// - Pool (workers = N): N workers drain a shared task queue
//
// Either way, when the last task finishes every outcome Sender is dropped and
// the ResultSink sees the channel close.
// =============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{DepthCeiling, VisitedSet};
use crate::config::CrawlConfig;
use crate::fetch::{FetchError, PageFetcher};

/// "Fetch and process one URL at one depth"
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlTask {
    pub url: String,
    pub depth: usize,
}

impl CrawlTask {
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
        }
    }
}

/// A failed fetch, tagged with the URL it was for
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("fetch page {url}: {source}")]
pub struct CrawlError {
    pub url: String,
    #[source]
    pub source: FetchError,
}

/// What a crawl step reports to the ResultSink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    Success { url: String, title: String },
    Failure(CrawlError),
}

/// Computes the follow-up tasks for a fetched page
///
/// Pure: `is_visited` is the only view of shared state, so this is easy to test.
pub fn next_tasks<I, F>(parent: &CrawlTask, links: I, is_visited: F) -> Vec<CrawlTask>
where
    I: IntoIterator<Item = String>,
    F: Fn(&str) -> bool,
{
    links
        .into_iter()
        .filter(|link| !is_visited(link))
        .map(|url| CrawlTask {
            url,
            depth: parent.depth + 1,
        })
        .collect()
}

#[derive(Clone)]
pub struct CrawlEngine {
    fetcher: Arc<dyn PageFetcher>,
    visited: VisitedSet,
    depth: DepthCeiling,
    cancel: CancellationToken,
    config: Arc<CrawlConfig>,
}

impl CrawlEngine {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        config: Arc<CrawlConfig>,
        depth: DepthCeiling,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            visited: VisitedSet::new(),
            depth,
            cancel,
            config,
        }
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    /// Starts crawling from `seed` in the background
    ///
    /// Takes ownership of the outcome Sender: once every crawl task has
    /// finished, the last clone is dropped and the channel closes.
    pub fn start(&self, seed: CrawlTask, outcomes: mpsc::Sender<CrawlOutcome>) -> JoinHandle<()> {
        match self.config.workers {
            // Only the seed's handle is returned: descendants detach and the
            // channel closing is the completion signal
            0 => self.spawn(seed, outcomes),
            workers => self.start_pool(seed, outcomes, workers),
        }
    }

    /// Runs one crawl step and returns the children to schedule
    pub async fn step(&self, task: CrawlTask, outcomes: &mpsc::Sender<CrawlOutcome>) -> Vec<CrawlTask> {
        if !self.config.task_delay.is_zero() {
            tokio::select! {
                _ = self.cancel.cancelled() => return Vec::new(),
                _ = tokio::time::sleep(self.config.task_delay) => {}
            }
        }

        if self.cancel.is_cancelled() {
            return Vec::new();
        }

        if !self.depth.allows(task.depth) {
            debug!(url = %task.url, depth = task.depth, "depth ceiling reached");
            return Vec::new();
        }

        if !self.visited.claim(&task.url) {
            debug!(url = %task.url, "already visited");
            return Vec::new();
        }

        let fetched = tokio::time::timeout(self.config.fetch_timeout, self.fetcher.fetch(&task.url))
            .await
            .unwrap_or(Err(FetchError::Timeout(self.config.fetch_timeout)));

        let page = match fetched {
            Ok(page) => page,
            Err(source) => {
                let failure = CrawlError {
                    url: task.url.clone(),
                    source,
                };
                // A closed channel means the sink is done; nothing left to do
                let _ = outcomes.send(CrawlOutcome::Failure(failure)).await;
                return Vec::new();
            }
        };

        self.visited.record_title(&task.url, &page.title);

        let success = CrawlOutcome::Success {
            url: task.url.clone(),
            title: page.title,
        };
        if outcomes.send(success).await.is_err() {
            return Vec::new();
        }

        next_tasks(&task, page.links, |link| self.visited.contains(link))
    }

    // One tokio task per crawl task. spawn() itself is synchronous, so the
    // recursion never builds a recursive future type.
    fn spawn(&self, task: CrawlTask, outcomes: mpsc::Sender<CrawlOutcome>) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            for child in engine.step(task, &outcomes).await {
                engine.spawn(child, outcomes.clone());
            }
        })
    }

    fn start_pool(
        &self,
        seed: CrawlTask,
        outcomes: mpsc::Sender<CrawlOutcome>,
        workers: usize,
    ) -> JoinHandle<()> {
        // Unbounded on purpose: a bounded queue would deadlock once every
        // worker is blocked pushing children. Backpressure comes from the
        // outcome channel instead.
        let (queue_tx, queue_rx) = mpsc::unbounded_channel::<CrawlTask>();
        let queue_rx = Arc::new(Mutex::new(queue_rx));
        // Tasks queued or running; the pool is drained when this hits zero
        let pending = Arc::new(AtomicUsize::new(1));
        let drained = CancellationToken::new();

        if queue_tx.send(seed).is_err() {
            drained.cancel();
        }

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let engine = self.clone();
                let outcomes = outcomes.clone();
                let queue_tx = queue_tx.clone();
                let queue_rx = Arc::clone(&queue_rx);
                let pending = Arc::clone(&pending);
                let drained = drained.clone();

                tokio::spawn(async move {
                    loop {
                        let next = tokio::select! {
                            _ = drained.cancelled() => None,
                            task = async { queue_rx.lock().await.recv().await } => task,
                        };
                        let Some(task) = next else { break };

                        let children = engine.step(task, &outcomes).await;
                        pending.fetch_add(children.len(), Ordering::SeqCst);
                        for child in children {
                            // The receiver lives as long as any worker does
                            let _ = queue_tx.send(child);
                        }

                        if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                            drained.cancel();
                        }
                    }
                    debug!(worker, "crawl worker exiting");
                })
            })
            .collect();

        tokio::spawn(async move {
            let panicked = join_all(handles)
                .await
                .into_iter()
                .filter(Result::is_err)
                .count();
            if panicked > 0 {
                warn!(panicked, "crawl workers panicked");
            }
        })
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why claim before fetching?
//    - If we only marked a URL visited after downloading it, two tasks that
//      found the same link at the same time would both download it
//    - claim() is check-and-insert in one step, so exactly one task wins
//
// 2. Why does step() return children instead of spawning them?
//    - It keeps "do the work" separate from "decide who runs next"
//    - The same step() serves both the unbounded and the pooled scheduler
//
// 3. What is tokio::select!?
//    - Waits on several futures and runs the branch of whichever finishes first
//    - Here: "sleep 2s, unless the crawl gets cancelled first"
//
// 4. Why is the outcome channel so small (capacity 1)?
//    - send().await waits until the sink has room
//    - A slow sink automatically slows the crawl down (backpressure)
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticFetcher;
    use std::collections::HashSet;
    use std::time::Duration;

    fn test_config(max_depth: usize, workers: usize) -> Arc<CrawlConfig> {
        Arc::new(CrawlConfig {
            max_depth,
            task_delay: Duration::ZERO,
            fetch_timeout: Duration::from_secs(1),
            workers,
            ..CrawlConfig::default()
        })
    }

    fn engine(fetcher: Arc<StaticFetcher>, config: Arc<CrawlConfig>) -> CrawlEngine {
        let depth = DepthCeiling::new(config.max_depth);
        CrawlEngine::new(fetcher, config, depth, CancellationToken::new())
    }

    // Runs a crawl to completion and returns every outcome
    async fn crawl(engine: &CrawlEngine, seed: &str) -> Vec<CrawlOutcome> {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = engine.start(CrawlTask::seed(seed), tx);
        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }
        handle.await.unwrap();
        outcomes
    }

    fn successes(outcomes: &[CrawlOutcome]) -> HashSet<String> {
        outcomes
            .iter()
            .filter_map(|o| match o {
                CrawlOutcome::Success { url, .. } => Some(url.clone()),
                CrawlOutcome::Failure(_) => None,
            })
            .collect()
    }

    fn graph() -> StaticFetcher {
        StaticFetcher::new()
            .page("a", "A", &["b", "c"])
            .page("b", "B", &["d"])
            .page("c", "C", &["d"])
            .page("d", "D", &["a"])
    }

    #[test]
    fn test_next_tasks_skips_visited() {
        let parent = CrawlTask { url: "a".into(), depth: 2 };
        let links = vec!["a".to_string(), "b".to_string()];
        let children = next_tasks(&parent, links, |url| url == "a");
        assert_eq!(children, vec![CrawlTask { url: "b".into(), depth: 3 }]);
    }

    #[tokio::test]
    async fn test_seed_with_two_links_depth_two() {
        let fetcher = Arc::new(graph());
        let engine = engine(fetcher.clone(), test_config(2, 0));

        let outcomes = crawl(&engine, "a").await;

        let expected: HashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(successes(&outcomes), expected);
        assert_eq!(outcomes.len(), 3);
        // d is a depth-2 child of b and c, never fetched
        assert_eq!(fetcher.calls("d"), 0);
        assert!(!engine.visited().contains("d"));
    }

    #[tokio::test]
    async fn test_each_url_fetched_once() {
        let fetcher = Arc::new(graph());
        let engine = engine(fetcher.clone(), test_config(10, 0));

        let outcomes = crawl(&engine, "a").await;

        assert_eq!(outcomes.len(), 4);
        for url in ["a", "b", "c", "d"] {
            assert_eq!(fetcher.calls(url), 1, "{url} fetched more than once");
        }
        assert_eq!(engine.visited().snapshot()["d"], "D");
    }

    #[tokio::test]
    async fn test_failing_seed() {
        let fetcher = Arc::new(
            StaticFetcher::new().failing("a", FetchError::Transport("connection refused".into())),
        );
        let engine = engine(fetcher.clone(), test_config(3, 0));

        let outcomes = crawl(&engine, "a").await;

        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            CrawlOutcome::Failure(err) => {
                assert_eq!(err.url, "a");
                assert_eq!(err.to_string(), "fetch page a: can't get page: connection refused");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(fetcher.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_href_fetched_once() {
        let fetcher = Arc::new(
            StaticFetcher::new()
                .page("a", "A", &["b", "b"])
                .page("b", "B", &[]),
        );
        let engine = engine(fetcher.clone(), test_config(3, 0));

        crawl(&engine, "a").await;

        assert_eq!(fetcher.calls("b"), 1);
        assert_eq!(engine.visited().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_depth_fetches_nothing() {
        let fetcher = Arc::new(graph());
        let engine = engine(fetcher.clone(), test_config(0, 0));

        let outcomes = crawl(&engine, "a").await;

        assert!(outcomes.is_empty());
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let fetcher = Arc::new(graph());
        let engine = engine(fetcher.clone(), test_config(5, 0));
        engine.cancel.cancel();

        let outcomes = crawl(&engine, "a").await;

        assert!(outcomes.is_empty());
        assert_eq!(fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_raised_ceiling_applies_to_later_tasks() {
        let fetcher = Arc::new(graph());
        let engine = engine(fetcher.clone(), test_config(1, 0));
        let (tx, _rx) = mpsc::channel(8);

        let children = engine.step(CrawlTask::seed("a"), &tx).await;
        assert_eq!(children.len(), 2);

        // Blocked at the starting ceiling...
        let blocked = engine.step(children[0].clone(), &tx).await;
        assert!(blocked.is_empty());
        assert_eq!(fetcher.total_calls(), 1);

        // ...allowed once the ceiling is raised
        engine.depth.raise(10);
        engine.step(children[1].clone(), &tx).await;
        assert_eq!(fetcher.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_slow_fetch_times_out() {
        struct SlowFetcher;

        #[async_trait::async_trait]
        impl PageFetcher for SlowFetcher {
            async fn fetch(&self, _url: &str) -> Result<crate::fetch::Page, FetchError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Default::default())
            }
        }

        let config = Arc::new(CrawlConfig {
            fetch_timeout: Duration::from_millis(20),
            task_delay: Duration::ZERO,
            ..CrawlConfig::default()
        });
        let engine = CrawlEngine::new(
            Arc::new(SlowFetcher),
            config,
            DepthCeiling::new(3),
            CancellationToken::new(),
        );
        let (tx, mut rx) = mpsc::channel(1);

        let children = engine.step(CrawlTask::seed("slow"), &tx).await;

        assert!(children.is_empty());
        match rx.recv().await {
            Some(CrawlOutcome::Failure(err)) => {
                assert_eq!(err.source, FetchError::Timeout(Duration::from_millis(20)))
            }
            other => panic!("expected timeout failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pool_matches_unbounded() {
        let unbounded = engine(Arc::new(graph()), test_config(10, 0));
        let pooled_fetcher = Arc::new(graph());
        let pooled = engine(pooled_fetcher.clone(), test_config(10, 2));

        let expected = successes(&crawl(&unbounded, "a").await);
        let actual = successes(&crawl(&pooled, "a").await);

        assert_eq!(actual, expected);
        assert_eq!(pooled_fetcher.total_calls(), 4);
    }

    #[tokio::test]
    async fn test_pool_with_cancel_drains() {
        let fetcher = Arc::new(graph());
        let engine = engine(fetcher.clone(), test_config(10, 3));
        engine.cancel.cancel();

        let outcomes = crawl(&engine, "a").await;

        assert!(outcomes.is_empty());
        assert_eq!(fetcher.total_calls(), 0);
    }
}
