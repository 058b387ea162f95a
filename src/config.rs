// src/config.rs
// =============================================================================
// Crawl configuration, built once at startup and shared by reference.
//
// Everything here is fixed for the whole run except the depth ceiling, which
// lives in crawl::DepthCeiling so the control plane can raise it while tasks
// are running.
// =============================================================================

use std::time::Duration;

use crate::cli::Cli;

/// Maximum number of failed fetches before the crawl is considered finished
pub const ERROR_BUDGET: usize = 100_000;

/// Number of successful pages we want to collect
pub const RESULT_BUDGET: usize = 10_000;

/// Hard limit for a single page fetch (connect + download + parse)
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Artificial pause before every crawl task so the log stays readable
pub const TASK_DELAY: Duration = Duration::from_secs(2);

/// How much SIGUSR1 raises the depth ceiling by
pub const DEPTH_STEP: usize = 10;

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Initial depth ceiling (the seed is depth 0)
    pub max_depth: usize,
    pub error_budget: usize,
    pub result_budget: usize,
    /// Per-fetch timeout. Independent of `run_deadline`: cancelling the run
    /// never shortens a fetch that has already started.
    pub fetch_timeout: Duration,
    pub task_delay: Duration,
    /// Worker pool size; 0 means one task per discovered link
    pub workers: usize,
    /// Optional wall-clock limit for the whole crawl
    pub run_deadline: Option<Duration>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            error_budget: ERROR_BUDGET,
            result_budget: RESULT_BUDGET,
            fetch_timeout: FETCH_TIMEOUT,
            task_delay: TASK_DELAY,
            workers: 0,
            run_deadline: None,
        }
    }
}

impl CrawlConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            max_depth: cli.depth,
            task_delay: if cli.no_delay { Duration::ZERO } else { TASK_DELAY },
            workers: cli.workers,
            run_deadline: cli.deadline.map(Duration::from_secs),
            ..Self::default()
        }
    }
}
