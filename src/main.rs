// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing) and log our PID so you can send signals to it
// 3. Start the control plane, the crawl engine and the result sink
// 4. Wait for the sink to decide the crawl is done, then stop the engine
// 5. Print a summary and the elapsed time
//
// Exit codes: 0 = crawl finished (even if pages failed), 2 = startup error.
// A missing --url is reported by clap itself, also with a non-zero code.
// =============================================================================

mod cli;
mod config;
mod crawl;
mod fetch;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use cli::Cli;
use config::CrawlConfig;
use crawl::{ControlPlane, CrawlEngine, CrawlReport, CrawlTask, DepthCeiling, ResultSink};
use fetch::HttpFetcher;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Everything we know about a finished run, printed with --json
#[derive(Debug, Serialize)]
struct RunSummary {
    seed: String,
    max_depth: usize,
    #[serde(flatten)]
    report: CrawlReport,
    visited: usize,
    elapsed_ms: u128,
    pages: BTreeMap<String, String>,
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    Url::parse(&cli.url).with_context(|| format!("Invalid URL '{}'", cli.url))?;

    let config = Arc::new(CrawlConfig::from_cli(&cli));

    info!(pid = std::process::id(), "PID: {}", std::process::id());
    info!(seed = %cli.url, max_depth = config.max_depth, workers = config.workers, "starting crawl");
    let started = Instant::now();

    let cancel = CancellationToken::new();
    let depth = DepthCeiling::new(config.max_depth);

    // Signals are handled for the whole lifetime of the process
    let control = ControlPlane::new(depth.clone(), cancel.clone());
    tokio::spawn(async move {
        if let Err(e) = control.run().await {
            error!("control plane stopped: {:#}", e);
        }
    });

    if let Some(deadline) = config.run_deadline {
        spawn_deadline(deadline, cancel.clone());
    }

    let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout)?);
    let engine = CrawlEngine::new(fetcher, Arc::clone(&config), depth.clone(), cancel.clone());

    // Capacity 1: a slow sink makes crawl tasks wait before fetching more
    let (outcomes_tx, outcomes_rx) = mpsc::channel(1);
    let sink = ResultSink::new(&config, cancel.clone());

    engine.start(CrawlTask::seed(cli.url.clone()), outcomes_tx);
    let report = sink.drain(outcomes_rx).await;

    // Whatever ended the crawl, don't start any more fetches
    cancel.cancel();

    let elapsed = started.elapsed();
    let visited = engine.visited();
    if visited.is_empty() {
        warn!("no page was fetched");
    }

    let summary = RunSummary {
        seed: cli.url,
        max_depth: depth.current(),
        report,
        visited: visited.len(),
        elapsed_ms: elapsed.as_millis(),
        pages: visited.snapshot(),
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    info!("{:?}", elapsed);
    Ok(())
}

// Raises the cancellation token once the run deadline passes.
// Fetches already in flight keep their own fetch timeout.
fn spawn_deadline(deadline: Duration, cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(deadline) => {
                warn!("run deadline of {:?} reached, stopping the crawl", deadline);
                cancel.cancel();
            }
        }
    });
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("📊 Summary:");
    println!("   🏁 Finished: {:?}", summary.report.reason);
    println!("   ✅ Pages: {}", summary.report.successes);
    println!("   ❌ Errors: {}", summary.report.failures);
    println!("   📋 Visited: {}", summary.visited);
    println!("   📏 Max depth: {}", summary.max_depth);
    println!("   ⏱️  Elapsed: {:?}", Duration::from_millis(summary.elapsed_ms as u64));
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why is a CancellationToken cloned so many times?
//    - Every clone refers to the same token
//    - Calling cancel() on any clone is seen by all of them
//
// 2. Why don't we wait for the engine's tasks to finish?
//    - After the sink is done we cancel, print the summary and exit
//    - std::process::exit ends the process, so a fetch still in flight is
//      simply abandoned
//
// 3. What is {:#} in eprintln!?
//    - The "alternate" Display of anyhow errors prints the whole context chain
// -----------------------------------------------------------------------------
