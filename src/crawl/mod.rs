// src/crawl/mod.rs
// =============================================================================
// This module is the concurrent crawl engine.
//
// Pieces:
// - visited: the shared set of claimed URLs (dedup)
// - depth: the depth ceiling, raisable while the crawl runs
// - engine: runs crawl tasks and fans out to discovered links
// - sink: drains outcomes, enforces the error/result budgets
// - control: turns process signals into depth raises and cancellation
//
// Data flow:
//   CrawlEngine --(CrawlOutcome over mpsc)--> ResultSink
//   ControlPlane --(DepthCeiling / CancellationToken)--> CrawlEngine
// =============================================================================

mod control;
mod depth;
mod engine;
mod sink;
mod visited;

pub use control::ControlPlane;
pub use depth::DepthCeiling;
pub use engine::{CrawlEngine, CrawlError, CrawlOutcome, CrawlTask};
pub use sink::{CrawlReport, DoneReason, ResultSink};
pub use visited::VisitedSet;
