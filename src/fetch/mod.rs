// src/fetch/mod.rs
// =============================================================================
// This module turns a URL into a Page: the page title plus every outbound
// absolute link it contains.
//
// Submodules:
// - http: Downloads pages with reqwest (the production PageFetcher)
// - html: Extracts the title and links from HTML with scraper
//
// The crawl engine only sees the PageFetcher trait, so tests can swap in an
// in-memory link graph instead of hitting the network.
// =============================================================================

mod html;
mod http;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use html::parse_page;
pub use http::HttpFetcher;

/// A fetched and parsed page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    /// Absolute http/https links; a HashSet so duplicate hrefs collapse
    pub links: HashSet<String>,
}

/// Everything that can go wrong while fetching a single page
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("can't get page: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("can't parse page: {0}")]
    Parse(String),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Fetches a URL and returns its title and links
///
/// Implementations must be safe to call from many tasks at once.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError>;
}
