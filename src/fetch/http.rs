// src/fetch/http.rs
// =============================================================================
// The production PageFetcher: downloads a page with reqwest and hands the body
// to the HTML parser.
//
// One Client is created at startup and shared by every crawl task. reqwest
// Clients pool connections internally and are cheap to clone.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::{parse_page, FetchError, Page, PageFetcher};

pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("link-crawler/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| categorize_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| categorize_error(e, self.timeout))?;

        parse_page(&body, url)
    }
}

// Maps reqwest's error kinds onto our FetchError variants
fn categorize_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else if error.is_decode() || error.is_body() {
        FetchError::Parse(error.to_string())
    } else if error.is_redirect() {
        FetchError::Transport("too many redirects".to_string())
    } else {
        FetchError::Transport(error.to_string())
    }
}
