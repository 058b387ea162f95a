// src/fetch/html.rs
// =============================================================================
// This module extracts the title and the links from an HTML page.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// We also use the `url` crate to resolve relative links to absolute URLs.
//
// Note: scraper's Html type is not Send, so everything here is synchronous and
// must finish before the caller hits its next .await
// =============================================================================

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

use super::{FetchError, Page};

// Parses an HTML document into a Page
//
// Parameters:
//   html: the raw HTML body
//   page_url: the URL the body was downloaded from (base for relative links)
pub fn parse_page(html: &str, page_url: &str) -> Result<Page, FetchError> {
    let base = Url::parse(page_url)
        .map_err(|e| FetchError::Parse(format!("invalid page URL '{}': {}", page_url, e)))?;

    let document = Html::parse_document(html);

    Ok(Page {
        title: title_of(&document)?,
        links: links_of(&document, &base)?,
    })
}

// Returns the trimmed text of the first <title> element, or "" if there is none
fn title_of(document: &Html) -> Result<String, FetchError> {
    let selector = selector("title")?;
    let title = document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>())
        .unwrap_or_default();

    Ok(title.trim().to_string())
}

// Returns every http/https link on the page as an absolute URL
fn links_of(document: &Html, base: &Url) -> Result<HashSet<String>, FetchError> {
    let selector = selector("a[href]")?;

    let links = document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_url(base, href))
        .filter(|url| is_crawlable_link(url))
        .collect();

    Ok(links)
}

fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::Parse(format!("bad selector '{}': {:?}", css, e)))
}

// Resolves a possibly-relative URL to an absolute URL
//
// Examples:
//   base = "https://example.com/page"
//   href = "/docs" -> Some("https://example.com/docs")
//   href = "//cdn.example.com/x" -> Some("https://cdn.example.com/x")
//   href = "#section" -> None (same page)
fn resolve_url(base: &Url, href: &str) -> Option<String> {
    if href.starts_with('#') {
        return None;
    }

    match Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        // Likely a relative URL, try joining with base
        Err(_) => base.join(href).ok().map(|url| url.to_string()),
    }
}

// We skip mailto:, tel:, javascript:, data: and file: links
fn is_crawlable_link(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why return a HashSet of links?
//    - The same link often appears many times on a page (nav bars, footers)
//    - A set collapses duplicates so we never spawn two tasks for one href
//
// 2. Why filter_map?
//    - It maps each item and drops the ones that return None
//    - Elements without href and unresolvable links just disappear
//
// 3. Why is the title trimmed?
//    - <title> text often has newlines and indentation around it
// -----------------------------------------------------------------------------
