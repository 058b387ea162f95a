// src/crawl/visited.rs
// =============================================================================
// The set of URLs the crawl has already claimed, shared by every crawl task.
//
// The only way to add a URL is claim(), which checks and inserts under one
// lock acquisition. Two tasks that discover the same link at the same moment
// can therefore never both win, and the page is fetched at most once.
//
// Rust concepts:
// - Arc<Mutex<T>>: shared ownership + mutual exclusion across tasks
// - std::sync::Mutex (not tokio's): we never hold the lock across an .await
// =============================================================================

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// URL -> page title. An empty title means "claimed, not (successfully) fetched yet".
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `url` as visited. Returns false if another task got there first.
    pub fn claim(&self, url: &str) -> bool {
        let mut visited = self.lock();
        if visited.contains_key(url) {
            return false;
        }
        visited.insert(url.to_string(), String::new());
        true
    }

    /// Stores the title of an already claimed URL
    pub fn record_title(&self, url: &str, title: &str) {
        if let Some(slot) = self.lock().get_mut(url) {
            *slot = title.to_string();
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains_key(url)
    }

    /// Copy of every visited URL and its title, sorted by URL
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock()
            .iter()
            .map(|(url, title)| (url.clone(), title.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock can't leave the map half-updated
    // (every critical section is a single insert/lookup), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
