// src/crawl/depth.rs
// Runtime-adjustable depth ceiling. Only ever grows.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DepthCeiling {
    max_depth: Arc<AtomicUsize>,
}

impl DepthCeiling {
    pub fn new(initial: usize) -> Self {
        Self {
            max_depth: Arc::new(AtomicUsize::new(initial)),
        }
    }

    pub fn current(&self) -> usize {
        self.max_depth.load(Ordering::SeqCst)
    }

    /// Raises the ceiling by `step` and returns the new value
    pub fn raise(&self, step: usize) -> usize {
        // fetch_add wraps on overflow; saturate instead
        let previous = self
            .max_depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| Some(d.saturating_add(step)))
            .unwrap_or_else(|d| d);
        previous.saturating_add(step)
    }

    /// True if a task at `depth` is still allowed to fetch
    pub fn allows(&self, depth: usize) -> bool {
        depth < self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_k_times() {
        let ceiling = DepthCeiling::new(3);
        for _ in 0..4 {
            ceiling.raise(10);
        }
        assert_eq!(ceiling.current(), 43);
    }

    #[test]
    fn test_raise_is_visible_to_clones() {
        let ceiling = DepthCeiling::new(1);
        let shared = ceiling.clone();
        assert!(!shared.allows(1));
        assert_eq!(ceiling.raise(10), 11);
        assert!(shared.allows(1));
        assert!(!shared.allows(11));
    }

    #[test]
    fn test_raise_saturates() {
        let ceiling = DepthCeiling::new(usize::MAX - 1);
        assert_eq!(ceiling.raise(10), usize::MAX);
    }
}
