use std::collections::HashSet;
use tokio::sync::Mutex;

/// Set of page identifiers claimed during a single crawl run.
///
/// Identifiers are never removed. A registry is built fresh for every run and
/// dropped with it.
#[derive(Debug, Default)]
pub struct VisitedRegistry {
    visited: Mutex<HashSet<String>>,
}

impl VisitedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and mark as visited in one step.
    ///
    /// Returns `true` only for the caller whose insert actually happened, so
    /// exactly one of any number of concurrent claimants for the same id wins.
    pub async fn claim(&self, id: &str) -> bool {
        let mut visited = self.visited.lock().await;
        if visited.contains(id) {
            false
        } else {
            visited.insert(id.to_string());
            true
        }
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.visited.lock().await.contains(id)
    }

    pub async fn len(&self) -> usize {
        self.visited.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.visited.lock().await.is_empty()
    }
}
