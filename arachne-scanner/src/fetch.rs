use crate::error::{Result, ScanError};
use crate::page::Page;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Resolves a page identifier to its content and outgoing links.
///
/// Any error means "do not expand this page". The engine does not look at
/// the cause.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<Page>;
}

/// Adapts a plain closure into a [`Fetcher`].
pub struct FetchFn<F>(pub F);

#[async_trait]
impl<F> Fetcher for FetchFn<F>
where
    F: Fn(&str) -> Result<Page> + Send + Sync,
{
    async fn fetch(&self, id: &str) -> Result<Page> {
        (self.0)(id)
    }
}

/// Serves a fixed, in-memory link graph.
#[derive(Debug, Clone, Default)]
pub struct GraphFetcher {
    pages: HashMap<String, Page>,
    delay: Option<Duration>,
}

impl GraphFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pages(pages: HashMap<String, Page>) -> Self {
        Self { pages, delay: None }
    }

    /// Parse `{ "<id>": { "body": "...", "links": [...] }, ... }`.
    pub fn from_json(json: &str) -> Result<Self> {
        let pages: HashMap<String, Page> = serde_json::from_str(json)?;
        Ok(Self::from_pages(pages))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn with_page(mut self, id: impl Into<String>, content: impl Into<String>, links: &[&str]) -> Self {
        let links = links.iter().map(|link| link.to_string()).collect();
        self.pages.insert(id.into(), Page::new(content, links));
        self
    }

    /// Sleep this long before answering each fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    pub fn get(&self, id: &str) -> Option<&Page> {
        self.pages.get(id)
    }
}

#[async_trait]
impl Fetcher for GraphFetcher {
    async fn fetch(&self, id: &str) -> Result<Page> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.pages.get(id) {
            Some(page) => Ok(page.clone()),
            None => {
                debug!("No page for {}", id);
                Err(ScanError::NotFound(id.to_string()))
            }
        }
    }
}
