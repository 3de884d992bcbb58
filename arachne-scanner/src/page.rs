use serde::{Deserialize, Serialize};

/// What a fetcher returns for one page identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "body", default)]
    pub content: String,
    #[serde(rename = "links", default)]
    pub links: Vec<String>,
}

impl Page {
    pub fn new(content: impl Into<String>, links: Vec<String>) -> Self {
        Self {
            content: content.into(),
            links,
        }
    }
}

/// Record emitted once per newly visited page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscoveredPage {
    pub id: String,
    pub content: String,
}

impl DiscoveredPage {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }
}
