//! Type definitions for the snapshot pipeline

use std::collections::{BTreeMap, HashMap};

/// Where a reference was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceType {
    Script,
    Stylesheet,
    CssImage,
    Image,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Script => write!(f, "script"),
            ResourceType::Stylesheet => write!(f, "stylesheet"),
            ResourceType::CssImage => write!(f, "CSS image"),
            ResourceType::Image => write!(f, "image"),
        }
    }
}

/// Canonical URLs awaiting fetch, keyed by URL
///
/// A URL discovered several times, from one kind of reference or several,
/// occupies a single entry and is therefore fetched once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingReferences {
    entries: BTreeMap<String, Vec<ResourceType>>,
}

impl PendingReferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reference. Returns `true` when the URL was not pending yet.
    pub fn insert(&mut self, kind: ResourceType, url: impl Into<String>) -> bool {
        let mut is_new = false;
        let kinds = self.entries.entry(url.into()).or_insert_with(|| {
            is_new = true;
            Vec::new()
        });
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
        is_new
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Kinds of reference `url` was discovered as, in discovery order
    #[must_use]
    pub fn kinds(&self, url: &str) -> &[ResourceType] {
        self.entries.get(url).map(Vec::as_slice).unwrap_or_default()
    }

    /// Distinct URLs in sorted order
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonical URL to data URI, fixed once the fetch barrier has passed
///
/// An empty data URI records a failed fetch for that URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceResults {
    data: HashMap<String, String>,
}

impl ResourceResults {
    pub(crate) fn from_map(data: HashMap<String, String>) -> Self {
        Self { data }
    }

    /// The stored entry for `url`: `Some("")` for a failed fetch, `None` when
    /// the URL was never fetched
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&str> {
        self.data.get(url).map(String::as_str)
    }

    /// Successfully encoded resources only
    pub fn encoded(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data
            .iter()
            .filter(|(_, data_uri)| !data_uri.is_empty())
            .map(|(url, data_uri)| (url.as_str(), data_uri.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Error information for a reference that could not be inlined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InliningError {
    pub url: String,
    pub resource_type: ResourceType,
    pub error: String,
}

impl std::fmt::Display for InliningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.resource_type, self.url, self.error)
    }
}

/// Outcome of a snapshot run with success and failure tracking
#[derive(Debug, Clone, Default)]
pub struct SnapshotReport {
    /// Final serialized document
    pub html: String,
    /// References replaced by inline content
    pub successes: usize,
    /// References left in place, with the reason
    pub failures: Vec<InliningError>,
    /// Distinct URLs fetched by the concurrent image stage
    pub fetched: usize,
    /// `<script>` elements removed or neutered after inlining
    pub scripts_disabled: usize,
}

impl SnapshotReport {
    /// Total number of references processed
    #[must_use]
    pub fn total(&self) -> usize {
        self.successes + self.failures.len()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Failure rate as a ratio between 0.0 and 1.0
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.failures.len() as f64 / total as f64
        }
    }

    pub(crate) fn record_failure(
        &mut self,
        url: &str,
        resource_type: ResourceType,
        error: impl Into<String>,
    ) {
        self.failures.push(InliningError {
            url: url.to_string(),
            resource_type,
            error: error.into(),
        });
    }
}
