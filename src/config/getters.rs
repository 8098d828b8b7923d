//! Getter methods for `SnapshotConfig`

use std::path::Path;
use std::time::Duration;

use super::types::{RenderConfig, SnapshotConfig};

impl SnapshotConfig {
    #[must_use]
    pub fn document_url(&self) -> &str {
        &self.document_url
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    #[must_use]
    pub fn local(&self) -> bool {
        self.local
    }

    #[must_use]
    pub fn remove_scripts(&self) -> bool {
        self.remove_scripts
    }

    /// Scripts are only neutered when they are kept
    #[must_use]
    pub fn neuter_scripts(&self) -> bool {
        self.neuter_scripts && !self.remove_scripts
    }

    #[must_use]
    pub fn fetch_remote_css(&self) -> bool {
        self.fetch_remote_css
    }

    #[must_use]
    pub fn fetch_remote_images(&self) -> bool {
        self.fetch_remote_images
    }

    #[must_use]
    pub fn fetch_remote_css_images(&self) -> bool {
        self.fetch_remote_css_images
    }

    #[must_use]
    pub fn max_concurrent_fetches(&self) -> Option<usize> {
        self.max_concurrent_fetches
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn renderer(&self) -> Option<&RenderConfig> {
        self.renderer.as_ref()
    }
}
