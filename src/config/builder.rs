//! Type-safe builder for `SnapshotConfig` using the typestate pattern
//!
//! `document_url` and then `output_file` must be set before `build` becomes
//! available. Everything else has a default.

use anyhow::{Result, anyhow, bail};
use std::marker::PhantomData;
use std::path::PathBuf;
use tokio::sync::Semaphore;

use crate::utils::{CHROME_USER_AGENT, is_network_url, normalize_base_url};

use super::types::{RenderConfig, SnapshotConfig};

// Type states for the builder
pub struct WithDocumentUrl;
pub struct Complete;

pub struct SnapshotConfigBuilder<State = ()> {
    pub(crate) document_url: Option<String>,
    pub(crate) output_file: Option<PathBuf>,
    pub(crate) base_url: Option<String>,
    pub(crate) local: Option<bool>,
    pub(crate) remove_scripts: bool,
    pub(crate) neuter_scripts: bool,
    pub(crate) fetch_remote_css: bool,
    pub(crate) fetch_remote_images: bool,
    pub(crate) fetch_remote_css_images: bool,
    pub(crate) max_concurrent_fetches: Option<usize>,
    pub(crate) fetch_timeout_secs: Option<u64>,
    pub(crate) user_agent: String,
    pub(crate) renderer: Option<RenderConfig>,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for SnapshotConfigBuilder<()> {
    fn default() -> Self {
        Self {
            document_url: None,
            output_file: None,
            base_url: None,
            local: None,
            remove_scripts: false,
            neuter_scripts: false,
            fetch_remote_css: true,
            fetch_remote_images: true,
            fetch_remote_css_images: true,
            max_concurrent_fetches: None,
            fetch_timeout_secs: None,
            user_agent: CHROME_USER_AGENT.to_string(),
            renderer: None,
            _phantom: PhantomData,
        }
    }
}

impl SnapshotConfig {
    /// Create a builder for configuring a `SnapshotConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> SnapshotConfigBuilder<()> {
        SnapshotConfigBuilder::default()
    }
}

impl<State> SnapshotConfigBuilder<State> {
    fn into_state<Next>(self) -> SnapshotConfigBuilder<Next> {
        SnapshotConfigBuilder {
            document_url: self.document_url,
            output_file: self.output_file,
            base_url: self.base_url,
            local: self.local,
            remove_scripts: self.remove_scripts,
            neuter_scripts: self.neuter_scripts,
            fetch_remote_css: self.fetch_remote_css,
            fetch_remote_images: self.fetch_remote_images,
            fetch_remote_css_images: self.fetch_remote_css_images,
            max_concurrent_fetches: self.max_concurrent_fetches,
            fetch_timeout_secs: self.fetch_timeout_secs,
            user_agent: self.user_agent,
            renderer: self.renderer,
            _phantom: PhantomData,
        }
    }
}

impl SnapshotConfigBuilder<()> {
    /// Document to snapshot: a local path or an `http(s)` URL
    pub fn document_url(mut self, url: impl Into<String>) -> SnapshotConfigBuilder<WithDocumentUrl> {
        self.document_url = Some(url.into().trim().to_string());
        self.into_state()
    }
}

impl SnapshotConfigBuilder<WithDocumentUrl> {
    pub fn output_file(mut self, path: impl Into<PathBuf>) -> SnapshotConfigBuilder<Complete> {
        self.output_file = Some(path.into());
        self.into_state()
    }
}

// Build method only available when all required fields are set
impl SnapshotConfigBuilder<Complete> {
    pub fn build(self) -> Result<SnapshotConfig> {
        let document_url = self
            .document_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| anyhow!("document_url is required"))?;
        let output_file = self
            .output_file
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| anyhow!("output_file is required"))?;

        match self.max_concurrent_fetches {
            Some(0) => bail!("max_concurrent_fetches must be at least 1"),
            Some(limit) if limit > Semaphore::MAX_PERMITS => bail!(
                "max_concurrent_fetches must be at most {}",
                Semaphore::MAX_PERMITS
            ),
            _ => {}
        }
        if self.fetch_timeout_secs == Some(0) {
            bail!("fetch_timeout_secs must be at least 1");
        }

        let local = self.local.unwrap_or_else(|| !is_network_url(&document_url));
        let base_url = match self.base_url.as_deref().map(str::trim) {
            Some(base) if !base.is_empty() => normalize_base_url(base),
            _ => normalize_base_url(&document_url),
        };

        Ok(SnapshotConfig {
            document_url,
            base_url,
            output_file,
            local,
            remove_scripts: self.remove_scripts,
            neuter_scripts: self.neuter_scripts,
            fetch_remote_css: self.fetch_remote_css,
            fetch_remote_images: self.fetch_remote_images,
            fetch_remote_css_images: self.fetch_remote_css_images,
            max_concurrent_fetches: self.max_concurrent_fetches,
            fetch_timeout_secs: self.fetch_timeout_secs,
            user_agent: self.user_agent,
            renderer: self.renderer,
        })
    }
}

// Optional settings, available at any state
impl<State> SnapshotConfigBuilder<State> {
    /// Resolve relative references against `base` instead of the document URL
    #[must_use]
    pub fn base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = Some(base.into());
        self
    }

    /// Force local (filesystem) or remote (HTTP) mode. By default the mode is
    /// inferred from whether the document URL has an `http(s)` scheme.
    #[must_use]
    pub fn local(mut self, local: bool) -> Self {
        self.local = Some(local);
        self
    }

    /// Remove every `<script>` element after inlining
    #[must_use]
    pub fn remove_scripts(mut self, remove: bool) -> Self {
        self.remove_scripts = remove;
        self
    }

    /// Keep scripts but switch their `type` so they never execute. Ignored
    /// when scripts are removed.
    #[must_use]
    pub fn neuter_scripts(mut self, neuter: bool) -> Self {
        self.neuter_scripts = neuter;
        self
    }

    /// Inline stylesheet links instead of only absolutizing their `href`
    #[must_use]
    pub fn fetch_remote_css(mut self, fetch: bool) -> Self {
        self.fetch_remote_css = fetch;
        self
    }

    #[must_use]
    pub fn fetch_remote_images(mut self, fetch: bool) -> Self {
        self.fetch_remote_images = fetch;
        self
    }

    #[must_use]
    pub fn fetch_remote_css_images(mut self, fetch: bool) -> Self {
        self.fetch_remote_css_images = fetch;
        self
    }

    /// Bound the number of fetches in flight at once
    ///
    /// # Example
    /// ```rust
    /// # use oneshot_snapshot::config::SnapshotConfig;
    /// # fn main() -> anyhow::Result<()> {
    /// let config = SnapshotConfig::builder()
    ///     .document_url("https://example.com/")
    ///     .output_file("./snapout")
    ///     .max_concurrent_fetches(8)
    ///     .build()?;
    /// assert_eq!(config.max_concurrent_fetches(), Some(8));
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = Some(limit);
        self
    }

    #[must_use]
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Load remote documents through a headless renderer instead of a plain GET
    #[must_use]
    pub fn renderer(mut self, renderer: RenderConfig) -> Self {
        self.renderer = Some(renderer);
        self
    }
}
