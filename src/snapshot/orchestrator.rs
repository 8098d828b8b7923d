//! Snapshot orchestration
//!
//! Sequences the rewrite stages over one document, in a fixed order, each
//! stage seeing the document as the previous one left it:
//!
//! 1. inline external scripts, then remove or neuter scripts
//! 2. expand inline styles, inline or absolutize stylesheet links
//! 3. discover image references
//! 4. fetch them concurrently behind a barrier
//! 5. substitute data URIs into `<img>` and `<style>`
//! 6. serialize

use std::path::Path;
use std::sync::Arc;

use crate::config::SnapshotConfig;
use crate::dom::Document;
use crate::render::HeadlessRenderer;
use crate::utils::normalize_base_url;

use super::coordinator::fetch_data_uris;
use super::discovery::{DiscoveryOptions, find_image_references};
use super::errors::{SnapshotError, SnapshotResult};
use super::fetchers::{LocalFetcher, MixedFetcher, RemoteFetcher, ResourceFetcher};
use super::processors::{
    FailureReasons, fixup_css, inline_scripts, neuter_scripts, remove_scripts, substitute_images,
    substitute_styles,
};
use super::types::SnapshotReport;

/// Stage toggles for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub remove_scripts: bool,
    pub neuter_scripts: bool,
    pub inline_css: bool,
    pub images: bool,
    pub css_images: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            remove_scripts: false,
            neuter_scripts: false,
            inline_css: true,
            images: true,
            css_images: true,
        }
    }
}

impl From<&SnapshotConfig> for PipelineOptions {
    fn from(config: &SnapshotConfig) -> Self {
        Self {
            remove_scripts: config.remove_scripts(),
            neuter_scripts: config.neuter_scripts(),
            inline_css: config.fetch_remote_css(),
            images: config.fetch_remote_images(),
            css_images: config.fetch_remote_css_images(),
        }
    }
}

/// Everything a stage needs besides the document, fixed for the run
#[derive(Clone)]
pub struct SnapshotContext {
    base_url: String,
    fetcher: Arc<dyn ResourceFetcher>,
    inline_fetcher: Arc<dyn ResourceFetcher>,
    max_concurrent_fetches: Option<usize>,
    options: PipelineOptions,
}

impl SnapshotContext {
    pub fn new(base_url: impl Into<String>, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            base_url: base_url.into(),
            inline_fetcher: Arc::clone(&fetcher),
            fetcher,
            max_concurrent_fetches: None,
            options: PipelineOptions::default(),
        }
    }

    pub fn from_config(config: &SnapshotConfig, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self::new(config.base_url(), fetcher)
            .with_options(PipelineOptions::from(config))
            .with_max_concurrent_fetches(config.max_concurrent_fetches())
    }

    #[must_use]
    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Fetch scripts and stylesheets through `fetcher` instead of the one
    /// used for images and the document
    #[must_use]
    pub fn with_inline_fetcher(mut self, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        self.inline_fetcher = fetcher;
        self
    }

    #[must_use]
    pub fn with_max_concurrent_fetches(mut self, limit: Option<usize>) -> Self {
        self.max_concurrent_fetches = limit;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn fetcher(&self) -> Arc<dyn ResourceFetcher> {
        Arc::clone(&self.fetcher)
    }

    /// Fetcher for the script and stylesheet stages
    #[must_use]
    pub fn inline_fetcher(&self) -> Arc<dyn ResourceFetcher> {
        Arc::clone(&self.inline_fetcher)
    }

    #[must_use]
    pub fn max_concurrent_fetches(&self) -> Option<usize> {
        self.max_concurrent_fetches
    }

    #[must_use]
    pub fn options(&self) -> PipelineOptions {
        self.options
    }
}

impl std::fmt::Debug for SnapshotContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotContext")
            .field("base_url", &self.base_url)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Run every rewrite stage over `document` and serialize the result
///
/// Per-resource failures never abort the run; they are annotated in the
/// document and listed in the returned report.
pub async fn process_document(
    document: &Document,
    ctx: &SnapshotContext,
) -> SnapshotResult<SnapshotReport> {
    let options = ctx.options();
    let mut report = SnapshotReport::default();

    inline_scripts(document, ctx, &mut report).await?;
    if options.remove_scripts {
        report.scripts_disabled = remove_scripts(document)?;
        log::info!("Removed {} scripts", report.scripts_disabled);
    } else if options.neuter_scripts {
        report.scripts_disabled = neuter_scripts(document)?;
        log::info!("Neutered {} scripts", report.scripts_disabled);
    }

    fixup_css(document, ctx, &mut report).await?;

    let discovery = DiscoveryOptions {
        images: options.images,
        css_images: options.css_images,
    };
    let pending = find_image_references(document, ctx.base_url(), discovery)?;

    if !pending.is_empty() {
        let (results, failures) =
            fetch_data_uris(&pending, ctx.fetcher(), ctx.max_concurrent_fetches()).await;
        report.fetched = pending.len();

        let reasons: FailureReasons = failures
            .into_iter()
            .map(|(url, error)| (url, error.to_string()))
            .collect();
        if options.images {
            substitute_images(document, &results, &reasons, &mut report)?;
        }
        if options.css_images {
            substitute_styles(document, &results, &reasons, &mut report)?;
        }
    }

    report.html = document.serialize()?;
    log::info!(
        "Snapshot complete: {} inlined, {} failed",
        report.successes,
        report.failures.len()
    );
    Ok(report)
}

fn remote_fetcher(config: &SnapshotConfig) -> SnapshotResult<Arc<dyn ResourceFetcher>> {
    let remote = RemoteFetcher::new(config.user_agent(), config.fetch_timeout())
        .map_err(|e| SnapshotError::Config(e.to_string()))?;
    Ok(Arc::new(remote))
}

/// Take a snapshot with the fetchers the configured mode calls for
///
/// In local mode the document and images are read from disk, while scripts
/// and stylesheets may also come from the network.
pub async fn take_snapshot(config: &SnapshotConfig) -> SnapshotResult<SnapshotReport> {
    if !config.local() {
        let fetcher = remote_fetcher(config)?;
        return run_snapshot(config, Arc::clone(&fetcher), fetcher).await;
    }

    let local: Arc<dyn ResourceFetcher> = Arc::new(LocalFetcher::new());
    let mixed = MixedFetcher::new(Arc::clone(&local), remote_fetcher(config)?);
    run_snapshot(config, local, Arc::new(mixed)).await
}

/// Take a snapshot, loading the document and every resource through `fetcher`
///
/// The output file receives the unmodified document right after parsing and
/// is overwritten with the rewritten document at the end.
pub async fn take_snapshot_with(
    config: &SnapshotConfig,
    fetcher: Arc<dyn ResourceFetcher>,
) -> SnapshotResult<SnapshotReport> {
    run_snapshot(config, Arc::clone(&fetcher), fetcher).await
}

async fn run_snapshot(
    config: &SnapshotConfig,
    fetcher: Arc<dyn ResourceFetcher>,
    inline_fetcher: Arc<dyn ResourceFetcher>,
) -> SnapshotResult<SnapshotReport> {
    let html = load_document(config, fetcher.as_ref()).await?;
    let document = Document::parse(&html);

    write_output(config.output_file(), &document.serialize()?).await?;
    log::debug!("Wrote pre-image to {}", config.output_file().display());

    let ctx = SnapshotContext::from_config(config, fetcher).with_inline_fetcher(inline_fetcher);
    let report = process_document(&document, &ctx).await?;

    write_output(config.output_file(), &report.html).await?;
    log::info!("Wrote snapshot to {}", config.output_file().display());
    Ok(report)
}

async fn load_document(
    config: &SnapshotConfig,
    fetcher: &dyn ResourceFetcher,
) -> SnapshotResult<String> {
    if !config.local()
        && let Some(render) = config.renderer()
    {
        let renderer = HeadlessRenderer::new(render.clone());
        return Ok(renderer.render(config.document_url()).await?);
    }

    let location = if config.local() {
        normalize_base_url(config.document_url())
    } else {
        config.document_url().to_string()
    };
    log::info!("Loading document {location}");

    fetcher
        .fetch(&location)
        .await
        .map(|resource| resource.text())
        .map_err(|source| SnapshotError::DocumentLoad {
            url: location.clone(),
            source,
        })
}

async fn write_output(path: &Path, html: &str) -> SnapshotResult<()> {
    let output_error = |source| SnapshotError::Output {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.map_err(output_error)?;
    }
    tokio::fs::write(path, html).await.map_err(output_error)
}
