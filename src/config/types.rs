//! Core configuration types for snapshot runs
//!
//! `SnapshotConfig` is immutable for the duration of a run. Build it through
//! [`SnapshotConfig::builder`](super::builder), which derives the base URL and
//! the local/remote mode from the document URL.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::{DEFAULT_RENDER_DUMP, DEFAULT_RENDER_PROGRAM, DEFAULT_RENDER_SCRIPT};

/// Main configuration struct for a snapshot run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Local file path or network URL of the document
    pub(crate) document_url: String,

    /// Base URL that relative references resolve against.
    ///
    /// **INVARIANT:** Always an absolute URL. Local paths are stored as
    /// `file://` URLs so resolution works the same in both modes.
    pub(crate) base_url: String,

    /// Where the pre-image and then the final document are written
    pub(crate) output_file: PathBuf,

    /// Read the document and its resources from the filesystem
    pub(crate) local: bool,

    pub(crate) remove_scripts: bool,
    pub(crate) neuter_scripts: bool,
    pub(crate) fetch_remote_css: bool,
    pub(crate) fetch_remote_images: bool,
    pub(crate) fetch_remote_css_images: bool,

    /// Cap on concurrent fetches within a stage. `None` starts one task per
    /// URL at once.
    pub(crate) max_concurrent_fetches: Option<usize>,

    /// Per-request timeout for remote fetches. `None` waits indefinitely.
    pub(crate) fetch_timeout_secs: Option<u64>,

    pub(crate) user_agent: String,

    /// Headless renderer used to load remote documents, if any
    pub(crate) renderer: Option<RenderConfig>,
}

/// External headless renderer invocation
///
/// The renderer is run as `<program> [args...] <input> <output>`: it loads the
/// input URL or path, executes page script, and writes the rendered document
/// to the output path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderConfig {
    pub program: String,
    pub args: Vec<String>,
    /// File the renderer writes its result to
    pub dump_file: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_RENDER_PROGRAM.to_string(),
            args: vec![DEFAULT_RENDER_SCRIPT.to_string()],
            dump_file: PathBuf::from(DEFAULT_RENDER_DUMP),
        }
    }
}
