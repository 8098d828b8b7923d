//! Run-level errors
//!
//! Only conditions that abort a snapshot live here. Per-resource failures are
//! recovered where they happen and end up in the
//! [`SnapshotReport`](super::types::SnapshotReport).

use std::path::PathBuf;

use crate::dom::DomError;
use crate::render::RenderError;

use super::fetchers::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to load document {url}: {source}")]
    DocumentLoad {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to render document: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("Failed to write {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;
