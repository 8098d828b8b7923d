pub mod config;
pub mod dom;
pub mod render;
pub mod snapshot;
pub mod utils;

pub use config::{RenderConfig, SnapshotConfig};
pub use dom::{Document, DomError, Element, PreservableAttr};
pub use render::{HeadlessRenderer, RenderError};
pub use snapshot::{
    FetchError, InliningError, LocalFetcher, RemoteFetcher, ResourceFetcher, ResourceType,
    SnapshotContext, SnapshotError, SnapshotReport, process_document, take_snapshot_with,
};
pub use utils::{normalize_base_url, resolve_url};

/// Snapshot the configured document and write it to the output file
pub async fn snapshot(config: &SnapshotConfig) -> Result<SnapshotReport, SnapshotError> {
    snapshot::take_snapshot(config).await
}
