//! Resource inlining engine
//!
//! Turns a document into a self-contained snapshot: external scripts and
//! stylesheets are inlined as text, images (including those referenced from
//! CSS) are embedded as base64 data URIs.

// Sub-modules
pub mod coordinator;
pub mod css;
pub mod discovery;
pub mod errors;
pub mod fetchers;
pub mod orchestrator;
pub mod processors;
pub mod types;

// Re-exports for public API
pub use coordinator::{fetch_data_uris, fetch_resources};
pub use css::{expand_css_urls, find_css_urls, substitute_css_urls};
pub use discovery::{DiscoveryOptions, find_image_references};
pub use errors::{SnapshotError, SnapshotResult};
pub use fetchers::{
    FetchError, FetchFuture, FetchedResource, LocalFetcher, MixedFetcher, RemoteFetcher,
    ResourceFetcher, encode_data_uri, fetch_and_encode, mime_for_path,
};
pub use orchestrator::{
    PipelineOptions, SnapshotContext, process_document, take_snapshot, take_snapshot_with,
};
pub use types::{InliningError, PendingReferences, ResourceResults, ResourceType, SnapshotReport};
