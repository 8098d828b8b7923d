//! Resource fetching and data URI encoding
//!
//! ## Architecture
//!
//! Fetching goes through the [`ResourceFetcher`] trait so the pipeline does not
//! care where bytes come from:
//! - [`LocalFetcher`] - reads `file://` URLs (or bare absolute paths) from disk
//!   and infers the MIME type from the file extension
//! - [`RemoteFetcher`] - HTTP GET through a shared `reqwest::Client`, MIME type
//!   from the `Content-Type` header
//! - [`MixedFetcher`] - picks one of the two per URL, for local pages that link
//!   network scripts and stylesheets
//!
//! [`fetch_and_encode`] turns either into a `data:<mime>;base64,<payload>`
//! string, or an empty string when the fetch failed.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use reqwest::Client;

use crate::utils::{is_network_url, local_path_for};

/// Boxed future returned by [`ResourceFetcher::fetch`]
pub type FetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<FetchedResource, FetchError>> + Send + 'a>>;

/// Error type for fetch failures
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Not a local resource: {0}")]
    NotLocal(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error {status}: {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Raw bytes of a fetched resource plus the MIME type its source declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    pub bytes: Vec<u8>,
    /// Declared or inferred MIME type; `None` when unknown
    pub mime: Option<String>,
}

impl FetchedResource {
    #[must_use]
    pub fn new(bytes: Vec<u8>, mime: Option<String>) -> Self {
        Self { bytes, mime }
    }

    /// Body decoded as text, replacing invalid UTF-8 sequences
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Encode as a `data:` URI
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        encode_data_uri(self.mime.as_deref().unwrap_or(""), &self.bytes)
    }
}

/// Source of resource bytes for a canonical URL
pub trait ResourceFetcher: Send + Sync {
    /// Retrieve the resource at `url`
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a>;
}

/// Fetch `url` and encode it as a data URI
///
/// Returns an empty string when the fetch fails. Callers must treat the empty
/// string as "leave the reference alone", never as content.
pub async fn fetch_and_encode(fetcher: &dyn ResourceFetcher, url: &str) -> String {
    match fetcher.fetch(url).await {
        Ok(resource) => resource.to_data_uri(),
        Err(e) => {
            log::warn!("Failed to fetch and encode {url}: {e}");
            String::new()
        }
    }
}

/// Build `data:<mime>;base64,<payload>`; an empty `mime` leaves the type field
/// empty
#[must_use]
pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    let encoded_capacity = base64::encoded_len(bytes.len(), true).unwrap_or(0);
    let mut encoded = String::with_capacity(encoded_capacity + 14 + mime.len());

    encoded.push_str("data:");
    encoded.push_str(mime);
    encoded.push_str(";base64,");
    base64::engine::general_purpose::STANDARD.encode_string(bytes, &mut encoded);

    encoded
}

/// MIME type for a file name or URL path, by extension
#[must_use]
pub fn mime_for_path(path: &str) -> Option<&'static str> {
    let extension = Path::new(path.split(['?', '#']).next().unwrap_or(path))
        .extension()?
        .to_str()?
        .to_ascii_lowercase();

    let mime = match extension.as_str() {
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => return None,
    };
    Some(mime)
}

/// Reads resources from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFetcher;

impl LocalFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn read(url: &str) -> Result<FetchedResource, FetchError> {
        let path = local_path_for(url).ok_or_else(|| FetchError::NotLocal(url.to_string()))?;
        let bytes = tokio::fs::read(&path).await.map_err(|source| FetchError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mime = mime_for_path(&path.to_string_lossy()).map(str::to_string);
        if mime.is_none() {
            log::debug!("No MIME type known for {}", path.display());
        }
        Ok(FetchedResource::new(bytes, mime))
    }
}

impl ResourceFetcher for LocalFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        Box::pin(Self::read(url))
    }
}

/// Fetches resources over HTTP(S)
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: Client,
}

impl RemoteFetcher {
    /// Build a fetcher with its own client
    ///
    /// `timeout` bounds each request from connect to last body byte; `None`
    /// waits indefinitely.
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// Wrap an existing client. `Client` is reference counted, so clones share
    /// one connection pool.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn get(&self, url: &str) -> Result<FetchedResource, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        log::debug!("Fetched {} bytes from {url}", bytes.len());
        Ok(FetchedResource::new(bytes.to_vec(), mime))
    }
}

impl ResourceFetcher for RemoteFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        Box::pin(self.get(url))
    }
}

/// Sends `http(s)` URLs to one fetcher and everything else to another
#[derive(Clone)]
pub struct MixedFetcher {
    local: Arc<dyn ResourceFetcher>,
    remote: Arc<dyn ResourceFetcher>,
}

impl MixedFetcher {
    #[must_use]
    pub fn new(local: Arc<dyn ResourceFetcher>, remote: Arc<dyn ResourceFetcher>) -> Self {
        Self { local, remote }
    }
}

impl std::fmt::Debug for MixedFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixedFetcher").finish_non_exhaustive()
    }
}

impl ResourceFetcher for MixedFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        if is_network_url(url) {
            self.remote.fetch(url)
        } else {
            self.local.fetch(url)
        }
    }
}
