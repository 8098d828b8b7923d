//! Test utilities and helper functions for the snapshot test suite

use anyhow::Result;
use mockito::{Mock, Server};
use oneshot_snapshot::snapshot::{FetchError, FetchFuture, FetchedResource, ResourceFetcher};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

/// In-memory fetcher that records how often each URL was requested
#[allow(dead_code)]
#[derive(Default)]
pub struct MemoryFetcher {
    resources: HashMap<String, FetchedResource>,
    calls: Mutex<HashMap<String, usize>>,
}

#[allow(dead_code)]
impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, mime: &str, bytes: impl Into<Vec<u8>>) -> Self {
        let mime = (!mime.is_empty()).then(|| mime.to_string());
        self.resources
            .insert(url.to_string(), FetchedResource::new(bytes.into(), mime));
        self
    }

    /// Number of fetches issued for `url`
    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    /// Number of fetches issued overall
    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

impl ResourceFetcher for MemoryFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(url.to_string())
                .or_default() += 1;
            tokio::task::yield_now().await;

            self.resources
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                })
        })
    }
}

/// Creates a temporary directory for test output
#[allow(dead_code)]
pub fn create_test_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test HTML document with the given head and body markup
#[allow(dead_code)]
pub fn create_test_html(head: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Snapshot Test</title>
    {head}
</head>
<body>
    {body}
</body>
</html>"#
    )
}

/// Creates a mock endpoint that returns `body` with the given content type
#[allow(dead_code)]
pub async fn create_resource_mock(
    server: &mut Server,
    path: &str,
    content_type: &str,
    body: impl AsRef<[u8]>,
) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", content_type)
        .with_body(body)
        .create_async()
        .await
}

/// Creates a mock endpoint that returns an error
#[allow(dead_code)]
pub async fn create_error_mock(server: &mut Server, path: &str, status: usize) -> Mock {
    server
        .mock("GET", path)
        .with_status(status)
        .with_body("Error")
        .create_async()
        .await
}

/// Verifies that a file exists and has content
#[allow(dead_code)]
pub async fn assert_file_exists_with_content(path: &Path) -> Result<String> {
    assert!(path.exists(), "File does not exist: {path:?}");
    let content = tokio::fs::read_to_string(path).await?;
    assert!(!content.is_empty(), "File is empty: {path:?}");
    Ok(content)
}

/// Helper to create test URLs
#[allow(dead_code)]
pub fn test_url(server: &Server, path: &str) -> String {
    format!("{}{}", server.url(), path)
}
