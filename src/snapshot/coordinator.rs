//! Concurrent fetch coordination
//!
//! One task per distinct URL, a completion barrier, then a single-threaded
//! merge. Tasks never touch shared state: each publishes `(url, outcome)` into
//! a channel buffered for every task, and only once all tasks have finished and
//! the channel is closed does the calling task drain it into a map. Nothing is
//! readable before the barrier, and the map has exactly one writer.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{Semaphore, mpsc};

use super::fetchers::{FetchError, FetchedResource, ResourceFetcher};
use super::types::{PendingReferences, ResourceResults};

/// Run `task` once per URL concurrently and collect the outcomes by URL
///
/// `limit` caps how many tasks run at once, clamped to what a tokio
/// `Semaphore` can hold; `None` starts them all immediately. A task that
/// panics contributes no entry.
pub async fn fan_out<I, T, F, Fut>(urls: I, limit: Option<usize>, task: F) -> HashMap<String, T>
where
    I: IntoIterator<Item = String>,
    F: Fn(String) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let urls: Vec<String> = urls.into_iter().collect();
    let task_count = urls.len();
    if task_count == 0 {
        return HashMap::new();
    }

    let (tx, mut rx) = mpsc::channel::<(String, T)>(task_count);
    let semaphore = limit
        .map(|permits| permits.clamp(1, Semaphore::MAX_PERMITS))
        .map(|permits| Arc::new(Semaphore::new(permits)));

    let mut handles = Vec::with_capacity(task_count);
    for url in urls {
        let tx = tx.clone();
        let semaphore = semaphore.clone();
        let work = task(url.clone());

        handles.push(tokio::spawn(async move {
            let _permit = match semaphore {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };
            let outcome = work.await;
            // Capacity equals the task count, so this never waits
            if tx.send((url, outcome)).await.is_err() {
                log::error!("Result channel closed before all fetches published");
            }
        }));
    }
    drop(tx);

    // Barrier: every task has finished before anything is read
    for joined in join_all(handles).await {
        if let Err(e) = joined {
            log::error!("Fetch task failed to complete: {e}");
        }
    }

    let mut results = HashMap::with_capacity(task_count);
    while let Some((url, outcome)) = rx.recv().await {
        results.insert(url, outcome);
    }
    results
}

/// Fetch every URL concurrently, keeping raw bytes
///
/// Used for scripts and stylesheets, whose bodies are inlined as text.
pub async fn fetch_resources<I>(
    urls: I,
    fetcher: Arc<dyn ResourceFetcher>,
    limit: Option<usize>,
) -> HashMap<String, Result<FetchedResource, FetchError>>
where
    I: IntoIterator<Item = String>,
{
    fan_out(urls, limit, move |url| {
        let fetcher = Arc::clone(&fetcher);
        async move { fetcher.fetch(&url).await }
    })
    .await
}

/// Fetch and encode every pending URL concurrently
///
/// The returned results hold exactly one entry per pending URL: the data URI,
/// or an empty string when the fetch failed. Failures are also returned with
/// their cause so the caller can report them.
pub async fn fetch_data_uris(
    pending: &PendingReferences,
    fetcher: Arc<dyn ResourceFetcher>,
    limit: Option<usize>,
) -> (ResourceResults, Vec<(String, FetchError)>) {
    log::info!("Fetching {} resources", pending.len());

    let outcomes = fetch_resources(pending.urls().map(str::to_string), fetcher, limit).await;

    let mut data = HashMap::with_capacity(pending.len());
    let mut failures = Vec::new();
    for (url, outcome) in outcomes {
        match outcome {
            Ok(resource) => {
                data.insert(url, resource.to_data_uri());
            }
            Err(e) => {
                log::warn!("Failed to fetch {url}: {e}");
                data.insert(url.clone(), String::new());
                failures.push((url, e));
            }
        }
    }

    // Panicked tasks leave no outcome; they still count as failed fetches
    for url in pending.urls() {
        data.entry(url.to_string()).or_default();
    }
    failures.sort_by(|a, b| a.0.cmp(&b.0));

    log::info!("Done fetching {} resources ({} failed)", data.len(), failures.len());
    (ResourceResults::from_map(data), failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::fetchers::FetchFuture;
    use crate::snapshot::types::ResourceType;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves a fixed set of URLs and counts every fetch
    struct CountingFetcher {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl CountingFetcher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl ResourceFetcher for CountingFetcher {
        fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                self.seen.lock().unwrap().push(url.to_string());
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                if url.contains("missing") {
                    Err(FetchError::HttpStatus {
                        url: url.to_string(),
                        status: 404,
                    })
                } else {
                    Ok(FetchedResource::new(vec![0xFF, 0xD8], Some("image/jpeg".into())))
                }
            })
        }
    }

    fn pending(urls: &[&str]) -> PendingReferences {
        let mut pending = PendingReferences::new();
        for url in urls {
            pending.insert(ResourceType::Image, *url);
        }
        pending
    }

    #[tokio::test]
    async fn test_one_fetch_per_distinct_url() {
        let fetcher = Arc::new(CountingFetcher::new());
        let pending = pending(&[
            "http://x.com/same.png",
            "http://x.com/same.png",
            "http://x.com/same.png",
            "http://x.com/same.png",
            "http://x.com/same.png",
            "http://x.com/other.png",
        ]);

        let (results, failures) = fetch_data_uris(&pending, fetcher.clone(), None).await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(results.len(), 2);
        assert!(failures.is_empty());
        assert_eq!(
            results.get("http://x.com/same.png"),
            Some("data:image/jpeg;base64,/9g=")
        );
    }

    #[tokio::test]
    async fn test_failures_become_empty_entries() {
        let fetcher = Arc::new(CountingFetcher::new());
        let pending = pending(&["http://x.com/a.png", "http://x.com/missing.png"]);

        let (results, failures) = fetch_data_uris(&pending, fetcher, None).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results.get("http://x.com/missing.png"), Some(""));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "http://x.com/missing.png");
        assert!(matches!(failures[0].1, FetchError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_unbounded_fan_out_runs_in_parallel() {
        let fetcher = Arc::new(CountingFetcher::new());
        let urls: Vec<String> = (0..8).map(|i| format!("http://x.com/{i}.png")).collect();
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();

        fetch_data_uris(&pending(&refs), fetcher.clone(), None).await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 8);
        assert!(fetcher.peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_limit_bounds_concurrency() {
        let fetcher = Arc::new(CountingFetcher::new());
        let urls: Vec<String> = (0..6).map(|i| format!("http://x.com/{i}.png")).collect();
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();

        let (results, _) = fetch_data_uris(&pending(&refs), fetcher.clone(), Some(2)).await;

        assert_eq!(results.len(), 6);
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(fetcher.seen.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_oversized_limit_is_clamped() {
        let fetcher = Arc::new(CountingFetcher::new());
        let pending = pending(&["http://x.com/a.png", "http://x.com/b.png"]);

        let (results, failures) =
            fetch_data_uris(&pending, fetcher.clone(), Some(usize::MAX)).await;

        assert_eq!(results.len(), 2);
        assert!(failures.is_empty());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fan_out_with_no_urls() {
        let results: HashMap<String, ()> = fan_out(Vec::new(), None, |_url| async {}).await;
        assert!(results.is_empty());
    }
}
