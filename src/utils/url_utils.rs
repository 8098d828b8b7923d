//! URL resolution utilities.
//!
//! Every reference the pipeline touches goes through [`resolve_url`] so the
//! canonical form used as the fetch key is the same everywhere.

use std::path::{Path, PathBuf};
use url::Url;

use super::constants::DATA_URI_PREFIX;

/// Resolve a potentially relative reference against a base URL
///
/// Follows WHATWG reference resolution (scheme-relative, path-relative,
/// query and fragment handling). Never fails: when the base does not parse the
/// reference is parsed on its own, and when that fails too the reference text
/// is returned unchanged. An unusable result simply fails later at fetch time.
#[must_use]
pub fn resolve_url(reference: &str, base: &str) -> String {
    let reference = reference.trim();

    match Url::parse(base) {
        Ok(base_url) => match base_url.join(reference) {
            Ok(resolved) => resolved.to_string(),
            Err(e) => {
                log::debug!("Could not resolve '{reference}' against '{base}': {e}");
                reference.to_string()
            }
        },
        Err(_) => match Url::parse(reference) {
            Ok(absolute) => absolute.to_string(),
            Err(_) => reference.to_string(),
        },
    }
}

/// Whether a reference is already an inline `data:` URI
#[inline]
#[must_use]
pub fn is_data_uri(reference: &str) -> bool {
    reference
        .trim_start()
        .get(..DATA_URI_PREFIX.len())
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(DATA_URI_PREFIX))
}

/// Whether a document location names a network resource
///
/// Only `http` and `https` count; anything else, including bare paths and
/// `file://` URLs, is read from the local filesystem.
#[must_use]
pub fn is_network_url(location: &str) -> bool {
    Url::parse(location)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Turn a document location into a URL usable as a resolution base
///
/// Network and `file://` URLs are returned as-is. Filesystem paths are made
/// absolute and converted to `file://` URLs; a trailing separator keeps the
/// path a directory so relative references land inside it.
#[must_use]
pub fn normalize_base_url(location: &str) -> String {
    if let Ok(url) = Url::parse(location)
        && url.scheme().len() > 1
    {
        return url.to_string();
    }

    let is_dir = location.ends_with('/') || location.ends_with(std::path::MAIN_SEPARATOR);
    let path = absolute_path(Path::new(location));
    let converted = if is_dir {
        Url::from_directory_path(&path)
    } else {
        Url::from_file_path(&path)
    };

    match converted {
        Ok(url) => url.to_string(),
        Err(()) => {
            log::warn!("Could not turn '{location}' into a file URL; using it verbatim");
            location.to_string()
        }
    }
}

/// Map a `file://` URL or bare absolute path back to a filesystem path
#[must_use]
pub fn local_path_for(url: &str) -> Option<PathBuf> {
    match Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "file" => parsed.to_file_path().ok(),
        Ok(_) => None,
        Err(_) => {
            let path = Path::new(url);
            path.is_absolute().then(|| path.to_path_buf())
        }
    }
}

fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
