//! Shared constants for oneshot
//!
//! Attribute names, markers and defaults used across the snapshot pipeline.

/// Prefix of the attributes that keep a node's pre-mutation value.
///
/// `src` is preserved as `data-oneshot-orig-src`, `href` as
/// `data-oneshot-orig-href`, and so on.
pub const SHADOW_ATTR_PREFIX: &str = "data-oneshot-orig-";

/// Attribute set on a node whose referenced resource could not be fetched.
///
/// Holds the absolute URL that failed.
pub const FAILED_LOAD_ATTR: &str = "data-oneshot-failedload";

/// Scheme prefix identifying a reference that is already inline.
pub const DATA_URI_PREFIX: &str = "data:";

/// `type` value that keeps a script element inert without removing it.
pub const INERT_SCRIPT_TYPE: &str = "text/noexecutejs";

/// Default output path when none is given on the command line.
pub const DEFAULT_OUTPUT_FILE: &str = "./snapout";

/// User agent sent with remote fetches unless configured otherwise
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Default headless renderer program and its page-dump script.
pub const DEFAULT_RENDER_PROGRAM: &str = "phantomjs";
pub const DEFAULT_RENDER_SCRIPT: &str = "phantomdump.js";
pub const DEFAULT_RENDER_DUMP: &str = "./phantomdump.html";
