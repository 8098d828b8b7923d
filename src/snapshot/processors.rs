//! Document rewrite stages
//!
//! Each stage walks a list of elements collected up front, so renaming or
//! detaching a node never disturbs the iteration. Fetches inside a stage go
//! through the coordinator and complete before any element is touched.

use std::collections::{BTreeSet, HashMap};

use crate::dom::{Document, DomError, Element, PreservableAttr};
use crate::utils::{FAILED_LOAD_ATTR, INERT_SCRIPT_TYPE, is_data_uri, resolve_url};

use super::coordinator::fetch_resources;
use super::css::{expand_css_urls, find_css_urls, substitute_css_urls};
use super::discovery::{IMG_SELECTOR, STYLE_SELECTOR};
use super::fetchers::{FetchError, FetchedResource};
use super::orchestrator::SnapshotContext;
use super::types::{ResourceResults, ResourceType, SnapshotReport};

const SCRIPT_SELECTOR: &str = "script";
const EXTERNAL_SCRIPT_SELECTOR: &str = "script[src]";
// `~=` matches one token of the space-separated list, e.g. "alternate stylesheet"
const STYLESHEET_SELECTOR: &str = "link[rel~=\"stylesheet\"][href]";

type Fetched = HashMap<String, Result<FetchedResource, FetchError>>;

/// Elements whose `attr` points at a fetchable resource, paired with the
/// absolute URL. `data:` references are already inline and are skipped.
fn external_targets(
    elements: Vec<Element>,
    attr: PreservableAttr,
    base_url: &str,
) -> Vec<(Element, String)> {
    elements
        .into_iter()
        .filter_map(|element| {
            let reference = element.attr(attr.name())?;
            if is_data_uri(&reference) {
                return None;
            }
            let absolute = resolve_url(&reference, base_url);
            Some((element, absolute))
        })
        .collect()
}

async fn fetch_targets(targets: &[(Element, String)], ctx: &SnapshotContext) -> Fetched {
    let urls: BTreeSet<String> = targets.iter().map(|(_, url)| url.clone()).collect();
    fetch_resources(urls, ctx.inline_fetcher(), ctx.max_concurrent_fetches()).await
}

/// Leave the reference in place with its absolute URL and flag it as failed
fn mark_failed(
    element: &Element,
    attr: PreservableAttr,
    ctx: &SnapshotContext,
    resource_type: ResourceType,
    error: String,
    report: &mut SnapshotReport,
) {
    let absolute = element.make_attr_absolute(attr, ctx.base_url());
    element.set_attr(FAILED_LOAD_ATTR, &absolute);
    log::warn!("Failed to inline {resource_type} {absolute}: {error}");
    report.record_failure(&absolute, resource_type, error);
}

fn fetch_outcome(fetched: &Fetched, url: &str) -> Result<FetchedResource, String> {
    match fetched.get(url) {
        Some(Ok(resource)) => Ok(resource.clone()),
        Some(Err(e)) => Err(e.to_string()),
        None => Err("fetch task did not complete".to_string()),
    }
}

/// Replace every external `<script src>` with the fetched body
///
/// On success the original `src` is shadowed and removed and the body becomes
/// the element's text. On failure the element keeps an absolute `src` and is
/// flagged with the failure attribute. Inline scripts are not touched.
pub async fn inline_scripts(
    document: &Document,
    ctx: &SnapshotContext,
    report: &mut SnapshotReport,
) -> Result<(), DomError> {
    let targets = external_targets(
        document.select(EXTERNAL_SCRIPT_SELECTOR)?,
        PreservableAttr::Src,
        ctx.base_url(),
    );
    if targets.is_empty() {
        return Ok(());
    }

    log::info!("Inlining {} external scripts", targets.len());
    let fetched = fetch_targets(&targets, ctx).await;

    for (script, url) in targets {
        match fetch_outcome(&fetched, &url) {
            Ok(resource) => {
                script.preserve_attr(PreservableAttr::Src);
                script.remove_attr(PreservableAttr::Src.name());
                script.set_text(&resource.text());
                report.successes += 1;
                log::debug!("Inlined script {url}");
            }
            Err(error) => mark_failed(
                &script,
                PreservableAttr::Src,
                ctx,
                ResourceType::Script,
                error,
                report,
            ),
        }
    }
    Ok(())
}

/// Detach every `<script>` element. Returns how many were removed.
pub fn remove_scripts(document: &Document) -> Result<usize, DomError> {
    let scripts = document.select(SCRIPT_SELECTOR)?;
    for script in &scripts {
        script.remove();
    }
    Ok(scripts.len())
}

/// Keep every `<script>` but make it inert
///
/// The original `type` is shadowed so the script can be restored later.
pub fn neuter_scripts(document: &Document) -> Result<usize, DomError> {
    let scripts = document.select(SCRIPT_SELECTOR)?;
    for script in &scripts {
        script.preserve_attr(PreservableAttr::Type);
        script.set_attr(PreservableAttr::Type.name(), INERT_SCRIPT_TYPE);
    }
    Ok(scripts.len())
}

/// Normalize inline styles and inline or absolutize stylesheet links
///
/// Existing `<style>` text is expanded against the document base. When CSS
/// inlining is enabled each stylesheet link is fetched and, on success, turned
/// into a `<style type="text/css">` whose URLs are expanded against the
/// stylesheet's own URL. A link that fails to load, or any link when inlining
/// is off, stays a link with an absolute `href`.
pub async fn fixup_css(
    document: &Document,
    ctx: &SnapshotContext,
    report: &mut SnapshotReport,
) -> Result<(), DomError> {
    for style in document.select(STYLE_SELECTOR)? {
        let css = style.text();
        let expanded = expand_css_urls(&css, ctx.base_url());
        if expanded != css {
            style.set_text(&expanded);
        }
    }

    let links = document.select(STYLESHEET_SELECTOR)?;
    if !ctx.options().inline_css {
        for link in &links {
            link.make_attr_absolute(PreservableAttr::Href, ctx.base_url());
        }
        return Ok(());
    }

    let targets = external_targets(links, PreservableAttr::Href, ctx.base_url());
    if targets.is_empty() {
        return Ok(());
    }

    log::info!("Inlining {} stylesheets", targets.len());
    let fetched = fetch_targets(&targets, ctx).await;

    for (link, url) in targets {
        match fetch_outcome(&fetched, &url) {
            Ok(resource) => {
                link.preserve_attr(PreservableAttr::Href);
                let style = link.rename("style")?;
                style.remove_attr("rel");
                style.remove_attr(PreservableAttr::Href.name());
                style.set_attr(PreservableAttr::Type.name(), "text/css");
                style.set_text(&expand_css_urls(&resource.text(), &url));
                report.successes += 1;
                log::debug!("Inlined stylesheet {url}");
            }
            Err(error) => mark_failed(
                &link,
                PreservableAttr::Href,
                ctx,
                ResourceType::Stylesheet,
                error,
                report,
            ),
        }
    }
    Ok(())
}

/// Why each failed URL could not be fetched
pub type FailureReasons = HashMap<String, String>;

fn failure_reason<'a>(reasons: &'a FailureReasons, url: &str) -> &'a str {
    reasons.get(url).map_or("fetch failed", String::as_str)
}

/// Swap every absolutized `<img src>` for its data URI
///
/// A failed fetch leaves `src` alone and flags the element; a URL with no
/// result at all is logged as a resolution error and left untouched.
pub fn substitute_images(
    document: &Document,
    results: &ResourceResults,
    reasons: &FailureReasons,
    report: &mut SnapshotReport,
) -> Result<(), DomError> {
    for img in document.select(IMG_SELECTOR)? {
        let src = img.attr("src").unwrap_or_default();
        if is_data_uri(&src) {
            continue;
        }
        match results.get(&src) {
            Some("") => {
                log::error!("Could not resolve image {src}");
                img.set_attr(FAILED_LOAD_ATTR, &src);
                report.record_failure(&src, ResourceType::Image, failure_reason(reasons, &src));
            }
            Some(data_uri) => {
                img.set_attr("src", data_uri);
                report.successes += 1;
            }
            None => {
                log::error!("No fetch result for image {src}");
                report.record_failure(&src, ResourceType::Image, "no fetch result");
            }
        }
    }
    Ok(())
}

/// Replace every fetched URL inside `<style>` text with its data URI
pub fn substitute_styles(
    document: &Document,
    results: &ResourceResults,
    reasons: &FailureReasons,
    report: &mut SnapshotReport,
) -> Result<(), DomError> {
    for style in document.select(STYLE_SELECTOR)? {
        let css = style.text();
        for url in find_css_urls(&css) {
            match results.get(&url) {
                Some("") => {
                    log::error!("Could not resolve CSS image {url}");
                    let reason = failure_reason(reasons, &url);
                    report.record_failure(&url, ResourceType::CssImage, reason);
                }
                Some(_) => report.successes += 1,
                None => {
                    log::error!("No fetch result for CSS image {url}");
                    report.record_failure(&url, ResourceType::CssImage, "no fetch result");
                }
            }
        }

        let substituted = substitute_css_urls(&css, results.encoded());
        if substituted != css {
            style.set_text(&substituted);
        }
    }
    Ok(())
}
