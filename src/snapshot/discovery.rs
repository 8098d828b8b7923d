//! Image reference discovery
//!
//! Walks the document after script and CSS handling and collects every URL the
//! concurrent image stage has to fetch.

use crate::dom::{Document, DomError, PreservableAttr};
use crate::utils::is_data_uri;

use super::css::find_css_urls;
use super::types::{PendingReferences, ResourceType};

pub(crate) const IMG_SELECTOR: &str = "img[src]";
pub(crate) const STYLE_SELECTOR: &str = "style";

/// Which reference sources feed the pending set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Collect `<img src>` URLs
    pub images: bool,
    /// Collect `url(...)` tokens inside `<style>` elements
    pub css_images: bool,
}

/// Collect the URLs referenced by images and inline styles
///
/// Every `<img src>` is rewritten to its absolute form (shadowing the original)
/// whether or not images are collected, so the document always holds canonical
/// URLs afterwards. Sources that are already `data:` URIs are left untouched.
/// CSS tokens are expected to be absolute already; they are taken verbatim.
pub fn find_image_references(
    document: &Document,
    base_url: &str,
    options: DiscoveryOptions,
) -> Result<PendingReferences, DomError> {
    let mut pending = PendingReferences::new();

    for img in document.select(IMG_SELECTOR)? {
        let src = img.attr("src").unwrap_or_default();
        if is_data_uri(&src) {
            continue;
        }
        let absolute = img.make_attr_absolute(PreservableAttr::Src, base_url);
        if options.images {
            pending.insert(ResourceType::Image, absolute);
        }
    }

    if options.css_images {
        for style in document.select(STYLE_SELECTOR)? {
            for url in find_css_urls(&style.text()) {
                pending.insert(ResourceType::CssImage, url);
            }
        }
    }

    log::debug!("Discovered {} distinct image references", pending.len());
    Ok(pending)
}
