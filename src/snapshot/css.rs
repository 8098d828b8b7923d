//! `url(...)` token handling for CSS text
//!
//! This is pattern matching, not a CSS parser. `@import "file.css"` written
//! without `url()` is not recognized, and a `)` inside an unquoted URL ends the
//! token early.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::utils::{is_data_uri, resolve_url};

lazy_static! {
    // Non-greedy so that `url(a.png) url(b.png)` yields two tokens.
    static ref CSS_URL_PATTERN: Regex =
        Regex::new(r"url\((.*?)\)")
            .expect("BUG: hardcoded CSS url() pattern is invalid - this is a compile-time bug");
}

/// Strip the whitespace and quote characters surrounding a `url()` argument
#[inline]
#[must_use]
pub fn trim_css_url(raw: &str) -> &str {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\'' || c == '"')
}

/// Rewrite every `url(...)` token in `css` to an absolute URL against `base`
///
/// Tokens whose argument is already a `data:` URI are left byte-for-byte
/// unchanged. Replacement happens in one left-to-right pass, one rewrite per
/// matched token, so repeated identical tokens are each rewritten once and all
/// text outside the tokens is preserved.
#[must_use]
pub fn expand_css_urls(css: &str, base: &str) -> String {
    CSS_URL_PATTERN
        .replace_all(css, |caps: &Captures<'_>| {
            let token = &caps[0];
            let inner = trim_css_url(&caps[1]);
            if is_data_uri(inner) {
                return token.to_string();
            }
            let absolute = resolve_url(inner, base);
            log::debug!("CSS url {inner} -> {absolute}");
            format!("url({absolute})")
        })
        .into_owned()
}

/// Arguments of every non-`data:` `url(...)` token in `css`, trimmed
///
/// Run after [`expand_css_urls`], the returned values are absolute URLs that
/// appear verbatim in the text. An empty `url()` yields an empty string.
#[must_use]
pub fn find_css_urls(css: &str) -> Vec<String> {
    CSS_URL_PATTERN
        .captures_iter(css)
        .map(|caps| trim_css_url(caps.get(1).map_or("", |m| m.as_str())).to_string())
        .filter(|url| !is_data_uri(url))
        .collect()
}

/// Replace every occurrence of each known resource URL in `css` with its data
/// URI
///
/// A plain substring replace: URLs need no escaping. Longer URLs are replaced
/// first so a URL that is a prefix of another cannot clobber it. Entries with an
/// empty data URI are failed fetches and are skipped.
#[must_use]
pub fn substitute_css_urls<'a, I>(css: &str, resources: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut ordered: Vec<(&str, &str)> = resources
        .into_iter()
        .filter(|(url, data_uri)| !url.is_empty() && !data_uri.is_empty())
        .collect();
    ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let mut content = css.to_string();
    for (url, data_uri) in ordered {
        if content.contains(url) {
            content = content.replace(url, data_uri);
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_tokens(css: &str) -> usize {
        CSS_URL_PATTERN.find_iter(css).count()
    }

    #[test]
    fn test_expand_relative_urls() {
        let css = "body{background:url(bg.png)}";
        assert_eq!(
            expand_css_urls(css, "http://x.com/"),
            "body{background:url(http://x.com/bg.png)}"
        );
    }

    #[test]
    fn test_expand_strips_quotes_and_whitespace() {
        let css = r#"a{b:url( "img/a.png" )} c{d:url('../b.gif')}"#;
        let expanded = expand_css_urls(css, "http://x.com/css/site.css");
        assert_eq!(
            expanded,
            "a{b:url(http://x.com/css/img/a.png)} c{d:url(http://x.com/b.gif)}"
        );
    }

    #[test]
    fn test_expand_preserves_token_count_and_surrounding_text() {
        let css = "/* header */\n.a { background: url(a.png) no-repeat; }\n.b { mask: url(a.png); }\n@media print { .c { list-style: url(c.svg) } }\n";
        let expanded = expand_css_urls(css, "https://example.com/static/");

        assert_eq!(count_tokens(&expanded), 3);
        assert_eq!(
            expanded,
            "/* header */\n.a { background: url(https://example.com/static/a.png) no-repeat; }\n.b { mask: url(https://example.com/static/a.png); }\n@media print { .c { list-style: url(https://example.com/static/c.svg) } }\n"
        );
        for url in find_css_urls(&expanded) {
            assert!(url.starts_with("https://example.com/static/"));
        }
    }

    #[test]
    fn test_expand_leaves_data_uris_untouched() {
        let css = r#".a{background:url("data:image/png;base64,iVBORw0KGgo=")} .b{background:url(b.png)}"#;
        let expanded = expand_css_urls(css, "http://x.com/");
        assert!(expanded.contains(r#"url("data:image/png;base64,iVBORw0KGgo=")"#));
        assert!(expanded.contains("url(http://x.com/b.png)"));
    }

    #[test]
    fn test_import_without_url_is_not_rewritten() {
        let css = r#"@import "theme.css"; @import url(print.css);"#;
        let expanded = expand_css_urls(css, "http://x.com/");
        assert_eq!(
            expanded,
            r#"@import "theme.css"; @import url(http://x.com/print.css);"#
        );
    }

    #[test]
    fn test_expand_is_idempotent() {
        let css = ".a{background:url(a.png)} .b{background:url('/b.png')}";
        let once = expand_css_urls(css, "http://x.com/dir/");
        assert_eq!(expand_css_urls(&once, "http://x.com/dir/"), once);
    }

    #[test]
    fn test_find_css_urls() {
        let css = r#".a{background:url(http://x.com/a.png)} .b{background:url("data:image/gif;base64,R0lG")} .c{background:url( 'http://x.com/c.png' )} .d{background:url()}"#;
        assert_eq!(
            find_css_urls(css),
            vec![
                "http://x.com/a.png".to_string(),
                "http://x.com/c.png".to_string(),
                String::new(),
            ]
        );
        assert!(find_css_urls("body { color: red }").is_empty());
    }

    #[test]
    fn test_substitute_prefers_longer_urls() {
        let css = ".a{background:url(http://x.com/a.png)} .b{background:url(http://x.com/a.png2)}";
        let resources = [
            ("http://x.com/a.png", "data:image/png;base64,AA=="),
            ("http://x.com/a.png2", "data:;base64,BB=="),
        ];
        let substituted = substitute_css_urls(css, resources);
        assert_eq!(
            substituted,
            ".a{background:url(data:image/png;base64,AA==)} .b{background:url(data:;base64,BB==)}"
        );
    }

    #[test]
    fn test_substitute_skips_failed_fetches() {
        let css = ".a{background:url(http://x.com/missing.png)}";
        let substituted = substitute_css_urls(css, [("http://x.com/missing.png", "")]);
        assert_eq!(substituted, css);
    }
}
