//! Result-link extraction from a search results page.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

/// Base used to resolve relative result hrefs such as `/url?q=...`.
const RESULT_BASE: &str = "https://www.google.com/";

/// Organic result links in page order, deduplicated, at most `limit`.
///
/// A result is an anchor inside a heading (`h3 > a`) or an anchor wrapping
/// one (`a > h3`); both layouts have been served.
pub fn extract_result_links(page: &str, limit: usize) -> Vec<String> {
    let (Ok(anchors), Ok(heading)) = (Selector::parse("a[href]"), Selector::parse("h3")) else {
        return Vec::new();
    };
    let document = Html::parse_document(page);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for anchor in document.select(&anchors) {
        let inside_heading = anchor
            .ancestors()
            .any(|n| n.value().as_element().is_some_and(|e| e.name() == "h3"));
        let wraps_heading = anchor.select(&heading).next().is_some();
        if !inside_heading && !wraps_heading {
            continue;
        }

        let Some(link) = anchor.value().attr("href").and_then(resolve_href) else {
            continue;
        };
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links.truncate(limit);
    links
}

/// Unwrap redirect hrefs and keep only absolute http(s) targets.
fn resolve_href(href: &str) -> Option<String> {
    let href = href.trim();
    if is_web(href) {
        return Some(href.to_string());
    }

    let url = Url::parse(RESULT_BASE).ok()?.join(href).ok()?;
    if url.path() != "/url" {
        return None;
    }
    let target = url
        .query_pairs()
        .find(|(k, _)| k == "q" || k == "url")
        .map(|(_, v)| v.into_owned())?;
    is_web(&target).then_some(target)
}

fn is_web(link: &str) -> bool {
    link.starts_with("http://") || link.starts_with("https://")
}
