//! Outbound link discovery.
//!
//! Only anchors inside `<article>` elements are considered; links in
//! navigation, headers, footers and sidebars are never surfaced. A page
//! without an article yields nothing. Bytes that are not valid UTF-8 are
//! replaced before parsing rather than rejected.

use lazy_static::lazy_static;
use scraper::{Html, Selector};

use crate::error::ExtractionError;

use super::validator::is_valid_link;

lazy_static! {
    /// Anchors with at least one `<article>` ancestor, in document order.
    static ref CONTENT_ANCHORS: Selector = Selector::parse("article a[href]").unwrap();
}

/// Collect the qualifying outbound links of an HTML document.
pub fn extract_links(document: &[u8]) -> Result<Vec<String>, ExtractionError> {
    // Invalid sequences become U+FFFD; hrefs are ASCII in practice
    let text = String::from_utf8_lossy(document);
    let html = Html::parse_document(&text);

    let links = html
        .select(&CONTENT_ANCHORS)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| is_valid_link(href))
        .map(str::to_string)
        .collect();

    Ok(links)
}
