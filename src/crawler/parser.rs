//! HTML parser for extracting image sources
//!
//! Every `<img>` element with a `src` attribute is collected, wherever it sits
//! in the document tree. Values are returned as written in the page, in
//! document order, without deduplication.

use scraper::{Html, Selector};
use url::Url;

/// Extracts the `src` value of every `<img>` in an HTML document
///
/// Only empty `src` values are skipped. Every other value is returned
/// exactly as the parser reports it, whitespace included, so relative paths
/// stay relative.
///
/// # Example
///
/// ```
/// use imgscrape::crawler::extract_image_sources;
///
/// let html = r#"<div><section><p><img src="a.png"></p></section></div>"#;
/// assert_eq!(extract_image_sources(html), vec!["a.png".to_string()]);
/// ```
pub fn extract_image_sources(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut sources = Vec::new();

    if let Ok(img_selector) = Selector::parse("img[src]") {
        for element in document.select(&img_selector) {
            match element.value().attr("src") {
                Some("") | None => {}
                Some(src) => sources.push(src.to_string()),
            }
        }
    }

    sources
}

/// Resolves image sources against the page they were found on
///
/// Sources that cannot be joined onto `base_url` are dropped. `data:` URIs
/// are kept as-is, since they are already absolute.
pub fn resolve_image_sources(sources: &[String], base_url: &Url) -> Vec<String> {
    sources
        .iter()
        .filter_map(|src| base_url.join(src).ok())
        .map(|url| url.to_string())
        .collect()
}
