//! URL handling module for imgscrape
//!
//! Seed URLs are validated up front so a malformed entry is reported before
//! any network work starts.

use crate::UrlError;
use url::Url;

/// Parses a seed URL, requiring only that it is absolute
///
/// Surrounding whitespace is ignored. Any scheme is accepted here; a scheme
/// the HTTP client cannot fetch fails later, when the crawl runs, as a
/// transport error for that seed. No other normalization is applied; the
/// crawler fetches exactly what the caller registered.
///
/// # Examples
///
/// ```
/// use imgscrape::url::parse_seed_url;
///
/// let url = parse_seed_url(" https://example.com/gallery ").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/gallery");
///
/// assert!(parse_seed_url("ftp://example.com/file").is_ok());
/// assert!(parse_seed_url("/relative/path").is_err());
/// ```
pub fn parse_seed_url(raw: &str) -> Result<Url, UrlError> {
    Ok(Url::parse(raw.trim())?)
}

/// Parses a base URL that further path segments will be appended to
///
/// Used for IIIF service endpoints, where the path is extended with the
/// identifier and image parameters. The URL must be http(s) with a host and
/// must not carry a query or fragment.
pub fn parse_base_url(raw: &str) -> Result<Url, UrlError> {
    let url = parse_seed_url(raw)?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    if url.cannot_be_a_base() {
        return Err(UrlError::CannotBeABase(raw.to_string()));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(UrlError::CannotBeABase(format!(
            "{} (query and fragment are not allowed)",
            raw
        )));
    }

    Ok(url)
}
