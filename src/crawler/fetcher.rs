//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client
//! - GET requests to fetch page content
//! - Classifying status codes and body failures into fetch errors
//!
//! There is no retry logic here. Every URL gets exactly one attempt.

use crate::config::HttpConfig;
use crate::crawler::parser::extract_image_sources;
use crate::FetchError;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value, if the server sent one
    pub content_type: Option<String>,
    /// Page body content
    pub body: String,
}

/// Builds the HTTP client shared by every crawl worker and IIIF request
///
/// `reqwest::Client` is a handle onto one connection pool, so clones are
/// cheap and all of them reuse the same connections.
///
/// # Example
///
/// ```no_run
/// use imgscrape::config::HttpConfig;
/// use imgscrape::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a single page
///
/// Whatever body a 2xx response carries is handed to the HTML parser; the
/// Content-Type is recorded but not used to reject the page.
///
/// # Error Classification
///
/// | Condition | Error |
/// |-----------|-------|
/// | Connection, DNS, TLS, timeout, unsupported scheme | `FetchError::Transport` |
/// | Any non-2xx status | `FetchError::Status` |
/// | Body cannot be read or decoded into a document | `FetchError::ParseDocument` |
pub async fn fetch_page(client: &Client, url: &Url) -> Result<FetchedPage, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let final_url = response.url().clone();
    let body = response
        .text()
        .await
        .map_err(|e| FetchError::ParseDocument {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        content_type,
        body,
    })
}

/// Fetches a page and returns the `src` of every image it contains
pub async fn fetch_images(client: &Client, url: &Url) -> Result<Vec<String>, FetchError> {
    tracing::debug!(url = %url, "performing HTTP GET");
    let page = fetch_page(client, url).await?;
    tracing::debug!(
        url = %url,
        final_url = %page.final_url,
        status = page.status_code,
        content_type = page.content_type.as_deref().unwrap_or("-"),
        bytes = page.body.len(),
        "page fetched"
    );

    let images = extract_image_sources(&page.body);
    for link in &images {
        tracing::debug!(url = %url, link = %link, "found link");
    }

    Ok(images)
}
